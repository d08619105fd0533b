//! Activity offering entities.

pub mod mode;
pub mod model;

pub use mode::AllocationMode;
pub use model::ActivityOffering;
