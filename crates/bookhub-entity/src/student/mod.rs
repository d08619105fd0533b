//! Student entities.

pub mod model;

pub use model::Student;
