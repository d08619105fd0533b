//! Activity section entities.

pub mod model;
pub mod slot;

pub use model::{ActivitySection, EffectiveCapacity};
pub use slot::{ReservedSlot, TimeSlot};
