//! Concrete repository implementations.

pub mod booking;
pub mod offering;
pub mod schedule;
pub mod section;
pub mod student;
