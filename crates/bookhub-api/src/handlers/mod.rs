//! HTTP handlers, organized by domain.

pub mod allocation;
pub mod booking;
pub mod health;
