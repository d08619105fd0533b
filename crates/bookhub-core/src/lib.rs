//! # bookhub-core
//!
//! Core crate for the BookHub activity-booking engine. Contains the unified
//! error system, configuration schemas, shared types (roles, capabilities,
//! date windows), and the collaborator traits (billing, messaging,
//! capability resolution).
//!
//! This crate has **no** internal dependencies on other BookHub crates.

pub mod config;
pub mod error;
pub mod result;
pub mod traits;
pub mod types;

pub use error::AppError;
pub use result::AppResult;
