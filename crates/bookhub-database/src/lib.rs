//! # bookhub-database
//!
//! PostgreSQL connection management, advisory-lock helpers, and concrete
//! repository implementations for all BookHub entities.

pub mod connection;
pub mod locks;
pub mod migration;
pub mod repositories;

pub use connection::connect;
