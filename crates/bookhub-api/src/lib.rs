//! # bookhub-api
//!
//! HTTP API layer for BookHub built on Axum.
//!
//! Provides the booking, allocation, and health endpoints, the trusted
//! gateway identity extractor, DTOs, and error mapping.

pub mod dto;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod router;
pub mod state;

pub use router::build_router;
pub use state::AppState;
