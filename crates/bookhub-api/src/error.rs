//! Maps domain `AppError` to HTTP responses.
//!
//! The `IntoResponse` impl for `AppError` lives in `bookhub-core` (next to
//! the type, as the orphan rule requires); this module re-exports the HTTP
//! mapping pieces for API consumers.

pub use bookhub_core::error::{ApiErrorResponse, status_for};
