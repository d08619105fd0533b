//! Application state shared across all handlers.

use std::sync::Arc;

use sqlx::PgPool;

use bookhub_core::config::AppConfig;
use bookhub_service::allocation::AllocationService;
use bookhub_service::booking::BookingService;

/// Application state containing all shared dependencies.
///
/// Passed to every Axum handler via `State<AppState>`.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration.
    pub config: Arc<AppConfig>,
    /// PostgreSQL connection pool, used directly only by health checks.
    pub db_pool: PgPool,
    /// Booking lifecycle operations.
    pub booking_service: Arc<BookingService>,
    /// The administrative lottery pass.
    pub allocation_service: Arc<AllocationService>,
}
