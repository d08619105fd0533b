//! Schema migration runner.

use sqlx::PgPool;
use sqlx::migrate::Migrator;
use tracing::info;

use bookhub_core::error::{AppError, ErrorKind};
use bookhub_core::result::AppResult;

static MIGRATOR: Migrator = sqlx::migrate!("../../migrations");

/// Bring the schema up to date before the server takes bookings.
pub async fn run_migrations(pool: &PgPool) -> AppResult<()> {
    MIGRATOR
        .run(pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Schema migration failed", e))?;
    info!(known = MIGRATOR.iter().count(), "Schema is up to date");
    Ok(())
}
