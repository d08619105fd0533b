//! Offering-level advisory locks.
//!
//! The lottery pass tracks capacity in an in-process map, which is only
//! safe when no other transaction takes or releases seats in the same
//! offering during the run. The pass therefore holds the exclusive form of
//! a transaction-scoped advisory lock on the offering, while every
//! seat-moving operation (submission, waitlist confirmation, promotion)
//! holds the shared form: those stay concurrent with one another but are
//! mutually exclusive with a running pass.

use sqlx::PgConnection;
use uuid::Uuid;

use bookhub_core::error::{AppError, ErrorKind};
use bookhub_core::result::AppResult;

/// Derive a stable 64-bit advisory lock key from an offering id.
fn offering_lock_key(offering_id: Uuid) -> i64 {
    let bytes = offering_id.as_bytes();
    let mut key = [0u8; 8];
    key.copy_from_slice(&bytes[..8]);
    i64::from_be_bytes(key)
}

/// Take the shared offering lock for the current transaction.
pub async fn lock_offering_shared(conn: &mut PgConnection, offering_id: Uuid) -> AppResult<()> {
    sqlx::query("SELECT pg_advisory_xact_lock_shared($1)")
        .bind(offering_lock_key(offering_id))
        .execute(conn)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to take shared offering lock", e)
        })?;
    Ok(())
}

/// Take the exclusive offering lock for the current transaction.
pub async fn lock_offering_exclusive(conn: &mut PgConnection, offering_id: Uuid) -> AppResult<()> {
    sqlx::query("SELECT pg_advisory_xact_lock($1)")
        .bind(offering_lock_key(offering_id))
        .execute(conn)
        .await
        .map_err(|e| {
            AppError::with_source(
                ErrorKind::Database,
                "Failed to take exclusive offering lock",
                e,
            )
        })?;
    Ok(())
}
