//! Offering repository implementation.

use sqlx::PgPool;
use uuid::Uuid;

use bookhub_core::error::{AppError, ErrorKind};
use bookhub_core::result::AppResult;
use bookhub_entity::offering::ActivityOffering;

/// Repository for offering reads.
///
/// Offerings are owned by the scheduling collaborator; the booking engine
/// only reads them.
#[derive(Debug, Clone)]
pub struct OfferingRepository {
    pool: PgPool,
}

impl OfferingRepository {
    /// Create a new offering repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Find an offering by ID.
    pub async fn find_by_id(&self, id: Uuid) -> AppResult<Option<ActivityOffering>> {
        sqlx::query_as::<_, ActivityOffering>("SELECT * FROM activity_offerings WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to find offering", e))
    }

    /// Find an offering by ID or fail with NotFound.
    pub async fn get(&self, id: Uuid) -> AppResult<ActivityOffering> {
        self.find_by_id(id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Offering {id} not found")))
    }
}
