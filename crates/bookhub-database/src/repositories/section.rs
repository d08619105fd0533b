//! Section repository implementation.

use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use bookhub_core::error::{AppError, ErrorKind};
use bookhub_core::result::AppResult;
use bookhub_entity::section::ActivitySection;

const SECTION_COLUMNS: &str = "s.id, s.offering_id, s.group_id, s.label, s.capacity_override, \
     g.max_size AS group_max_size, s.priority, s.allow_waitlist, s.active, s.created_at";

/// Repository for section reads and the section row lock.
#[derive(Debug, Clone)]
pub struct SectionRepository {
    pool: PgPool,
}

impl SectionRepository {
    /// Create a new section repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// List the active sections of an offering in try-order
    /// (priority tier, then label).
    pub async fn find_active_by_offering(
        &self,
        offering_id: Uuid,
    ) -> AppResult<Vec<ActivitySection>> {
        sqlx::query_as::<_, ActivitySection>(&format!(
            "SELECT {SECTION_COLUMNS} FROM activity_sections s \
             LEFT JOIN section_groups g ON g.id = s.group_id \
             WHERE s.offering_id = $1 AND s.active \
             ORDER BY s.priority ASC, s.label ASC"
        ))
        .bind(offering_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to list sections", e))
    }

    /// Find a section by ID, with the group max size joined in.
    pub async fn find_by_id(&self, id: Uuid) -> AppResult<Option<ActivitySection>> {
        sqlx::query_as::<_, ActivitySection>(&format!(
            "SELECT {SECTION_COLUMNS} FROM activity_sections s \
             LEFT JOIN section_groups g ON g.id = s.group_id \
             WHERE s.id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to find section", e))
    }

    /// Find a section by ID or fail with NotFound.
    pub async fn get(&self, id: Uuid) -> AppResult<ActivitySection> {
        self.find_by_id(id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Section {id} not found")))
    }

    /// Lock the section row for the current transaction.
    ///
    /// This is the capacity guard: reserved-seat counting and waitlist
    /// position assignment for a section happen only while its row is held.
    pub async fn lock_row(&self, conn: &mut PgConnection, section_id: Uuid) -> AppResult<()> {
        let locked: Option<Uuid> =
            sqlx::query_scalar("SELECT id FROM activity_sections WHERE id = $1 FOR UPDATE")
                .bind(section_id)
                .fetch_optional(conn)
                .await
                .map_err(|e| {
                    AppError::with_source(ErrorKind::Database, "Failed to lock section row", e)
                })?;

        if locked.is_none() {
            return Err(AppError::not_found(format!("Section {section_id} not found")));
        }
        Ok(())
    }
}
