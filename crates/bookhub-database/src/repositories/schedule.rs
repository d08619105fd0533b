//! Schedule repository: concrete time slots for sections and students.

use sqlx::PgPool;
use uuid::Uuid;

use bookhub_core::error::{AppError, ErrorKind};
use bookhub_core::result::AppResult;
use bookhub_core::types::window::DateWindow;
use bookhub_entity::section::{ReservedSlot, TimeSlot};

/// Repository for time-slot reads within a date window.
///
/// The calendar itself is owned by the scheduling collaborator; the
/// conflict detector only reads resolved slots.
#[derive(Debug, Clone)]
pub struct ScheduleRepository {
    pool: PgPool,
}

impl ScheduleRepository {
    /// Create a new schedule repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Concrete slots of one section inside `window`.
    pub async fn slots_for_section(
        &self,
        section_id: Uuid,
        window: &DateWindow,
    ) -> AppResult<Vec<TimeSlot>> {
        sqlx::query_as::<_, TimeSlot>(
            "SELECT * FROM section_slots \
             WHERE section_id = $1 AND starts_at < $3 AND ends_at > $2 \
             ORDER BY starts_at ASC",
        )
        .bind(section_id)
        .bind(window.start)
        .bind(window.end)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to load section slots", e))
    }

    /// Concrete slots of several sections inside `window`.
    pub async fn slots_for_sections(
        &self,
        section_ids: &[Uuid],
        window: &DateWindow,
    ) -> AppResult<Vec<TimeSlot>> {
        sqlx::query_as::<_, TimeSlot>(
            "SELECT * FROM section_slots \
             WHERE section_id = ANY($1) AND starts_at < $3 AND ends_at > $2 \
             ORDER BY starts_at ASC",
        )
        .bind(section_ids)
        .bind(window.start)
        .bind(window.end)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to load section slots", e))
    }

    /// Slots of every section the student currently reserves (Offered or
    /// Confirmed bookings) inside `window`, excluding `exclude_booking`.
    pub async fn reserved_slots_for_student(
        &self,
        student_id: Uuid,
        window: &DateWindow,
        exclude_booking: Option<Uuid>,
    ) -> AppResult<Vec<ReservedSlot>> {
        sqlx::query_as::<_, ReservedSlot>(
            "SELECT b.id AS booking_id, sl.section_id, s.label AS section_label, \
                    sl.starts_at, sl.ends_at \
             FROM activity_bookings b \
             JOIN activity_sections s ON s.id = b.allocated_section_id \
             JOIN section_slots sl ON sl.section_id = s.id \
             WHERE b.student_id = $1 \
               AND b.status IN ('offered', 'confirmed') \
               AND ($2::uuid IS NULL OR b.id <> $2) \
               AND sl.starts_at < $4 AND sl.ends_at > $3 \
             ORDER BY sl.starts_at ASC",
        )
        .bind(student_id)
        .bind(exclude_booking)
        .bind(window.start)
        .bind(window.end)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to load reserved slots", e)
        })
    }

    /// The earliest slot of a section, if it has any.
    pub async fn first_slot_for_section(&self, section_id: Uuid) -> AppResult<Option<TimeSlot>> {
        sqlx::query_as::<_, TimeSlot>(
            "SELECT * FROM section_slots WHERE section_id = $1 ORDER BY starts_at ASC LIMIT 1",
        )
        .bind(section_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to load first slot", e))
    }
}
