//! Booking ledger repository implementation.
//!
//! All capacity-sensitive reads and writes go through connection-scoped
//! methods so they run inside the caller's transaction with the lock order
//! of the concurrency guard: duplicate guard first, then the section row,
//! then the waitlist max-position read.

use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use bookhub_core::error::{AppError, ErrorKind};
use bookhub_core::result::AppResult;
use bookhub_entity::booking::{
    ActivityBooking, AllocationSnapshot, BookingStatus, CreateBooking, WaitlistState,
};

/// Reserved-seat count per section, used by the lottery pass to seed its
/// in-memory capacity map.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct SectionReservedCount {
    /// The section.
    pub section_id: Uuid,
    /// Bookings in a reserving status allocated to it.
    pub reserved: i64,
}

/// Repository for booking ledger CRUD, locking reads, and transitions.
#[derive(Debug, Clone)]
pub struct BookingRepository {
    pool: PgPool,
}

impl BookingRepository {
    /// Create a new booking repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Find a booking by ID.
    pub async fn find_by_id(&self, id: Uuid) -> AppResult<Option<ActivityBooking>> {
        sqlx::query_as::<_, ActivityBooking>("SELECT * FROM activity_bookings WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to find booking", e))
    }

    /// Find a booking by ID or fail with NotFound.
    pub async fn get(&self, id: Uuid) -> AppResult<ActivityBooking> {
        self.find_by_id(id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Booking {id} not found")))
    }

    /// Look up a prior submission by idempotency key.
    ///
    /// Runs before any lock acquisition so duplicate retries stay cheap.
    pub async fn find_by_idempotency_key(&self, key: &str) -> AppResult<Option<ActivityBooking>> {
        sqlx::query_as::<_, ActivityBooking>(
            "SELECT * FROM activity_bookings WHERE idempotency_key = $1",
        )
        .bind(key)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to look up idempotency key", e)
        })
    }

    /// Idempotency-key lookup inside the caller's transaction, so a batch
    /// sees keys inserted by its own earlier, still-uncommitted items.
    pub async fn find_by_idempotency_key_in(
        &self,
        conn: &mut PgConnection,
        key: &str,
    ) -> AppResult<Option<ActivityBooking>> {
        sqlx::query_as::<_, ActivityBooking>(
            "SELECT * FROM activity_bookings WHERE idempotency_key = $1",
        )
        .bind(key)
        .fetch_optional(conn)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to look up idempotency key", e)
        })
    }

    /// List a student's bookings, newest first.
    pub async fn list_by_student(&self, student_id: Uuid) -> AppResult<Vec<ActivityBooking>> {
        sqlx::query_as::<_, ActivityBooking>(
            "SELECT * FROM activity_bookings WHERE student_id = $1 ORDER BY submitted_at DESC",
        )
        .bind(student_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to list bookings", e))
    }

    /// Duplicate guard: lock and return the student's active booking for an
    /// offering, if one exists.
    pub async fn find_active_for_student_locked(
        &self,
        conn: &mut PgConnection,
        student_id: Uuid,
        offering_id: Uuid,
    ) -> AppResult<Option<ActivityBooking>> {
        sqlx::query_as::<_, ActivityBooking>(
            "SELECT * FROM activity_bookings \
             WHERE student_id = $1 AND offering_id = $2 \
               AND status IN ('submitted', 'waitlisted', 'offered', 'confirmed') \
             FOR UPDATE",
        )
        .bind(student_id)
        .bind(offering_id)
        .fetch_optional(conn)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to check for active booking", e)
        })
    }

    /// Lock and load a booking row for a status transition.
    pub async fn find_by_id_locked(
        &self,
        conn: &mut PgConnection,
        id: Uuid,
    ) -> AppResult<Option<ActivityBooking>> {
        sqlx::query_as::<_, ActivityBooking>(
            "SELECT * FROM activity_bookings WHERE id = $1 FOR UPDATE",
        )
        .bind(id)
        .fetch_optional(conn)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to lock booking", e))
    }

    /// Count seats reserved against a section. Callers must hold the
    /// section row lock.
    pub async fn count_reserved(
        &self,
        conn: &mut PgConnection,
        section_id: Uuid,
    ) -> AppResult<u32> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM activity_bookings \
             WHERE allocated_section_id = $1 AND status IN ('offered', 'confirmed')",
        )
        .bind(section_id)
        .fetch_one(conn)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to count reserved seats", e)
        })?;
        Ok(count.max(0) as u32)
    }

    /// Reserved-seat counts for every section of an offering.
    pub async fn reserved_counts_for_offering(
        &self,
        conn: &mut PgConnection,
        offering_id: Uuid,
    ) -> AppResult<Vec<SectionReservedCount>> {
        sqlx::query_as::<_, SectionReservedCount>(
            "SELECT allocated_section_id AS section_id, COUNT(*) AS reserved \
             FROM activity_bookings \
             WHERE offering_id = $1 AND allocated_section_id IS NOT NULL \
               AND status IN ('offered', 'confirmed') \
             GROUP BY allocated_section_id",
        )
        .bind(offering_id)
        .fetch_all(conn)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to count reserved seats", e)
        })
    }

    /// Highest waitlist position currently held in a section (0 if none).
    /// Callers must hold the section row lock.
    pub async fn max_waitlist_position(
        &self,
        conn: &mut PgConnection,
        section_id: Uuid,
    ) -> AppResult<i32> {
        let max: Option<i32> = sqlx::query_scalar(
            "SELECT MAX(waitlist_position) FROM activity_bookings \
             WHERE allocated_section_id = $1 AND status IN ('waitlisted', 'offered')",
        )
        .bind(section_id)
        .fetch_one(conn)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to read waitlist positions", e)
        })?;
        Ok(max.unwrap_or(0))
    }

    /// Lock and return the lowest-position waitlisted booking of a section.
    pub async fn find_next_waitlisted_locked(
        &self,
        conn: &mut PgConnection,
        section_id: Uuid,
    ) -> AppResult<Option<ActivityBooking>> {
        sqlx::query_as::<_, ActivityBooking>(
            "SELECT * FROM activity_bookings \
             WHERE allocated_section_id = $1 AND status = 'waitlisted' \
             ORDER BY waitlist_position ASC LIMIT 1 \
             FOR UPDATE",
        )
        .bind(section_id)
        .fetch_optional(conn)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to find next waitlisted", e)
        })
    }

    /// The pending set for a lottery pass: submitted bookings of the
    /// offering in submission order.
    pub async fn find_submitted_for_offering(
        &self,
        conn: &mut PgConnection,
        offering_id: Uuid,
    ) -> AppResult<Vec<ActivityBooking>> {
        sqlx::query_as::<_, ActivityBooking>(
            "SELECT * FROM activity_bookings \
             WHERE offering_id = $1 AND status = 'submitted' \
             ORDER BY submitted_at ASC, id ASC",
        )
        .bind(offering_id)
        .fetch_all(conn)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to load pending bookings", e)
        })
    }

    /// Insert a new booking row with its initial decision.
    #[allow(clippy::too_many_arguments)]
    pub async fn create(
        &self,
        conn: &mut PgConnection,
        data: &CreateBooking,
        status: BookingStatus,
        allocated_section_id: Option<Uuid>,
        waitlist_position: Option<i32>,
        waitlist_state: WaitlistState,
        snapshot: Option<&AllocationSnapshot>,
    ) -> AppResult<ActivityBooking> {
        sqlx::query_as::<_, ActivityBooking>(
            "INSERT INTO activity_bookings \
             (offering_id, student_id, booked_by, actor_type, ranked_choices, allocation_mode, \
              idempotency_key, status, allocated_section_id, waitlist_position, waitlist_state, \
              allocation_snapshot, payment_required, payment_amount, payer_user_id, \
              submitted_at, confirmed_at, confirmed_by) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, NOW(), \
                     CASE WHEN $8 = 'confirmed'::booking_status THEN NOW() END, \
                     CASE WHEN $8 = 'confirmed'::booking_status THEN $3 END) \
             RETURNING *",
        )
        .bind(data.offering_id)
        .bind(data.student_id)
        .bind(data.booked_by)
        .bind(data.actor_type)
        .bind(Json(&data.ranked_choices))
        .bind(data.allocation_mode)
        .bind(&data.idempotency_key)
        .bind(status)
        .bind(allocated_section_id)
        .bind(waitlist_position)
        .bind(waitlist_state)
        .bind(snapshot.map(Json))
        .bind(data.payment_required)
        .bind(data.payment_amount)
        .bind(data.payer_user_id)
        .fetch_one(conn)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to create booking", e))
    }

    /// Apply a lottery decision to an already-submitted booking.
    pub async fn apply_decision(
        &self,
        conn: &mut PgConnection,
        id: Uuid,
        status: BookingStatus,
        allocated_section_id: Option<Uuid>,
        waitlist_position: Option<i32>,
        waitlist_state: WaitlistState,
        snapshot: &AllocationSnapshot,
    ) -> AppResult<()> {
        let result = sqlx::query(
            "UPDATE activity_bookings SET status = $2, allocated_section_id = $3, \
             waitlist_position = $4, waitlist_state = $5, allocation_snapshot = $6, \
             confirmed_at = CASE WHEN $2 = 'confirmed'::booking_status THEN NOW() END, \
             updated_at = NOW() \
             WHERE id = $1 AND status = 'submitted'",
        )
        .bind(id)
        .bind(status)
        .bind(allocated_section_id)
        .bind(waitlist_position)
        .bind(waitlist_state)
        .bind(Json(snapshot))
        .execute(conn)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to apply decision", e))?;

        if result.rows_affected() == 0 {
            return Err(AppError::state(format!(
                "Booking {id} is no longer pending allocation"
            )));
        }
        Ok(())
    }

    /// Promote a waitlisted booking to a time-boxed offer.
    pub async fn mark_offered(
        &self,
        conn: &mut PgConnection,
        id: Uuid,
        offer_expires_at: DateTime<Utc>,
    ) -> AppResult<()> {
        let result = sqlx::query(
            "UPDATE activity_bookings SET status = 'offered', waitlist_state = 'offered', \
             offer_expires_at = $2, updated_at = NOW() \
             WHERE id = $1 AND status = 'waitlisted'",
        )
        .bind(id)
        .bind(offer_expires_at)
        .execute(conn)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to mark offered", e))?;

        if result.rows_affected() == 0 {
            return Err(AppError::state(format!("Booking {id} is not waitlisted")));
        }
        Ok(())
    }

    /// Confirm a booking from an offer or a waitlist spot, clearing the
    /// waitlist fields.
    pub async fn mark_confirmed(
        &self,
        conn: &mut PgConnection,
        id: Uuid,
        confirmed_by: Uuid,
    ) -> AppResult<()> {
        let result = sqlx::query(
            "UPDATE activity_bookings SET status = 'confirmed', waitlist_state = 'promoted', \
             waitlist_position = NULL, offer_expires_at = NULL, \
             confirmed_at = NOW(), confirmed_by = $2, updated_at = NOW() \
             WHERE id = $1 AND status IN ('offered', 'waitlisted')",
        )
        .bind(id)
        .bind(confirmed_by)
        .execute(conn)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to confirm booking", e))?;

        if result.rows_affected() == 0 {
            return Err(AppError::state(format!(
                "Booking {id} cannot be confirmed from its current status"
            )));
        }
        Ok(())
    }

    /// Terminal transition for a lapsed offer.
    pub async fn mark_expired(&self, conn: &mut PgConnection, id: Uuid) -> AppResult<()> {
        let result = sqlx::query(
            "UPDATE activity_bookings SET status = 'expired', waitlist_state = 'closed', \
             waitlist_position = NULL, offer_expires_at = NULL, updated_at = NOW() \
             WHERE id = $1 AND status = 'offered'",
        )
        .bind(id)
        .execute(conn)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to expire offer", e))?;

        if result.rows_affected() == 0 {
            return Err(AppError::state(format!("Booking {id} holds no offer")));
        }
        Ok(())
    }

    /// Cancel a booking, recording actor, reason, and timestamp.
    pub async fn cancel(
        &self,
        conn: &mut PgConnection,
        id: Uuid,
        cancelled_by: Uuid,
        reason: Option<&str>,
    ) -> AppResult<()> {
        let result = sqlx::query(
            "UPDATE activity_bookings SET status = 'cancelled', \
             waitlist_state = CASE WHEN waitlist_state = 'none' THEN 'none' \
                                   ELSE 'closed' END::waitlist_state, \
             waitlist_position = NULL, offer_expires_at = NULL, \
             cancelled_at = NOW(), cancelled_by = $2, cancel_reason = $3, updated_at = NOW() \
             WHERE id = $1 AND status IN ('draft', 'submitted', 'waitlisted', 'offered', 'confirmed')",
        )
        .bind(id)
        .bind(cancelled_by)
        .bind(reason)
        .execute(conn)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to cancel booking", e))?;

        if result.rows_affected() == 0 {
            return Err(AppError::state(format!(
                "Booking {id} is already in a terminal status"
            )));
        }
        Ok(())
    }

    /// Record the external invoice reference on a confirmed booking.
    pub async fn set_invoice_ref(&self, id: Uuid, invoice_ref: &str) -> AppResult<()> {
        sqlx::query(
            "UPDATE activity_bookings SET invoice_ref = $2, updated_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .bind(invoice_ref)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to set invoice ref", e))?;
        Ok(())
    }

    /// Record the reference of the latest outbound notification.
    pub async fn set_notification_ref(&self, id: Uuid, notification_ref: &str) -> AppResult<()> {
        sqlx::query(
            "UPDATE activity_bookings SET notification_ref = $2, updated_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .bind(notification_ref)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to set notification ref", e)
        })?;
        Ok(())
    }
}
