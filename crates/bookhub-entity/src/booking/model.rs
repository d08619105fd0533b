//! Activity booking entity model.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use sqlx::types::Json;
use uuid::Uuid;

use super::actor::ActorType;
use super::choice::RankedChoices;
use super::snapshot::AllocationSnapshot;
use super::status::{BookingStatus, WaitlistState};
use crate::offering::AllocationMode;

/// The core booking ledger record.
///
/// Created once per submission, mutated in place by the allocation engine,
/// waitlist manager, and confirm/cancel operations, never deleted.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ActivityBooking {
    // -- Identity --
    /// Unique booking identifier.
    pub id: Uuid,
    /// The offering booked into.
    pub offering_id: Uuid,
    /// The student the seat is for.
    pub student_id: Uuid,
    /// The portal user who submitted the booking.
    pub booked_by: Uuid,
    /// The actor's relationship to the student.
    pub actor_type: ActorType,

    // -- Request --
    /// Ranked section choices, best first.
    pub ranked_choices: Json<RankedChoices>,
    /// Allocation mode in force at submission time.
    pub allocation_mode: AllocationMode,
    /// Client-supplied dedupe token, globally unique when present.
    pub idempotency_key: Option<String>,

    // -- Decision --
    /// Current lifecycle status.
    pub status: BookingStatus,
    /// The section holding the seat/offer/waitlist entry.
    pub allocated_section_id: Option<Uuid>,
    /// Position within the section waitlist (1-based).
    pub waitlist_position: Option<i32>,
    /// Waitlist sub-state.
    pub waitlist_state: WaitlistState,
    /// When the current offer lapses; set only while Offered.
    pub offer_expires_at: Option<DateTime<Utc>>,

    // -- Audit --
    /// Structured record of the allocation decision.
    pub allocation_snapshot: Option<Json<AllocationSnapshot>>,

    // -- Payment --
    /// Whether confirmation triggers a draft invoice.
    pub payment_required: bool,
    /// Amount billed on confirmation.
    pub payment_amount: Option<Decimal>,
    /// External invoice reference, once issued.
    pub invoice_ref: Option<String>,
    /// Reference of the most recent outbound notification.
    pub notification_ref: Option<String>,
    /// The account that pays.
    pub payer_user_id: Option<Uuid>,

    // -- Lifecycle --
    /// When the booking was submitted.
    pub submitted_at: DateTime<Utc>,
    /// When the seat was confirmed.
    pub confirmed_at: Option<DateTime<Utc>>,
    /// Who confirmed the seat.
    pub confirmed_by: Option<Uuid>,
    /// When the booking was cancelled.
    pub cancelled_at: Option<DateTime<Utc>>,
    /// Who cancelled the booking.
    pub cancelled_by: Option<Uuid>,
    /// Free-form cancellation reason.
    pub cancel_reason: Option<String>,
    /// Row creation time.
    pub created_at: DateTime<Utc>,
    /// Row update time.
    pub updated_at: DateTime<Utc>,
}

impl ActivityBooking {
    /// The ranked choices as submitted.
    pub fn choices(&self) -> &RankedChoices {
        &self.ranked_choices.0
    }

    /// Whether the current offer has lapsed at `now`.
    pub fn offer_expired_at(&self, now: DateTime<Utc>) -> bool {
        matches!(self.status, BookingStatus::Offered)
            && self.offer_expires_at.is_some_and(|exp| exp <= now)
    }
}

/// Data required to create a new booking row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateBooking {
    /// The offering booked into.
    pub offering_id: Uuid,
    /// The student the seat is for.
    pub student_id: Uuid,
    /// The portal user who submitted the booking.
    pub booked_by: Uuid,
    /// The actor's relationship to the student.
    pub actor_type: ActorType,
    /// Ranked section choices.
    pub ranked_choices: RankedChoices,
    /// Allocation mode in force at submission time.
    pub allocation_mode: AllocationMode,
    /// Client-supplied dedupe token.
    pub idempotency_key: Option<String>,
    /// Whether confirmation triggers a draft invoice.
    pub payment_required: bool,
    /// Amount billed on confirmation.
    pub payment_amount: Option<Decimal>,
    /// The account that pays.
    pub payer_user_id: Option<Uuid>,
}
