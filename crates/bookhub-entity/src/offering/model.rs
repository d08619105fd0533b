//! Activity offering entity model.

use chrono::{DateTime, Days, NaiveDate, NaiveTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use bookhub_core::types::role::PortalRole;
use bookhub_core::types::window::DateWindow;

use super::mode::AllocationMode;

/// An activity offering that students can book into.
///
/// Owned by the scheduling collaborator; the booking engine consumes its
/// window, capacity, mode, waitlist, and payment settings.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ActivityOffering {
    /// Unique offering identifier.
    pub id: Uuid,
    /// Display name.
    pub name: String,
    /// Offering-level capacity fallback (NULL = unlimited at this level).
    pub capacity: Option<i32>,
    /// How seats are assigned.
    pub allocation_mode: AllocationMode,

    // -- Booking window --
    /// When the booking window opens.
    pub booking_open_at: DateTime<Utc>,
    /// When the booking window closes.
    pub booking_close_at: DateTime<Utc>,
    /// Whether the offering has passed its readiness checks.
    pub ready: bool,
    /// First day of the activity.
    pub start_date: NaiveDate,
    /// Last day of the activity.
    pub end_date: NaiveDate,

    // -- Waitlist --
    /// Whether unassignable requests may join a waitlist.
    pub allow_waitlist: bool,
    /// Whether a freed seat automatically promotes the next waitlisted
    /// booking to an offer.
    pub auto_promote_waitlist: bool,
    /// Offer lifetime in hours; NULL uses the configured default.
    pub offer_hours: Option<i32>,
    /// Whether non-staff viewers may see waitlist positions.
    pub waitlist_position_visible: bool,

    // -- Eligibility --
    /// Whether students may book for themselves.
    pub allow_student_booking: bool,
    /// Whether guardians may book for their children.
    pub allow_guardian_booking: bool,
    /// Minimum age at the offering start date.
    pub min_age: Option<i32>,
    /// Maximum age at the offering start date.
    pub max_age: Option<i32>,
    /// Maximum number of ranked choices per submission.
    pub max_choices: i32,

    // -- Payment --
    /// Whether confirmation triggers a draft invoice.
    pub payment_required: bool,
    /// Amount billed on confirmation.
    pub payment_amount: Option<Decimal>,

    // -- Timestamps --
    /// When the offering was created.
    pub created_at: DateTime<Utc>,
    /// When the offering was last updated.
    pub updated_at: DateTime<Utc>,
}

impl ActivityOffering {
    /// Whether the booking window is open at `now` and the offering is ready.
    pub fn is_bookable_at(&self, now: DateTime<Utc>) -> bool {
        self.ready && now >= self.booking_open_at && now < self.booking_close_at
    }

    /// The activity's run period as a half-open UTC window, used to bound
    /// schedule lookups. Covers the whole last day.
    pub fn activity_window(&self) -> DateWindow {
        let start = self.start_date.and_time(NaiveTime::MIN).and_utc();
        let end = self
            .end_date
            .checked_add_days(Days::new(1))
            .unwrap_or(self.end_date)
            .and_time(NaiveTime::MIN)
            .and_utc();
        DateWindow { start, end }
    }

    /// Whether the given actor type may book, per the offering toggles.
    pub fn actor_may_book(&self, role: PortalRole) -> bool {
        match role {
            PortalRole::Student => self.allow_student_booking,
            PortalRole::Guardian => self.allow_guardian_booking,
            // Staff eligibility is decided by capability, not by toggle.
            _ => true,
        }
    }
}
