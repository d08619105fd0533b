//! Concrete time slots for a section.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// One concrete session of a section: a half-open interval plus location.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct TimeSlot {
    /// Unique slot identifier.
    pub id: Uuid,
    /// The section this slot belongs to.
    pub section_id: Uuid,
    /// Session start.
    pub starts_at: DateTime<Utc>,
    /// Session end (exclusive).
    pub ends_at: DateTime<Utc>,
    /// Room/location label.
    pub location: Option<String>,
}

impl TimeSlot {
    /// Half-open interval overlap: slots that merely touch do not overlap.
    pub fn overlaps(&self, other: &TimeSlot) -> bool {
        !(self.ends_at <= other.starts_at || other.ends_at <= self.starts_at)
    }
}

/// A slot belonging to another booking the student already reserves.
///
/// Query model used by the conflict detector to name the clashing
/// booking/section when an overlap is found.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ReservedSlot {
    /// The reserving booking.
    pub booking_id: Uuid,
    /// The section the booking reserves.
    pub section_id: Uuid,
    /// Section label, for error messages.
    pub section_label: String,
    /// Session start.
    pub starts_at: DateTime<Utc>,
    /// Session end (exclusive).
    pub ends_at: DateTime<Utc>,
}

impl ReservedSlot {
    /// Half-open overlap against a candidate slot.
    pub fn overlaps(&self, slot: &TimeSlot) -> bool {
        !(self.ends_at <= slot.starts_at || slot.ends_at <= self.starts_at)
    }
}
