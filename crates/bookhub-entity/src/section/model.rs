//! Activity section entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// A bookable section (seat group) within an offering.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ActivitySection {
    /// Unique section identifier.
    pub id: Uuid,
    /// The parent offering.
    pub offering_id: Uuid,
    /// The underlying group/class, when the section mirrors one.
    pub group_id: Option<Uuid>,
    /// Display label ("Choir", "Tuesday 16:00", …).
    pub label: String,
    /// Section-level capacity override.
    pub capacity_override: Option<i32>,
    /// Max size of the underlying group (joined in by the repository).
    pub group_max_size: Option<i32>,
    /// Try-order tier for section listings.
    pub priority: i32,
    /// Whether this section participates in waitlisting.
    pub allow_waitlist: bool,
    /// Whether the section is open for allocation.
    pub active: bool,
    /// When the section was created.
    pub created_at: DateTime<Utc>,
}

impl ActivitySection {
    /// Resolve the effective capacity: section override, else the
    /// underlying group's max size, else the offering capacity, else
    /// unlimited.
    pub fn effective_capacity(&self, offering_capacity: Option<i32>) -> EffectiveCapacity {
        self.capacity_override
            .or(self.group_max_size)
            .or(offering_capacity)
            .map_or(EffectiveCapacity::Unlimited, |n| {
                EffectiveCapacity::Limited(n.max(0) as u32)
            })
    }
}

/// Resolved seat capacity for a section.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EffectiveCapacity {
    /// A fixed number of seats.
    Limited(u32),
    /// No capacity bound at any level.
    Unlimited,
}

impl EffectiveCapacity {
    /// Whether `reserved` seats leave room for one more.
    pub fn has_room(&self, reserved: u32) -> bool {
        match self {
            Self::Limited(max) => reserved < *max,
            Self::Unlimited => true,
        }
    }

    /// Remaining seats, or `None` for unlimited.
    pub fn remaining(&self, reserved: u32) -> Option<u32> {
        match self {
            Self::Limited(max) => Some(max.saturating_sub(reserved)),
            Self::Unlimited => None,
        }
    }
}
