//! Booking engine configuration.

use serde::{Deserialize, Serialize};

/// Settings governing the seat-allocation and waitlist engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookingConfig {
    /// Hours a waitlist offer stays open when the offering does not
    /// override it.
    #[serde(default = "default_offer_hours")]
    pub default_offer_hours: i64,
    /// Upper bound on ranked choices per submission when the offering does
    /// not set its own maximum.
    #[serde(default = "default_max_choices")]
    pub default_max_choices: usize,
    /// Whether students/guardians may cancel their own bookings.
    #[serde(default = "default_true")]
    pub allow_self_cancellation: bool,
    /// When set, self-cancellation is refused once the allocated section's
    /// first session has started.
    #[serde(default = "default_true")]
    pub self_cancellation_until_first_session: bool,
}

impl Default for BookingConfig {
    fn default() -> Self {
        Self {
            default_offer_hours: default_offer_hours(),
            default_max_choices: default_max_choices(),
            allow_self_cancellation: default_true(),
            self_cancellation_until_first_session: default_true(),
        }
    }
}

fn default_offer_hours() -> i64 {
    24
}

fn default_max_choices() -> usize {
    3
}

fn default_true() -> bool {
    true
}
