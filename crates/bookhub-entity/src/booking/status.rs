//! Booking status state machine and waitlist state.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle status of a booking.
///
/// Transitions are driven exclusively by the allocation engine, waitlist
/// manager, and confirm/cancel operations; nothing else writes status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "booking_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum BookingStatus {
    /// Created but not yet submitted.
    Draft,
    /// Submitted, awaiting allocation (manual/lottery) or left unassigned.
    Submitted,
    /// Holding a waitlist position for a section.
    Waitlisted,
    /// Holding a time-boxed offer for a freed seat.
    Offered,
    /// Holding a confirmed seat.
    Confirmed,
    /// Cancelled by the actor or staff. Terminal.
    Cancelled,
    /// Rejected by the allocation pass. Terminal.
    Rejected,
    /// The seat offer lapsed unaccepted. Terminal.
    Expired,
}

impl BookingStatus {
    /// States that hold a seat against section capacity.
    ///
    /// Offered bookings reserve the seat so it cannot be offered twice.
    pub fn is_reserving(&self) -> bool {
        matches!(self, Self::Offered | Self::Confirmed)
    }

    /// Terminal states; nothing transitions out of them.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Cancelled | Self::Rejected | Self::Expired)
    }

    /// Whether the state machine permits `self -> next`.
    pub fn can_transition_to(&self, next: BookingStatus) -> bool {
        use BookingStatus::*;
        if self.is_terminal() {
            return false;
        }
        // Cancellation is reachable from any active state.
        if next == Cancelled {
            return true;
        }
        match (self, next) {
            (Draft, Submitted) => true,
            (Submitted, Waitlisted | Confirmed | Rejected) => true,
            (Waitlisted, Offered | Confirmed) => true,
            (Offered, Confirmed | Expired) => true,
            _ => false,
        }
    }

    /// Human-readable label surfaced in API responses.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Draft => "Draft",
            Self::Submitted => "Submitted",
            Self::Waitlisted => "On waitlist",
            Self::Offered => "Seat offered",
            Self::Confirmed => "Confirmed",
            Self::Cancelled => "Cancelled",
            Self::Rejected => "Rejected",
            Self::Expired => "Offer expired",
        }
    }

    /// Return the status as a lowercase string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Submitted => "submitted",
            Self::Waitlisted => "waitlisted",
            Self::Offered => "offered",
            Self::Confirmed => "confirmed",
            Self::Cancelled => "cancelled",
            Self::Rejected => "rejected",
            Self::Expired => "expired",
        }
    }
}

impl fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Waitlist sub-state tracked alongside the booking status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "waitlist_state", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum WaitlistState {
    /// Never waitlisted.
    None,
    /// Holding an active waitlist position.
    Active,
    /// Promoted to a pending offer.
    Offered,
    /// The offer was accepted.
    Promoted,
    /// Left the waitlist without a seat (cancelled/expired/rejected).
    Closed,
}

impl WaitlistState {
    /// Return the state as a lowercase string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Active => "active",
            Self::Offered => "offered",
            Self::Promoted => "promoted",
            Self::Closed => "closed",
        }
    }
}

impl fmt::Display for WaitlistState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
