//! Capabilities checked through the injected [`CapabilityResolver`].
//!
//! Permission checks are never read from ambient session state; services
//! ask the resolver whether the acting role holds a capability.
//!
//! [`CapabilityResolver`]: crate::traits::capability::CapabilityResolver

use serde::{Deserialize, Serialize};

/// A staff capability relevant to the booking engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    /// Book on behalf of any student and bypass per-actor booking toggles.
    ManageBookings,
    /// Cancel any booking regardless of self-cancellation settings.
    CancelAnyBooking,
    /// Run the administrative allocation pass for an offering.
    RunAllocation,
    /// See waitlist positions even when the offering hides them.
    ViewWaitlistPositions,
}
