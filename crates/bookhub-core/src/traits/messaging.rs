//! Messaging collaborator trait.

use async_trait::async_trait;
use uuid::Uuid;

use crate::result::AppResult;

/// Booking lifecycle events that produce an outbound notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BookingEvent {
    /// A seat was confirmed.
    Confirmed,
    /// The booking entered a waitlist.
    Waitlisted,
    /// A freed seat was offered with an expiry.
    Offered,
    /// The booking was cancelled.
    Cancelled,
}

impl BookingEvent {
    /// Stable event label used by the messaging collaborator.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Confirmed => "booking.confirmed",
            Self::Waitlisted => "booking.waitlisted",
            Self::Offered => "booking.offered",
            Self::Cancelled => "booking.cancelled",
        }
    }
}

/// A structured notification handed to the messaging collaborator.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct BookingNotification {
    /// The lifecycle event.
    pub event: BookingEvent,
    /// The booking concerned.
    pub booking_id: Uuid,
    /// The student concerned.
    pub student_id: Uuid,
    /// Portal users who should receive the message.
    pub audience: Vec<Uuid>,
    /// Free-form context (section label, expiry, …).
    pub context: serde_json::Value,
}

/// Delivers booking notifications.
///
/// Delivery is best-effort: callers log failures and never roll back the
/// owning transaction because a send failed.
#[async_trait]
pub trait Notifier: Send + Sync + 'static {
    /// Send a notification and return its external reference.
    async fn send(&self, notification: BookingNotification) -> AppResult<String>;
}
