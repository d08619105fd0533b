//! Viewer-shaped booking projection.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use bookhub_entity::booking::{ActivityBooking, BookingStatus};
use bookhub_entity::offering::ActivityOffering;

/// A booking as presented to a viewer.
///
/// The waitlist position is suppressed for non-staff viewers when the
/// offering keeps positions private.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookingView {
    /// The booking.
    pub id: Uuid,
    /// The offering booked into.
    pub offering_id: Uuid,
    /// The offering's display name.
    pub offering_name: String,
    /// The student the seat is for.
    pub student_id: Uuid,
    /// Current lifecycle status.
    pub status: BookingStatus,
    /// Human-readable status label.
    pub status_label: String,
    /// The section holding the seat/offer/waitlist entry.
    pub allocated_section_id: Option<Uuid>,
    /// Waitlist position, subject to the visibility setting.
    pub waitlist_position: Option<i32>,
    /// When the current offer lapses.
    pub offer_expires_at: Option<DateTime<Utc>>,
    /// The ranked choices as submitted.
    pub ranked_choices: Vec<Uuid>,
    /// Whether confirmation triggers a draft invoice.
    pub payment_required: bool,
    /// Amount billed on confirmation.
    pub payment_amount: Option<Decimal>,
    /// External invoice reference, once issued.
    pub invoice_ref: Option<String>,
    /// Reference of the most recent outbound notification.
    pub notification_ref: Option<String>,
    /// When the booking was submitted.
    pub submitted_at: DateTime<Utc>,
    /// When the seat was confirmed.
    pub confirmed_at: Option<DateTime<Utc>>,
    /// When the booking was cancelled.
    pub cancelled_at: Option<DateTime<Utc>>,
}

impl BookingView {
    /// Shape a booking for a viewer.
    pub fn project(
        booking: &ActivityBooking,
        offering: &ActivityOffering,
        viewer_is_staff: bool,
    ) -> Self {
        let position_visible = viewer_is_staff || offering.waitlist_position_visible;
        Self {
            id: booking.id,
            offering_id: booking.offering_id,
            offering_name: offering.name.clone(),
            student_id: booking.student_id,
            status: booking.status,
            status_label: booking.status.label().to_string(),
            allocated_section_id: booking.allocated_section_id,
            waitlist_position: booking.waitlist_position.filter(|_| position_visible),
            offer_expires_at: booking.offer_expires_at,
            ranked_choices: booking.choices().iter().collect(),
            payment_required: booking.payment_required,
            payment_amount: booking.payment_amount,
            invoice_ref: booking.invoice_ref.clone(),
            notification_ref: booking.notification_ref.clone(),
            submitted_at: booking.submitted_at,
            confirmed_at: booking.confirmed_at,
            cancelled_at: booking.cancelled_at,
        }
    }
}
