//! Side-effect dispatch after booking transitions commit.
//!
//! Invoicing and notifications run after the owning transaction has
//! committed and are strictly best-effort: a failed collaborator call is
//! logged and never unwinds the booking itself.

use std::sync::Arc;

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde_json::json;
use tracing::{info, warn};
use uuid::Uuid;

use bookhub_core::result::AppResult;
use bookhub_core::traits::billing::{DraftInvoiceRequest, InvoiceIssuer};
use bookhub_core::traits::messaging::{BookingEvent, BookingNotification, Notifier};
use bookhub_database::repositories::booking::BookingRepository;
use bookhub_entity::booking::ActivityBooking;
use bookhub_entity::offering::ActivityOffering;

/// Fires post-commit side effects for booking transitions.
#[derive(Clone)]
pub struct SideEffectDispatcher {
    invoices: Arc<dyn InvoiceIssuer>,
    notifier: Arc<dyn Notifier>,
    bookings: Arc<BookingRepository>,
}

impl SideEffectDispatcher {
    /// Creates a new dispatcher.
    pub fn new(
        invoices: Arc<dyn InvoiceIssuer>,
        notifier: Arc<dyn Notifier>,
        bookings: Arc<BookingRepository>,
    ) -> Self {
        Self {
            invoices,
            notifier,
            bookings,
        }
    }

    /// Effects of a confirmed seat: draft invoice (when payment applies)
    /// and a confirmation notification.
    pub async fn booking_confirmed(
        &self,
        booking: &ActivityBooking,
        offering: &ActivityOffering,
    ) {
        if booking.payment_required && booking.invoice_ref.is_none() {
            match booking.payment_amount {
                Some(amount) if amount > Decimal::ZERO => {
                    self.issue_invoice(booking, offering, amount).await;
                }
                _ => {}
            }
        }
        self.notify(
            BookingEvent::Confirmed,
            booking,
            json!({ "offering": offering.name, "section_id": booking.allocated_section_id }),
        )
        .await;
    }

    /// Send one lifecycle notification, logging on failure.
    pub async fn notify(
        &self,
        event: BookingEvent,
        booking: &ActivityBooking,
        context: serde_json::Value,
    ) {
        let notification = BookingNotification {
            event,
            booking_id: booking.id,
            student_id: booking.student_id,
            audience: audience_of(booking),
            context,
        };
        match self.notifier.send(notification).await {
            Ok(reference) => {
                info!(booking_id = %booking.id, event = event.label(), %reference, "Notification sent");
                if let Err(e) = self.bookings.set_notification_ref(booking.id, &reference).await {
                    warn!(booking_id = %booking.id, error = %e, "Failed to record notification ref");
                }
            }
            Err(e) => {
                warn!(booking_id = %booking.id, event = event.label(), error = %e, "Notification failed");
            }
        }
    }

    async fn issue_invoice(
        &self,
        booking: &ActivityBooking,
        offering: &ActivityOffering,
        amount: Decimal,
    ) {
        let request = DraftInvoiceRequest {
            booking_id: booking.id,
            offering_id: booking.offering_id,
            payer_user_id: booking.payer_user_id.unwrap_or(booking.booked_by),
            amount,
            description: format!("Activity booking: {}", offering.name),
        };
        match self.invoices.create_draft(request).await {
            Ok(invoice_ref) => {
                if let Err(e) = self.bookings.set_invoice_ref(booking.id, &invoice_ref).await {
                    warn!(booking_id = %booking.id, error = %e, "Failed to record invoice ref");
                } else {
                    info!(booking_id = %booking.id, %invoice_ref, "Draft invoice issued");
                }
            }
            Err(e) => {
                warn!(booking_id = %booking.id, error = %e, "Invoice issue failed");
            }
        }
    }
}

/// Portal users who should hear about a booking transition.
fn audience_of(booking: &ActivityBooking) -> Vec<Uuid> {
    let mut audience = vec![booking.booked_by];
    if let Some(payer) = booking.payer_user_id {
        if payer != booking.booked_by {
            audience.push(payer);
        }
    }
    audience
}

/// Invoice issuer that only logs, for deployments without a billing
/// collaborator wired in.
#[derive(Debug, Default, Clone)]
pub struct LoggingInvoiceIssuer;

#[async_trait]
impl InvoiceIssuer for LoggingInvoiceIssuer {
    async fn create_draft(&self, request: DraftInvoiceRequest) -> AppResult<String> {
        info!(
            booking_id = %request.booking_id,
            amount = %request.amount,
            "Draft invoice requested (logging issuer)"
        );
        Ok(format!("draft-{}", request.booking_id))
    }
}

/// Notifier that only logs, for deployments without a messaging
/// collaborator wired in.
#[derive(Debug, Default, Clone)]
pub struct LoggingNotifier;

#[async_trait]
impl Notifier for LoggingNotifier {
    async fn send(&self, notification: BookingNotification) -> AppResult<String> {
        info!(
            booking_id = %notification.booking_id,
            event = notification.event.label(),
            "Notification requested (logging notifier)"
        );
        Ok(format!("msg-{}", notification.booking_id))
    }
}
