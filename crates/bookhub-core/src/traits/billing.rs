//! Billing collaborator trait.

use async_trait::async_trait;
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::result::AppResult;

/// A request to create a draft invoice for a confirmed booking.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct DraftInvoiceRequest {
    /// The booking the invoice is for.
    pub booking_id: Uuid,
    /// The offering being billed.
    pub offering_id: Uuid,
    /// The account that pays (resolved payer).
    pub payer_user_id: Uuid,
    /// The invoice amount.
    pub amount: Decimal,
    /// Human-readable line description.
    pub description: String,
}

/// Issues draft invoices when a booking with payment is confirmed.
///
/// Invoice generation itself is an external collaborator; this engine only
/// fires the trigger and records the returned reference.
#[async_trait]
pub trait InvoiceIssuer: Send + Sync + 'static {
    /// Create a draft invoice and return its external reference.
    async fn create_draft(&self, request: DraftInvoiceRequest) -> AppResult<String>;
}
