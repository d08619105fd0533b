//! Request DTOs.

use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use bookhub_service::booking::SubmitBookingRequest;

/// POST /api/bookings body.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct SubmitBookingPayload {
    /// The offering to book into.
    pub offering_id: Uuid,
    /// The student the seat is for.
    pub student_id: Uuid,
    /// Ranked section choices, best first.
    #[validate(length(min = 1, max = 10, message = "1 to 10 choices"))]
    pub choices: Vec<Uuid>,
    /// Client-supplied dedupe token.
    #[validate(length(min = 1, max = 128))]
    pub idempotency_key: Option<String>,
    /// The account that pays; defaults to the submitter.
    pub payer_user_id: Option<Uuid>,
}

impl From<SubmitBookingPayload> for SubmitBookingRequest {
    fn from(payload: SubmitBookingPayload) -> Self {
        Self {
            offering_id: payload.offering_id,
            student_id: payload.student_id,
            choices: payload.choices,
            idempotency_key: payload.idempotency_key,
            payer_user_id: payload.payer_user_id,
        }
    }
}

/// POST /api/bookings/batch body.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct BatchSubmitPayload {
    /// The submissions, processed in order.
    #[validate(length(min = 1, max = 200, message = "1 to 200 items"), nested)]
    pub items: Vec<SubmitBookingPayload>,
}

/// POST /api/bookings/:id/cancel body.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CancelBookingPayload {
    /// Free-form cancellation reason.
    pub reason: Option<String>,
}

/// POST /api/offerings/:id/allocate body.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunAllocationPayload {
    /// Seed for the pass; drawn at random when absent.
    pub seed: Option<u64>,
    /// Evaluate and report without persisting.
    #[serde(default)]
    pub dry_run: bool,
}
