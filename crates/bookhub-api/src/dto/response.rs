//! Response DTOs.

use serde::{Deserialize, Serialize};

use bookhub_service::booking::BookingView;

/// Standard success response wrapper.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T: Serialize> {
    /// Whether the request was successful.
    pub success: bool,
    /// Response data.
    pub data: T,
}

impl<T: Serialize> ApiResponse<T> {
    /// Creates a successful response.
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data,
        }
    }
}

/// Submission response: the booking plus the idempotent-replay marker.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitBookingResponse {
    /// Whether an idempotency key matched a prior submission.
    pub replayed: bool,
    /// The booking, shaped for the viewer.
    pub booking: BookingView,
}

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Service status.
    pub status: String,
    /// Crate version.
    pub version: String,
    /// Database reachability.
    pub database: String,
}
