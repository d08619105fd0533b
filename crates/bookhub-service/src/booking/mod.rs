//! Booking lifecycle operations.

pub mod service;
pub mod view;

pub use service::{
    BatchItemResult, BatchSubmitReport, BookingService, SubmitBookingRequest, SubmitOutcome,
};
pub use view::BookingView;
