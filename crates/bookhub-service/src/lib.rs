//! # bookhub-service
//!
//! Business logic for the BookHub booking engine: request context,
//! eligibility resolution, schedule conflict detection, the allocation
//! engine (FCFS and seeded lottery), waitlist management, the booking
//! lifecycle service, and best-effort side-effect dispatch.

pub mod allocation;
pub mod booking;
pub mod conflict;
pub mod context;
pub mod dispatch;
pub mod eligibility;
pub mod waitlist;

pub use context::RequestContext;
