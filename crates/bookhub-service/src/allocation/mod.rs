//! The allocation engine: per-request FCFS assignment and the
//! administrative seeded-lottery batch pass.

pub mod fcfs;
pub mod lottery;
pub mod service;

pub use fcfs::{FcfsAllocator, FcfsDecision};
pub use service::{AllocationReport, AllocationService};
