//! Activity booking entities: the core ledger record and its enums.

pub mod actor;
pub mod choice;
pub mod model;
pub mod snapshot;
pub mod status;

pub use actor::ActorType;
pub use choice::RankedChoices;
pub use model::{ActivityBooking, CreateBooking};
pub use snapshot::{AllocationSnapshot, ChoiceOutcome, EvaluatedChoice};
pub use status::{BookingStatus, WaitlistState};
