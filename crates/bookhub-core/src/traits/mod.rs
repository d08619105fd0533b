//! Collaborator traits consumed by the booking engine.

pub mod billing;
pub mod capability;
pub mod messaging;

pub use billing::InvoiceIssuer;
pub use capability::CapabilityResolver;
pub use messaging::Notifier;
