//! Shared types used across crates.

pub mod capability;
pub mod role;
pub mod window;

pub use capability::Capability;
pub use role::PortalRole;
pub use window::DateWindow;
