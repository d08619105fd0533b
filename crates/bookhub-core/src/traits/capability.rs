//! Capability resolution trait.

use crate::types::capability::Capability;
use crate::types::role::PortalRole;

/// Decides whether an acting role holds a capability.
///
/// Injected as a dependency into every service that gates an operation, so
/// permission policy is swappable and never read from ambient state.
pub trait CapabilityResolver: Send + Sync + 'static {
    /// Whether `role` holds `capability`.
    fn actor_has_capability(&self, role: PortalRole, capability: Capability) -> bool;
}

/// Default role-to-capability policy.
///
/// Coordinators and admins hold every booking capability; teachers may run
/// nothing administratively but can view waitlist positions for their own
/// sections; students and guardians hold none.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultCapabilities;

impl CapabilityResolver for DefaultCapabilities {
    fn actor_has_capability(&self, role: PortalRole, capability: Capability) -> bool {
        match role {
            PortalRole::Admin | PortalRole::Coordinator => true,
            PortalRole::Teacher => matches!(capability, Capability::ViewWaitlistPositions),
            PortalRole::Student | PortalRole::Guardian => false,
        }
    }
}
