//! Request context carrying the authenticated portal user.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use bookhub_core::types::role::PortalRole;

/// Context for the current authenticated request.
///
/// Extracted by the API layer and passed into every service method so that
/// each operation knows *who* is acting, rather than reading ambient state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestContext {
    /// The authenticated portal user's ID.
    pub user_id: Uuid,
    /// The user's role as issued by the identity gateway.
    pub role: PortalRole,
    /// When the request was received.
    pub request_time: DateTime<Utc>,
}

impl RequestContext {
    /// Creates a new request context.
    pub fn new(user_id: Uuid, role: PortalRole) -> Self {
        Self {
            user_id,
            role,
            request_time: Utc::now(),
        }
    }

    /// Returns whether the current user is school staff.
    pub fn is_staff(&self) -> bool {
        self.role.is_staff()
    }
}
