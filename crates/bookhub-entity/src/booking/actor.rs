//! Booking actor type.

use serde::{Deserialize, Serialize};
use std::fmt;

use bookhub_core::types::role::PortalRole;

/// Who submitted the booking, relative to the student.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "actor_type", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ActorType {
    /// The student booked for themselves.
    Student,
    /// A linked guardian booked on the student's behalf.
    Guardian,
    /// School staff booked administratively.
    Staff,
}

impl ActorType {
    /// Return the actor type as a lowercase string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Student => "student",
            Self::Guardian => "guardian",
            Self::Staff => "staff",
        }
    }
}

impl From<PortalRole> for ActorType {
    fn from(role: PortalRole) -> Self {
        match role {
            PortalRole::Student => Self::Student,
            PortalRole::Guardian => Self::Guardian,
            PortalRole::Teacher | PortalRole::Coordinator | PortalRole::Admin => Self::Staff,
        }
    }
}

impl fmt::Display for ActorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
