//! Portal roles as issued by the upstream identity gateway.

use serde::{Deserialize, Serialize};

/// Role of the signed-in portal user.
///
/// Identity resolution itself is owned by the gateway; this engine only
/// consumes the resolved role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PortalRole {
    /// A student account.
    Student,
    /// A parent/guardian account.
    Guardian,
    /// A teaching staff account.
    Teacher,
    /// An activity coordinator account.
    Coordinator,
    /// A school administrator account.
    Admin,
}

impl PortalRole {
    /// Whether this role belongs to school staff.
    pub fn is_staff(&self) -> bool {
        matches!(self, Self::Teacher | Self::Coordinator | Self::Admin)
    }
}

impl std::str::FromStr for PortalRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "student" => Ok(Self::Student),
            "guardian" => Ok(Self::Guardian),
            "teacher" => Ok(Self::Teacher),
            "coordinator" => Ok(Self::Coordinator),
            "admin" => Ok(Self::Admin),
            other => Err(format!("unknown portal role '{other}'")),
        }
    }
}
