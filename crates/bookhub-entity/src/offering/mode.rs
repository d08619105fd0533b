//! Allocation mode enumeration.

use serde::{Deserialize, Serialize};
use std::fmt;

/// How seats in an offering are assigned to requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "allocation_mode", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum AllocationMode {
    /// Assign at submission time, in ranked-choice order, first fit wins.
    FirstComeFirstServe,
    /// Defer to the administrative seeded-lottery batch pass.
    LotteryPreference,
    /// Defer entirely to direct staff action.
    Manual,
}

impl AllocationMode {
    /// Return the mode as a snake_case string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::FirstComeFirstServe => "first_come_first_serve",
            Self::LotteryPreference => "lottery_preference",
            Self::Manual => "manual",
        }
    }
}

impl fmt::Display for AllocationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
