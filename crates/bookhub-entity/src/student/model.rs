//! Student entity model.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// A student known to the booking engine.
///
/// Identity and guardianship are owned by the school platform; this engine
/// reads the linkage for eligibility checks only.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Student {
    /// Unique student identifier.
    pub id: Uuid,
    /// The student's own portal account, when they have one.
    pub portal_user_id: Option<Uuid>,
    /// Display name.
    pub full_name: String,
    /// Date of birth, used for age limits.
    pub date_of_birth: Option<NaiveDate>,
    /// Row creation time.
    pub created_at: DateTime<Utc>,
}

impl Student {
    /// Completed years of age on `at`, or `None` without a date of birth.
    pub fn age_on(&self, at: NaiveDate) -> Option<i32> {
        let dob = self.date_of_birth?;
        let mut age = at.years_since(dob)? as i32;
        if age < 0 {
            age = 0;
        }
        Some(age)
    }
}
