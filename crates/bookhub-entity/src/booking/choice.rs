//! Ranked section choices on a booking request.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use bookhub_core::error::AppError;
use bookhub_core::result::AppResult;

/// An ordered, duplicate-free list of section choices, best first.
///
/// Stored on the booking as jsonb and replayed by the allocation engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RankedChoices(Vec<Uuid>);

impl RankedChoices {
    /// Validate and build a ranked choice list.
    ///
    /// Rejects empty lists, lists beyond `max_choices`, duplicates, and
    /// section ids not present in `known_sections`.
    pub fn new(
        choices: Vec<Uuid>,
        max_choices: usize,
        known_sections: &[Uuid],
    ) -> AppResult<Self> {
        if choices.is_empty() {
            return Err(AppError::validation("At least one section choice is required"));
        }
        if choices.len() > max_choices {
            return Err(AppError::validation(format!(
                "Too many choices: {} given, at most {max_choices} allowed",
                choices.len()
            )));
        }
        for (i, id) in choices.iter().enumerate() {
            if choices[..i].contains(id) {
                return Err(AppError::validation(format!("Duplicate section choice {id}")));
            }
            if !known_sections.contains(id) {
                return Err(AppError::validation(format!(
                    "Section {id} is not an active section of this offering"
                )));
            }
        }
        Ok(Self(choices))
    }

    /// The first-ranked choice.
    ///
    /// `None` only for a stored row whose jsonb list is empty; transparent
    /// deserialization does not re-run the constructor's validation.
    pub fn first(&self) -> Option<Uuid> {
        self.0.first().copied()
    }

    /// Number of choices.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// False for any list built by the constructor.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate choices in rank order.
    pub fn iter(&self) -> impl Iterator<Item = Uuid> + '_ {
        self.0.iter().copied()
    }
}
