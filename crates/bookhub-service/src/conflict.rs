//! Schedule conflict detection.
//!
//! A candidate section conflicts when any of its slots overlaps any slot
//! of a section the student already reserves (Offered or Confirmed) in the
//! same window. Intervals are half-open; the first pairwise hit
//! short-circuits.

use std::sync::Arc;

use uuid::Uuid;

use bookhub_core::result::AppResult;
use bookhub_core::types::window::DateWindow;
use bookhub_database::repositories::schedule::ScheduleRepository;
use bookhub_entity::section::{ReservedSlot, TimeSlot};

/// A detected schedule conflict.
#[derive(Debug, Clone, serde::Serialize)]
pub struct Conflict {
    /// The booking holding the clashing reservation.
    pub booking_id: Uuid,
    /// The section the student already reserves.
    pub section_id: Uuid,
    /// Its label, for error messages.
    pub section_label: String,
}

/// Detects time-interval conflicts against a student's reservations.
#[derive(Debug, Clone)]
pub struct ConflictDetector {
    /// Slot reads.
    schedule: Arc<ScheduleRepository>,
}

impl ConflictDetector {
    /// Creates a new conflict detector.
    pub fn new(schedule: Arc<ScheduleRepository>) -> Self {
        Self { schedule }
    }

    /// Find the first reservation of `student_id` that overlaps the target
    /// section inside `window`, if any.
    ///
    /// `exclude_booking` ignores the student's own booking when re-checking
    /// an offer. Cost is O(target slots × reserved slots), bounded by the
    /// window length.
    pub async fn find_overlap(
        &self,
        student_id: Uuid,
        target_section_id: Uuid,
        window: &DateWindow,
        exclude_booking: Option<Uuid>,
    ) -> AppResult<Option<Conflict>> {
        let target_slots = self
            .schedule
            .slots_for_section(target_section_id, window)
            .await?;
        // A section with no slots in the window cannot conflict.
        if target_slots.is_empty() {
            return Ok(None);
        }

        let reserved = self
            .schedule
            .reserved_slots_for_student(student_id, window, exclude_booking)
            .await?;

        Ok(first_overlap(&target_slots, &reserved).map(|hit| Conflict {
            booking_id: hit.booking_id,
            section_id: hit.section_id,
            section_label: hit.section_label.clone(),
        }))
    }
}

/// First reserved slot that overlaps any target slot.
fn first_overlap<'a>(
    target_slots: &[TimeSlot],
    reserved: &'a [ReservedSlot],
) -> Option<&'a ReservedSlot> {
    for target in target_slots {
        for held in reserved {
            if held.overlaps(target) {
                return Some(held);
            }
        }
    }
    None
}
