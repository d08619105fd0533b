//! First-come-first-serve allocation for a single submission.
//!
//! Runs inside the caller's transaction. Choices are tried in rank order;
//! a choice is skipped on a schedule conflict or a full section, and every
//! verdict is recorded in the allocation snapshot. When no choice can be
//! seated the request falls back to the waitlist of its first choice.

use std::sync::Arc;

use sqlx::PgConnection;
use uuid::Uuid;

use bookhub_core::result::AppResult;
use bookhub_database::repositories::booking::BookingRepository;
use bookhub_database::repositories::section::SectionRepository;
use bookhub_entity::booking::{AllocationSnapshot, ChoiceOutcome, EvaluatedChoice, RankedChoices};
use bookhub_entity::offering::ActivityOffering;
use bookhub_entity::section::ActivitySection;

use crate::conflict::ConflictDetector;

/// The immediate verdict on an FCFS submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FcfsDecision {
    /// A seat was assigned in the section.
    Confirmed {
        /// The assigned section.
        section_id: Uuid,
    },
    /// Every choice failed; the request joined a waitlist.
    Waitlisted {
        /// The waitlisted section (the first choice).
        section_id: Uuid,
        /// 1-based position in that section's waitlist.
        position: i32,
    },
    /// Every choice failed and no waitlist was available.
    LeftSubmitted,
}

/// The decision plus its audit snapshot.
#[derive(Debug, Clone)]
pub struct FcfsOutcome {
    /// What happened.
    pub decision: FcfsDecision,
    /// The recorded trail of evaluated choices.
    pub snapshot: AllocationSnapshot,
}

/// Allocates seats at submission time for FCFS offerings.
#[derive(Clone)]
pub struct FcfsAllocator {
    bookings: Arc<BookingRepository>,
    sections: Arc<SectionRepository>,
    conflicts: ConflictDetector,
}

impl FcfsAllocator {
    /// Creates a new FCFS allocator.
    pub fn new(
        bookings: Arc<BookingRepository>,
        sections: Arc<SectionRepository>,
        conflicts: ConflictDetector,
    ) -> Self {
        Self {
            bookings,
            sections,
            conflicts,
        }
    }

    /// Try to seat `student_id` in one of the ranked choices.
    ///
    /// The caller holds the transaction and the per-offering shared lock;
    /// section rows are locked here, one at a time in rank order, before
    /// their reserved-seat counts are read.
    pub async fn allocate(
        &self,
        conn: &mut PgConnection,
        offering: &ActivityOffering,
        student_id: Uuid,
        choices: &RankedChoices,
        section_index: &[ActivitySection],
    ) -> AppResult<FcfsOutcome> {
        let window = offering.activity_window();
        let mut evaluated = Vec::with_capacity(choices.len());

        for (rank, section_id) in choices.iter().enumerate() {
            let Some(section) = section_index.iter().find(|s| s.id == section_id) else {
                // Validated upstream; a vanished section is just skipped.
                evaluated.push(EvaluatedChoice {
                    rank: rank as u32,
                    section_id,
                    outcome: ChoiceOutcome::SectionFull,
                });
                continue;
            };

            if let Some(conflict) = self
                .conflicts
                .find_overlap(student_id, section_id, &window, None)
                .await?
            {
                evaluated.push(EvaluatedChoice {
                    rank: rank as u32,
                    section_id,
                    outcome: ChoiceOutcome::ScheduleConflict {
                        with_section: conflict.section_id,
                    },
                });
                continue;
            }

            self.sections.lock_row(conn, section_id).await?;
            let reserved = self.bookings.count_reserved(conn, section_id).await?;
            if !section.effective_capacity(offering.capacity).has_room(reserved) {
                evaluated.push(EvaluatedChoice {
                    rank: rank as u32,
                    section_id,
                    outcome: ChoiceOutcome::SectionFull,
                });
                continue;
            }

            evaluated.push(EvaluatedChoice {
                rank: rank as u32,
                section_id,
                outcome: ChoiceOutcome::Assigned,
            });
            return Ok(FcfsOutcome {
                decision: FcfsDecision::Confirmed { section_id },
                snapshot: AllocationSnapshot::fcfs(evaluated),
            });
        }

        // No choice could be seated; fall back to the first choice's
        // waitlist when both the offering and the section allow it.
        let waitlist_target = choices.first().filter(|id| {
            offering.allow_waitlist
                && section_index
                    .iter()
                    .find(|s| s.id == *id)
                    .is_some_and(|s| s.allow_waitlist)
        });
        if let Some(first) = waitlist_target {
            self.sections.lock_row(conn, first).await?;
            let position = self.bookings.max_waitlist_position(conn, first).await? + 1;
            return Ok(FcfsOutcome {
                decision: FcfsDecision::Waitlisted {
                    section_id: first,
                    position,
                },
                snapshot: AllocationSnapshot::fcfs(evaluated),
            });
        }

        Ok(FcfsOutcome {
            decision: FcfsDecision::LeftSubmitted,
            snapshot: AllocationSnapshot::fcfs(evaluated),
        })
    }
}
