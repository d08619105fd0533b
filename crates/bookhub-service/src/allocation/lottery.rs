//! Seeded-lottery batch allocation.
//!
//! The pass core is a pure function over pre-loaded inputs: running it
//! twice with the same seed and the same pending set produces an identical
//! assignment, which is what makes a recorded seed auditable.

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Utc};
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use uuid::Uuid;

use bookhub_entity::booking::{ChoiceOutcome, EvaluatedChoice};

/// A half-open busy interval held by a student, tagged with its section.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BusySlot {
    /// The section whose session occupies the interval.
    pub section_id: Uuid,
    /// Session start.
    pub starts_at: DateTime<Utc>,
    /// Session end (exclusive).
    pub ends_at: DateTime<Utc>,
}

impl BusySlot {
    fn overlaps(&self, other: &BusySlot) -> bool {
        !(self.ends_at <= other.starts_at || other.ends_at <= self.starts_at)
    }
}

/// A section as seen by the pass: remaining seats and its sessions.
#[derive(Debug, Clone)]
pub struct LotterySection {
    /// The section.
    pub id: Uuid,
    /// Seats left before the pass; `None` means unlimited.
    pub remaining: Option<u32>,
    /// The section's sessions inside the offering window.
    pub slots: Vec<BusySlot>,
    /// Whether this section takes waitlist entries.
    pub allow_waitlist: bool,
}

/// A pending booking entering the pass.
#[derive(Debug, Clone)]
pub struct LotteryCandidate {
    /// The booking.
    pub booking_id: Uuid,
    /// The student the seat is for.
    pub student_id: Uuid,
    /// Ranked section choices, best first.
    pub choices: Vec<Uuid>,
}

/// Everything the pass needs, loaded up front.
#[derive(Debug, Clone)]
pub struct PassInput {
    /// Sections of the offering with their remaining capacity.
    pub sections: Vec<LotterySection>,
    /// Pending bookings in submission order.
    pub candidates: Vec<LotteryCandidate>,
    /// Pre-existing reserved intervals per student (other offerings or
    /// earlier reservations), consulted for schedule conflicts.
    pub busy: HashMap<Uuid, Vec<BusySlot>>,
    /// Offering-level waitlist enablement.
    pub waitlist_enabled: bool,
}

/// What the pass decided for one booking.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PassDecision {
    /// Assign a confirmed seat in the section.
    Assign(Uuid),
    /// Waitlist on the booking's first choice.
    Waitlist(Uuid),
    /// No seat and no waitlist.
    Reject,
}

/// One booking's result inside a pass outcome.
#[derive(Debug, Clone)]
pub struct CandidateOutcome {
    /// The booking.
    pub booking_id: Uuid,
    /// The decision.
    pub decision: PassDecision,
    /// The audit trail of every choice evaluated.
    pub evaluated: Vec<EvaluatedChoice>,
}

/// The full result of one pass.
#[derive(Debug, Clone)]
pub struct PassOutcome {
    /// The seed the shuffles were drawn from.
    pub seed: u64,
    /// Per-booking outcomes, in input candidate order.
    pub outcomes: Vec<CandidateOutcome>,
}

/// Run one seeded pass over the pending set.
///
/// Ranks are processed lowest first. Within a rank, candidates are
/// bucketed by their rank-th choice and each bucket is shuffled with the
/// seeded generator as the fairness tie-break. A candidate is assigned
/// when the section has a seat left and none of its sessions overlaps the
/// student's busy intervals (pre-existing reservations plus assignments
/// already made this pass). Leftovers are waitlisted on their first choice
/// when waitlisting is enabled and that section allows it, else rejected.
pub fn run_pass(input: &PassInput, seed: u64) -> PassOutcome {
    let mut rng = StdRng::seed_from_u64(seed);

    let mut remaining: HashMap<Uuid, Option<u32>> = input
        .sections
        .iter()
        .map(|s| (s.id, s.remaining))
        .collect();
    let slots_by_section: HashMap<Uuid, &[BusySlot]> = input
        .sections
        .iter()
        .map(|s| (s.id, s.slots.as_slice()))
        .collect();
    let waitlist_by_section: HashMap<Uuid, bool> = input
        .sections
        .iter()
        .map(|s| (s.id, s.allow_waitlist))
        .collect();

    let mut busy: HashMap<Uuid, Vec<BusySlot>> = input.busy.clone();
    let mut assigned: HashMap<Uuid, Uuid> = HashMap::new();
    let mut evaluated: HashMap<Uuid, Vec<EvaluatedChoice>> = input
        .candidates
        .iter()
        .map(|c| (c.booking_id, Vec::with_capacity(c.choices.len())))
        .collect();

    let max_rank = input
        .candidates
        .iter()
        .map(|c| c.choices.len())
        .max()
        .unwrap_or(0);

    for rank in 0..max_rank {
        // Bucket the still-unassigned candidates by their rank-th choice.
        // BTreeMap keeps bucket order independent of hash state so the
        // shuffle stream is reproducible.
        let mut buckets: BTreeMap<Uuid, Vec<&LotteryCandidate>> = BTreeMap::new();
        for candidate in &input.candidates {
            if assigned.contains_key(&candidate.booking_id) {
                continue;
            }
            if let Some(section_id) = candidate.choices.get(rank) {
                buckets.entry(*section_id).or_default().push(candidate);
            }
        }

        for (section_id, mut bucket) in buckets {
            bucket.shuffle(&mut rng);
            for candidate in bucket {
                let trail = evaluated.entry(candidate.booking_id).or_default();

                let seats = remaining.get_mut(&section_id);
                let has_room = match &seats {
                    Some(Some(n)) => *n > 0,
                    Some(None) => true,
                    // Unknown section; treat as full rather than crash the pass.
                    None => false,
                };
                if !has_room {
                    trail.push(EvaluatedChoice {
                        rank: rank as u32,
                        section_id,
                        outcome: ChoiceOutcome::SectionFull,
                    });
                    continue;
                }

                let section_slots = slots_by_section.get(&section_id).copied().unwrap_or(&[]);
                let student_busy = busy.entry(candidate.student_id).or_default();
                let clash = section_slots
                    .iter()
                    .find_map(|s| student_busy.iter().find(|b| b.overlaps(s)));
                if let Some(held) = clash {
                    let with_section = held.section_id;
                    trail.push(EvaluatedChoice {
                        rank: rank as u32,
                        section_id,
                        outcome: ChoiceOutcome::ScheduleConflict { with_section },
                    });
                    continue;
                }

                // Seat granted: decrement and block the student's calendar
                // for the rest of the pass.
                if let Some(Some(n)) = remaining.get_mut(&section_id) {
                    *n -= 1;
                }
                student_busy.extend_from_slice(section_slots);
                assigned.insert(candidate.booking_id, section_id);
                trail.push(EvaluatedChoice {
                    rank: rank as u32,
                    section_id,
                    outcome: ChoiceOutcome::Assigned,
                });
            }
        }
    }

    let outcomes = input
        .candidates
        .iter()
        .map(|candidate| {
            let decision = match assigned.get(&candidate.booking_id) {
                Some(section_id) => PassDecision::Assign(*section_id),
                None => {
                    let first = candidate.choices.first().copied();
                    match first {
                        Some(section_id)
                            if input.waitlist_enabled
                                && waitlist_by_section.get(&section_id).copied().unwrap_or(false) =>
                        {
                            PassDecision::Waitlist(section_id)
                        }
                        _ => PassDecision::Reject,
                    }
                }
            };
            let mut trail = evaluated.remove(&candidate.booking_id).unwrap_or_default();
            // Ranks never reached (an earlier rank was assigned) are
            // recorded as skipped for the audit snapshot.
            if matches!(decision, PassDecision::Assign(_)) {
                let reached = trail.len();
                for (rank, section_id) in candidate.choices.iter().enumerate().skip(reached) {
                    trail.push(EvaluatedChoice {
                        rank: rank as u32,
                        section_id: *section_id,
                        outcome: ChoiceOutcome::Skipped,
                    });
                }
            }
            CandidateOutcome {
                booking_id: candidate.booking_id,
                decision,
                evaluated: trail,
            }
        })
        .collect();

    PassOutcome { seed, outcomes }
}
