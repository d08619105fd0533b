//! Typed allocation audit snapshot.
//!
//! Records the inputs and outcome of every allocation decision so a pass
//! can be audited or replayed. Stored on the booking as jsonb.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::offering::AllocationMode;

/// Outcome of evaluating one ranked choice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ChoiceOutcome {
    /// The seat was assigned here.
    Assigned,
    /// Skipped: the student already holds an overlapping reservation.
    ScheduleConflict {
        /// The section the candidate overlapped with.
        with_section: Uuid,
    },
    /// Skipped: no seats remained.
    SectionFull,
    /// Not evaluated (an earlier choice was assigned).
    Skipped,
}

/// One evaluated ranked choice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvaluatedChoice {
    /// 0-based rank of the choice.
    pub rank: u32,
    /// The candidate section.
    pub section_id: Uuid,
    /// What happened.
    #[serde(flatten)]
    pub outcome: ChoiceOutcome,
}

/// Structured record of one allocation decision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllocationSnapshot {
    /// The allocation mode used.
    pub mode: AllocationMode,
    /// The lottery seed, when the decision came from a lottery pass.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
    /// Every choice evaluated, in order.
    pub evaluated: Vec<EvaluatedChoice>,
}

impl AllocationSnapshot {
    /// Snapshot for a first-come-first-serve decision.
    pub fn fcfs(evaluated: Vec<EvaluatedChoice>) -> Self {
        Self {
            mode: AllocationMode::FirstComeFirstServe,
            seed: None,
            evaluated,
        }
    }

    /// Snapshot for one booking inside a lottery pass.
    pub fn lottery(seed: u64, evaluated: Vec<EvaluatedChoice>) -> Self {
        Self {
            mode: AllocationMode::LotteryPreference,
            seed: Some(seed),
            evaluated,
        }
    }
}
