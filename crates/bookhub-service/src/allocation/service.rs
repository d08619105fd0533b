//! The administrative lottery pass over an offering's pending bookings.

use std::collections::HashMap;
use std::sync::Arc;

use rand::Rng;
use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::PgPool;
use tracing::{info, instrument};
use uuid::Uuid;

use bookhub_core::error::{AppError, ErrorKind};
use bookhub_core::result::AppResult;
use bookhub_core::traits::capability::CapabilityResolver;
use bookhub_core::traits::messaging::BookingEvent;
use bookhub_core::types::capability::Capability;
use bookhub_database::locks;
use bookhub_database::repositories::booking::BookingRepository;
use bookhub_database::repositories::offering::OfferingRepository;
use bookhub_database::repositories::schedule::ScheduleRepository;
use bookhub_database::repositories::section::SectionRepository;
use bookhub_entity::booking::{AllocationSnapshot, BookingStatus, WaitlistState};
use bookhub_entity::offering::AllocationMode;

use crate::context::RequestContext;
use crate::dispatch::SideEffectDispatcher;

use super::lottery::{
    self, BusySlot, LotteryCandidate, LotterySection, PassDecision, PassInput,
};

/// One booking's decision inside an allocation report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportedDecision {
    /// The booking decided.
    pub booking_id: Uuid,
    /// The status the booking moved to.
    pub status: BookingStatus,
    /// The section assigned or waitlisted into, if any.
    pub section_id: Option<Uuid>,
    /// The waitlist position taken, if waitlisted.
    pub waitlist_position: Option<i32>,
}

/// The result of one lottery pass.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AllocationReport {
    /// The offering allocated.
    pub offering_id: Uuid,
    /// The seed the pass ran with.
    pub seed: u64,
    /// Whether the pass was a dry run (nothing persisted).
    pub dry_run: bool,
    /// Seats confirmed.
    pub confirmed: usize,
    /// Requests waitlisted.
    pub waitlisted: usize,
    /// Requests rejected.
    pub rejected: usize,
    /// Per-booking decisions, in submission order.
    pub decisions: Vec<ReportedDecision>,
}

/// Runs the seeded-lottery batch pass for lottery-mode offerings.
#[derive(Clone)]
pub struct AllocationService {
    pool: PgPool,
    offerings: Arc<OfferingRepository>,
    sections: Arc<SectionRepository>,
    schedule: Arc<ScheduleRepository>,
    bookings: Arc<BookingRepository>,
    capabilities: Arc<dyn CapabilityResolver>,
    dispatcher: SideEffectDispatcher,
}

impl AllocationService {
    /// Creates a new allocation service.
    pub fn new(
        pool: PgPool,
        offerings: Arc<OfferingRepository>,
        sections: Arc<SectionRepository>,
        schedule: Arc<ScheduleRepository>,
        bookings: Arc<BookingRepository>,
        capabilities: Arc<dyn CapabilityResolver>,
        dispatcher: SideEffectDispatcher,
    ) -> Self {
        Self {
            pool,
            offerings,
            sections,
            schedule,
            bookings,
            capabilities,
            dispatcher,
        }
    }

    /// Run one lottery pass over the offering's submitted bookings.
    ///
    /// The pass holds the exclusive offering lock for its whole
    /// transaction, so no direct submission can interleave with its
    /// in-memory capacity accounting. A `dry_run` evaluates the pass and
    /// reports it without persisting anything. When `seed` is absent a
    /// random one is drawn; either way the seed used is recorded in every
    /// written snapshot and returned in the report.
    #[instrument(skip(self, ctx), fields(user_id = %ctx.user_id))]
    pub async fn run_lottery(
        &self,
        ctx: &RequestContext,
        offering_id: Uuid,
        seed: Option<u64>,
        dry_run: bool,
    ) -> AppResult<AllocationReport> {
        if !self
            .capabilities
            .actor_has_capability(ctx.role, Capability::RunAllocation)
        {
            return Err(AppError::permission_denied(
                "Running an allocation pass requires the allocation capability",
            ));
        }

        let offering = self.offerings.get(offering_id).await?;
        if offering.allocation_mode != AllocationMode::LotteryPreference {
            return Err(AppError::validation(format!(
                "Offering '{}' is not in lottery mode",
                offering.name
            )));
        }

        let seed = seed.unwrap_or_else(|| rand::rng().random());
        let window = offering.activity_window();

        let mut tx = self.pool.begin().await.map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to begin transaction", e)
        })?;
        locks::lock_offering_exclusive(&mut *tx, offering_id).await?;

        let pending = self
            .bookings
            .find_submitted_for_offering(&mut *tx, offering_id)
            .await?;
        if pending.is_empty() {
            tx.rollback().await.map_err(|e| {
                AppError::with_source(ErrorKind::Database, "Failed to end transaction", e)
            })?;
            return Ok(AllocationReport {
                offering_id,
                seed,
                dry_run,
                confirmed: 0,
                waitlisted: 0,
                rejected: 0,
                decisions: Vec::new(),
            });
        }

        let sections = self.sections.find_active_by_offering(offering_id).await?;
        let section_ids: Vec<Uuid> = sections.iter().map(|s| s.id).collect();
        let all_slots = self.schedule.slots_for_sections(&section_ids, &window).await?;
        let reserved = self
            .bookings
            .reserved_counts_for_offering(&mut *tx, offering_id)
            .await?;
        let reserved_by_section: HashMap<Uuid, u32> = reserved
            .into_iter()
            .map(|r| (r.section_id, r.reserved.max(0) as u32))
            .collect();

        let lottery_sections: Vec<LotterySection> = sections
            .iter()
            .map(|s| {
                let taken = reserved_by_section.get(&s.id).copied().unwrap_or(0);
                LotterySection {
                    id: s.id,
                    remaining: s.effective_capacity(offering.capacity).remaining(taken),
                    slots: all_slots
                        .iter()
                        .filter(|slot| slot.section_id == s.id)
                        .map(|slot| BusySlot {
                            section_id: slot.section_id,
                            starts_at: slot.starts_at,
                            ends_at: slot.ends_at,
                        })
                        .collect(),
                    allow_waitlist: s.allow_waitlist,
                }
            })
            .collect();

        let mut busy: HashMap<Uuid, Vec<BusySlot>> = HashMap::new();
        for booking in &pending {
            if busy.contains_key(&booking.student_id) {
                continue;
            }
            let held = self
                .schedule
                .reserved_slots_for_student(booking.student_id, &window, None)
                .await?;
            busy.insert(
                booking.student_id,
                held.into_iter()
                    .map(|r| BusySlot {
                        section_id: r.section_id,
                        starts_at: r.starts_at,
                        ends_at: r.ends_at,
                    })
                    .collect(),
            );
        }

        let input = PassInput {
            sections: lottery_sections,
            candidates: pending
                .iter()
                .map(|b| LotteryCandidate {
                    booking_id: b.id,
                    student_id: b.student_id,
                    choices: b.choices().iter().collect(),
                })
                .collect(),
            busy,
            waitlist_enabled: offering.allow_waitlist,
        };

        let outcome = lottery::run_pass(&input, seed);

        let mut decisions = Vec::with_capacity(outcome.outcomes.len());
        let mut next_position: HashMap<Uuid, i32> = HashMap::new();
        for candidate in &outcome.outcomes {
            let (status, section_id, position, waitlist_state) = match candidate.decision {
                PassDecision::Assign(section_id) => {
                    (BookingStatus::Confirmed, Some(section_id), None, WaitlistState::None)
                }
                PassDecision::Waitlist(section_id) => {
                    let position = match next_position.get(&section_id) {
                        Some(p) => *p,
                        None => {
                            self.sections.lock_row(&mut *tx, section_id).await?;
                            self.bookings.max_waitlist_position(&mut *tx, section_id).await? + 1
                        }
                    };
                    next_position.insert(section_id, position + 1);
                    (
                        BookingStatus::Waitlisted,
                        Some(section_id),
                        Some(position),
                        WaitlistState::Active,
                    )
                }
                PassDecision::Reject => (BookingStatus::Rejected, None, None, WaitlistState::None),
            };

            if !dry_run {
                let snapshot = AllocationSnapshot::lottery(seed, candidate.evaluated.clone());
                self.bookings
                    .apply_decision(
                        &mut *tx,
                        candidate.booking_id,
                        status,
                        section_id,
                        position,
                        waitlist_state,
                        &snapshot,
                    )
                    .await?;
            }

            decisions.push(ReportedDecision {
                booking_id: candidate.booking_id,
                status,
                section_id,
                waitlist_position: position,
            });
        }

        if dry_run {
            tx.rollback().await.map_err(|e| {
                AppError::with_source(ErrorKind::Database, "Failed to end transaction", e)
            })?;
        } else {
            tx.commit().await.map_err(|e| {
                AppError::with_source(ErrorKind::Database, "Failed to commit allocation pass", e)
            })?;
        }

        let report = AllocationReport {
            offering_id,
            seed,
            dry_run,
            confirmed: decisions
                .iter()
                .filter(|d| d.status == BookingStatus::Confirmed)
                .count(),
            waitlisted: decisions
                .iter()
                .filter(|d| d.status == BookingStatus::Waitlisted)
                .count(),
            rejected: decisions
                .iter()
                .filter(|d| d.status == BookingStatus::Rejected)
                .count(),
            decisions,
        };

        info!(
            offering_id = %offering_id,
            seed,
            dry_run,
            confirmed = report.confirmed,
            waitlisted = report.waitlisted,
            rejected = report.rejected,
            "Lottery pass finished"
        );

        if !dry_run {
            for decision in &report.decisions {
                let booking = match self.bookings.get(decision.booking_id).await {
                    Ok(b) => b,
                    Err(e) => {
                        tracing::warn!(booking_id = %decision.booking_id, error = %e, "Failed to reload booking for dispatch");
                        continue;
                    }
                };
                match decision.status {
                    BookingStatus::Confirmed => {
                        self.dispatcher.booking_confirmed(&booking, &offering).await;
                    }
                    BookingStatus::Waitlisted => {
                        self.dispatcher
                            .notify(
                                BookingEvent::Waitlisted,
                                &booking,
                                json!({
                                    "offering": offering.name,
                                    "section_id": decision.section_id,
                                    "position": decision.waitlist_position,
                                }),
                            )
                            .await;
                    }
                    _ => {}
                }
            }
        }

        Ok(report)
    }
}
