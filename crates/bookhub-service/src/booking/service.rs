//! The booking lifecycle service: submission (single and batch), offer
//! confirmation, cancellation, and viewer queries.
//!
//! Every single-item operation runs in exactly one transaction with the
//! fixed lock order: the student's active bookings for the offering first,
//! then the target section row, then the waitlist max-position read.
//! Side effects run only after the transaction committed.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::{Acquire, PgConnection, PgPool};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use bookhub_core::config::booking::BookingConfig;
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
use bookhub_database::repositories::student::StudentRepository;
use bookhub_entity::booking::{
    ActivityBooking, ActorType, BookingStatus, CreateBooking, RankedChoices, WaitlistState,
};
use bookhub_entity::offering::{ActivityOffering, AllocationMode};
use bookhub_entity::section::ActivitySection;
use bookhub_entity::student::Student;

use crate::allocation::{FcfsAllocator, FcfsDecision};
use crate::conflict::ConflictDetector;
use crate::context::RequestContext;
use crate::dispatch::SideEffectDispatcher;
use crate::eligibility::EligibilityResolver;
use crate::waitlist::WaitlistManager;

/// A booking submission.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitBookingRequest {
    /// The offering to book into.
    pub offering_id: Uuid,
    /// The student the seat is for.
    pub student_id: Uuid,
    /// Ranked section choices, best first.
    pub choices: Vec<Uuid>,
    /// Client-supplied dedupe token.
    pub idempotency_key: Option<String>,
    /// The account that pays; defaults to the submitter.
    pub payer_user_id: Option<Uuid>,
}

/// The result of a submission.
#[derive(Debug, Clone)]
pub struct SubmitOutcome {
    /// The booking row (new, or the prior one on an idempotent replay).
    pub booking: ActivityBooking,
    /// Whether an idempotency key matched a prior submission.
    pub replayed: bool,
}

/// One item's result inside a batch report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchItemResult {
    /// Position of the item in the batch request.
    pub index: usize,
    /// The booking created or replayed, when the item succeeded.
    pub booking_id: Option<Uuid>,
    /// Its status, when the item succeeded.
    pub status: Option<BookingStatus>,
    /// The error, when the item failed.
    pub error: Option<String>,
}

/// Aggregated outcome of a batch submission.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchSubmitReport {
    /// Items that produced or replayed a booking.
    pub succeeded: usize,
    /// Items rolled back to their savepoint.
    pub failed: usize,
    /// Per-item breakdown, in request order.
    pub items: Vec<BatchItemResult>,
}

/// A validated submission ready for the locked phase.
struct PreparedSubmission {
    offering: ActivityOffering,
    student: Student,
    sections: Vec<ActivitySection>,
    create: CreateBooking,
}

/// Drives the booking ledger through its lifecycle.
#[derive(Clone)]
pub struct BookingService {
    pool: PgPool,
    offerings: Arc<OfferingRepository>,
    sections: Arc<SectionRepository>,
    students: Arc<StudentRepository>,
    bookings: Arc<BookingRepository>,
    schedule: Arc<ScheduleRepository>,
    eligibility: EligibilityResolver,
    conflicts: ConflictDetector,
    fcfs: FcfsAllocator,
    capabilities: Arc<dyn CapabilityResolver>,
    dispatcher: SideEffectDispatcher,
    waitlist: WaitlistManager,
    config: BookingConfig,
}

impl BookingService {
    /// Creates a new booking service.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        pool: PgPool,
        offerings: Arc<OfferingRepository>,
        sections: Arc<SectionRepository>,
        students: Arc<StudentRepository>,
        bookings: Arc<BookingRepository>,
        schedule: Arc<ScheduleRepository>,
        eligibility: EligibilityResolver,
        conflicts: ConflictDetector,
        fcfs: FcfsAllocator,
        capabilities: Arc<dyn CapabilityResolver>,
        dispatcher: SideEffectDispatcher,
        waitlist: WaitlistManager,
        config: BookingConfig,
    ) -> Self {
        Self {
            pool,
            offerings,
            sections,
            students,
            bookings,
            schedule,
            eligibility,
            conflicts,
            fcfs,
            capabilities,
            dispatcher,
            waitlist,
            config,
        }
    }

    /// Submit one booking request.
    ///
    /// An idempotency-key hit returns the prior booking unchanged before
    /// any lock is taken. Otherwise the request is validated, allocated
    /// per the offering's mode inside one transaction, and side effects
    /// fire after commit.
    #[instrument(skip(self, ctx, request), fields(user_id = %ctx.user_id, offering_id = %request.offering_id))]
    pub async fn submit(
        &self,
        ctx: &RequestContext,
        request: SubmitBookingRequest,
    ) -> AppResult<SubmitOutcome> {
        if let Some(prior) = self.replay_for_key(&request).await? {
            return Ok(SubmitOutcome {
                booking: prior,
                replayed: true,
            });
        }

        let prepared = self.prepare(ctx, &request).await?;

        let mut tx = self.pool.begin().await.map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to begin transaction", e)
        })?;
        let booking = self.submit_locked(&mut *tx, &prepared).await?;
        tx.commit().await.map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to commit submission", e)
        })?;

        info!(booking_id = %booking.id, status = booking.status.label(), "Booking submitted");
        self.dispatch_submission_effects(&booking, &prepared.offering).await;

        Ok(SubmitOutcome {
            booking,
            replayed: false,
        })
    }

    /// Submit a batch of booking requests.
    ///
    /// Each item runs inside its own savepoint of one outer transaction,
    /// so one item's failure rolls back only that item. The caller gets a
    /// per-item breakdown with aggregated counts.
    #[instrument(skip_all, fields(user_id = %ctx.user_id, items = requests.len()))]
    pub async fn submit_batch(
        &self,
        ctx: &RequestContext,
        requests: Vec<SubmitBookingRequest>,
    ) -> AppResult<BatchSubmitReport> {
        if requests.is_empty() {
            return Err(AppError::validation("Batch submission is empty"));
        }

        let mut items = Vec::with_capacity(requests.len());
        let mut committed: Vec<(ActivityBooking, ActivityOffering)> = Vec::new();

        let mut tx = self.pool.begin().await.map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to begin transaction", e)
        })?;

        for (index, request) in requests.iter().enumerate() {
            // The key check runs on the batch transaction so a key reused
            // by an earlier item in the same batch replays instead of
            // tripping the unique index.
            match self.replay_for_key_in(&mut *tx, request).await {
                Ok(Some(prior)) => {
                    items.push(BatchItemResult {
                        index,
                        booking_id: Some(prior.id),
                        status: Some(prior.status),
                        error: None,
                    });
                    continue;
                }
                Ok(None) => {}
                Err(e) => {
                    items.push(failed_item(index, &e));
                    continue;
                }
            }

            let prepared = match self.prepare(ctx, request).await {
                Ok(p) => p,
                Err(e) => {
                    items.push(failed_item(index, &e));
                    continue;
                }
            };

            let mut savepoint = tx.begin().await.map_err(|e| {
                AppError::with_source(ErrorKind::Database, "Failed to open savepoint", e)
            })?;
            match self.submit_locked(&mut *savepoint, &prepared).await {
                Ok(booking) => {
                    savepoint.commit().await.map_err(|e| {
                        AppError::with_source(ErrorKind::Database, "Failed to release savepoint", e)
                    })?;
                    items.push(BatchItemResult {
                        index,
                        booking_id: Some(booking.id),
                        status: Some(booking.status),
                        error: None,
                    });
                    committed.push((booking, prepared.offering));
                }
                Err(e) => {
                    savepoint.rollback().await.map_err(|e| {
                        AppError::with_source(
                            ErrorKind::Database,
                            "Failed to roll back savepoint",
                            e,
                        )
                    })?;
                    items.push(failed_item(index, &e));
                }
            }
        }

        tx.commit().await.map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to commit batch", e)
        })?;

        for (booking, offering) in &committed {
            self.dispatch_submission_effects(booking, offering).await;
        }

        let succeeded = items.iter().filter(|i| i.error.is_none()).count();
        let failed = items.len() - succeeded;
        info!(succeeded, failed, "Batch submission finished");

        Ok(BatchSubmitReport {
            succeeded,
            failed,
            items,
        })
    }

    /// Accept an open offer (or confirm directly from the waitlist).
    ///
    /// A lapsed offer is transitioned to Expired and the acceptance is
    /// refused. A clear conflict recheck and, from the waitlist, a seat
    /// count under the section lock are required before confirmation.
    #[instrument(skip(self, ctx), fields(user_id = %ctx.user_id))]
    pub async fn confirm_offer(
        &self,
        ctx: &RequestContext,
        booking_id: Uuid,
    ) -> AppResult<ActivityBooking> {
        let mut tx = self.pool.begin().await.map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to begin transaction", e)
        })?;

        // Locks follow the submission order: offering advisory lock first,
        // row locks after. The shared form keeps this seat-taking
        // confirmation out of a running lottery pass, whose capacity
        // accounting never re-reads the section rows.
        let offering_id = self.bookings.get(booking_id).await?.offering_id;
        let offering = self.offerings.get(offering_id).await?;
        locks::lock_offering_shared(&mut *tx, offering.id).await?;

        let booking = self
            .bookings
            .find_by_id_locked(&mut *tx, booking_id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Booking {booking_id} not found")))?;
        let student = self.students.get(booking.student_id).await?;
        self.assert_may_manage(ctx, &student, Capability::ManageBookings)
            .await?;

        if !booking.status.can_transition_to(BookingStatus::Confirmed) {
            return Err(AppError::state(format!(
                "Booking is {}; only an offered or waitlisted booking can be confirmed",
                booking.status.label()
            )));
        }
        let section_id = booking.allocated_section_id.ok_or_else(|| {
            AppError::state("Booking has no allocated section to confirm into")
        })?;

        if booking.offer_expired_at(ctx.request_time) {
            self.bookings.mark_expired(&mut *tx, booking_id).await?;
            tx.commit().await.map_err(|e| {
                AppError::with_source(ErrorKind::Database, "Failed to commit expiry", e)
            })?;
            return Err(AppError::state("The offer has expired"));
        }

        let window = offering.activity_window();
        if let Some(conflict) = self
            .conflicts
            .find_overlap(booking.student_id, section_id, &window, Some(booking_id))
            .await?
        {
            return Err(AppError::conflict(format!(
                "Schedule conflict with section '{}'",
                conflict.section_label
            )));
        }

        // Confirming from the waitlist takes a seat that was never
        // reserved, so the seat count is rechecked under the section lock.
        // An open offer already reserves its seat.
        if booking.status == BookingStatus::Waitlisted {
            let section = self.sections.get(section_id).await?;
            self.sections.lock_row(&mut *tx, section_id).await?;
            let reserved = self.bookings.count_reserved(&mut *tx, section_id).await?;
            if !section.effective_capacity(offering.capacity).has_room(reserved) {
                return Err(AppError::capacity(format!(
                    "Section '{}' has no seats left",
                    section.label
                )));
            }
        }

        self.bookings
            .mark_confirmed(&mut *tx, booking_id, ctx.user_id)
            .await?;
        tx.commit().await.map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to commit confirmation", e)
        })?;

        let confirmed = self.bookings.get(booking_id).await?;
        info!(booking_id = %booking_id, "Offer confirmed");
        self.dispatcher.booking_confirmed(&confirmed, &offering).await;
        Ok(confirmed)
    }

    /// Cancel a booking.
    ///
    /// Cancellation commits on its own; when the cancelled booking held a
    /// confirmed seat and the offering auto-promotes, the freed seat is
    /// offered to the waitlist head in a separate transaction whose
    /// failure is logged, never surfaced.
    #[instrument(skip(self, ctx, reason), fields(user_id = %ctx.user_id))]
    pub async fn cancel_booking(
        &self,
        ctx: &RequestContext,
        booking_id: Uuid,
        reason: Option<String>,
    ) -> AppResult<ActivityBooking> {
        let mut tx = self.pool.begin().await.map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to begin transaction", e)
        })?;

        let booking = self
            .bookings
            .find_by_id_locked(&mut *tx, booking_id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Booking {booking_id} not found")))?;
        let offering = self.offerings.get(booking.offering_id).await?;
        let student = self.students.get(booking.student_id).await?;

        if ctx.is_staff() {
            if !self
                .capabilities
                .actor_has_capability(ctx.role, Capability::CancelAnyBooking)
            {
                return Err(AppError::permission_denied(
                    "Staff account lacks the cancellation capability",
                ));
            }
        } else {
            self.eligibility.resolve_actor(ctx, &student).await?;
            self.assert_self_cancellation_open(ctx, &booking).await?;
        }

        if !booking.status.can_transition_to(BookingStatus::Cancelled) {
            return Err(AppError::state(format!(
                "Booking is already {}; there is nothing to cancel",
                booking.status.label()
            )));
        }

        // Confirmed and offered bookings both hold a seat against the
        // section, so cancelling either one may free a seat to promote.
        let freed_seat = booking.status.is_reserving();
        let freed_section = booking.allocated_section_id;

        self.bookings
            .cancel(&mut *tx, booking_id, ctx.user_id, reason.as_deref())
            .await?;
        tx.commit().await.map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to commit cancellation", e)
        })?;

        let cancelled = self.bookings.get(booking_id).await?;
        info!(booking_id = %booking_id, "Booking cancelled");
        self.dispatcher
            .notify(
                BookingEvent::Cancelled,
                &cancelled,
                json!({ "offering": offering.name, "reason": reason }),
            )
            .await;

        if freed_seat && offering.auto_promote_waitlist {
            if let Some(section_id) = freed_section {
                if let Err(e) = self.waitlist.promote_next(&offering, section_id).await {
                    warn!(section_id = %section_id, error = %e, "Waitlist promotion failed");
                }
            }
        }

        Ok(cancelled)
    }

    /// List a student's bookings as seen by the viewer.
    #[instrument(skip(self, ctx), fields(user_id = %ctx.user_id))]
    pub async fn list_for_student(
        &self,
        ctx: &RequestContext,
        student_id: Uuid,
    ) -> AppResult<Vec<crate::booking::BookingView>> {
        let student = self.students.get(student_id).await?;
        self.eligibility.resolve_actor(ctx, &student).await?;

        let bookings = self.bookings.list_by_student(student_id).await?;
        let mut views = Vec::with_capacity(bookings.len());
        for booking in &bookings {
            let offering = self.offerings.get(booking.offering_id).await?;
            views.push(crate::booking::BookingView::project(
                booking,
                &offering,
                ctx.is_staff(),
            ));
        }
        Ok(views)
    }

    /// Fetch one booking shaped for the viewer.
    pub async fn view_booking(
        &self,
        ctx: &RequestContext,
        booking_id: Uuid,
    ) -> AppResult<crate::booking::BookingView> {
        let booking = self.bookings.get(booking_id).await?;
        let student = self.students.get(booking.student_id).await?;
        self.eligibility.resolve_actor(ctx, &student).await?;
        let offering = self.offerings.get(booking.offering_id).await?;
        Ok(crate::booking::BookingView::project(
            &booking,
            &offering,
            ctx.is_staff(),
        ))
    }

    /// Idempotency precheck: a key hit replays the prior booking.
    ///
    /// Runs before any lock acquisition so duplicate retries stay cheap.
    /// A key reused against a different offering or student is a conflict.
    async fn replay_for_key(
        &self,
        request: &SubmitBookingRequest,
    ) -> AppResult<Option<ActivityBooking>> {
        let Some(key) = request.idempotency_key.as_deref() else {
            return Ok(None);
        };
        match self.bookings.find_by_idempotency_key(key).await? {
            Some(prior) => validate_replay(prior, request).map(Some),
            None => Ok(None),
        }
    }

    /// The batch variant of the idempotency precheck, reading through the
    /// batch's own transaction.
    async fn replay_for_key_in(
        &self,
        conn: &mut PgConnection,
        request: &SubmitBookingRequest,
    ) -> AppResult<Option<ActivityBooking>> {
        let Some(key) = request.idempotency_key.as_deref() else {
            return Ok(None);
        };
        match self.bookings.find_by_idempotency_key_in(conn, key).await? {
            Some(prior) => validate_replay(prior, request).map(Some),
            None => Ok(None),
        }
    }

    /// Validation phase: everything that needs no lock.
    async fn prepare(
        &self,
        ctx: &RequestContext,
        request: &SubmitBookingRequest,
    ) -> AppResult<PreparedSubmission> {
        let offering = self.offerings.get(request.offering_id).await?;
        let student = self.students.get(request.student_id).await?;

        let actor_type = self.eligibility.resolve_actor(ctx, &student).await?;
        self.eligibility
            .assert_actor_allowed(ctx, &offering, actor_type)?;
        self.eligibility.assert_window_open(ctx, &offering)?;
        self.eligibility.assert_age(&offering, &student)?;

        let sections = self.sections.find_active_by_offering(offering.id).await?;
        let known: Vec<Uuid> = sections.iter().map(|s| s.id).collect();
        let max_choices = usize::try_from(offering.max_choices)
            .ok()
            .filter(|m| *m > 0)
            .unwrap_or(self.config.default_max_choices);
        let ranked_choices = RankedChoices::new(request.choices.clone(), max_choices, &known)?;

        let create = CreateBooking {
            offering_id: offering.id,
            student_id: student.id,
            booked_by: ctx.user_id,
            actor_type,
            ranked_choices,
            allocation_mode: offering.allocation_mode,
            idempotency_key: request.idempotency_key.clone(),
            payment_required: offering.payment_required,
            payment_amount: offering.payment_amount,
            payer_user_id: request.payer_user_id.or(Some(ctx.user_id)),
        };

        Ok(PreparedSubmission {
            offering,
            student,
            sections,
            create,
        })
    }

    /// Locked phase: duplicate guard, allocation, insert.
    async fn submit_locked(
        &self,
        conn: &mut PgConnection,
        prepared: &PreparedSubmission,
    ) -> AppResult<ActivityBooking> {
        let offering = &prepared.offering;
        locks::lock_offering_shared(conn, offering.id).await?;

        if let Some(existing) = self
            .bookings
            .find_active_for_student_locked(conn, prepared.student.id, offering.id)
            .await?
        {
            return Err(AppError::conflict(format!(
                "Student already has an active booking ({}) for this offering",
                existing.status.label()
            )));
        }

        match offering.allocation_mode {
            AllocationMode::FirstComeFirstServe => {
                let outcome = self
                    .fcfs
                    .allocate(
                        conn,
                        offering,
                        prepared.student.id,
                        &prepared.create.ranked_choices,
                        &prepared.sections,
                    )
                    .await?;
                let (status, section_id, position, waitlist_state) = match outcome.decision {
                    FcfsDecision::Confirmed { section_id } => (
                        BookingStatus::Confirmed,
                        Some(section_id),
                        None,
                        WaitlistState::None,
                    ),
                    FcfsDecision::Waitlisted {
                        section_id,
                        position,
                    } => (
                        BookingStatus::Waitlisted,
                        Some(section_id),
                        Some(position),
                        WaitlistState::Active,
                    ),
                    FcfsDecision::LeftSubmitted => {
                        (BookingStatus::Submitted, None, None, WaitlistState::None)
                    }
                };
                self.bookings
                    .create(
                        conn,
                        &prepared.create,
                        status,
                        section_id,
                        position,
                        waitlist_state,
                        Some(&outcome.snapshot),
                    )
                    .await
            }
            // Lottery and manual offerings defer the decision: the batch
            // pass resolves lottery bookings, staff resolve manual ones.
            AllocationMode::LotteryPreference | AllocationMode::Manual => {
                self.bookings
                    .create(
                        conn,
                        &prepared.create,
                        BookingStatus::Submitted,
                        None,
                        None,
                        WaitlistState::None,
                        None,
                    )
                    .await
            }
        }
    }

    async fn dispatch_submission_effects(
        &self,
        booking: &ActivityBooking,
        offering: &ActivityOffering,
    ) {
        match booking.status {
            BookingStatus::Confirmed => {
                self.dispatcher.booking_confirmed(booking, offering).await;
            }
            BookingStatus::Waitlisted => {
                self.dispatcher
                    .notify(
                        BookingEvent::Waitlisted,
                        booking,
                        json!({
                            "offering": offering.name,
                            "section_id": booking.allocated_section_id,
                            "position": booking.waitlist_position,
                        }),
                    )
                    .await;
            }
            _ => {}
        }
    }

    /// Staff need `capability`; non-staff must be the student or a
    /// linked guardian.
    async fn assert_may_manage(
        &self,
        ctx: &RequestContext,
        student: &Student,
        capability: Capability,
    ) -> AppResult<ActorType> {
        let actor = self.eligibility.resolve_actor(ctx, student).await?;
        if actor == ActorType::Staff
            && !self.capabilities.actor_has_capability(ctx.role, capability)
        {
            return Err(AppError::permission_denied(
                "Staff account lacks the required capability",
            ));
        }
        Ok(actor)
    }

    /// Self-service cancellation policy.
    async fn assert_self_cancellation_open(
        &self,
        ctx: &RequestContext,
        booking: &ActivityBooking,
    ) -> AppResult<()> {
        if !self.config.allow_self_cancellation {
            return Err(AppError::permission_denied(
                "Self-service cancellation is disabled",
            ));
        }
        if self.config.self_cancellation_until_first_session {
            if let Some(section_id) = booking.allocated_section_id {
                if let Some(first) = self.schedule.first_slot_for_section(section_id).await? {
                    if first.starts_at <= ctx.request_time {
                        return Err(AppError::permission_denied(
                            "The activity has already started; contact the school to cancel",
                        ));
                    }
                }
            }
        }
        Ok(())
    }
}

/// A key reused against a different offering or student is a conflict.
fn validate_replay(
    prior: ActivityBooking,
    request: &SubmitBookingRequest,
) -> AppResult<ActivityBooking> {
    if prior.offering_id != request.offering_id || prior.student_id != request.student_id {
        return Err(AppError::conflict(
            "Idempotency key was already used for a different booking",
        ));
    }
    info!(booking_id = %prior.id, "Idempotent replay");
    Ok(prior)
}

fn failed_item(index: usize, error: &AppError) -> BatchItemResult {
    BatchItemResult {
        index,
        booking_id: None,
        status: None,
        error: Some(format!("{}: {}", error.kind, error.message)),
    }
}
