//! Eligibility resolution: actor type, booking toggles, age limits, and
//! the booking window.

use std::sync::Arc;

use bookhub_core::error::AppError;
use bookhub_core::result::AppResult;
use bookhub_core::traits::capability::CapabilityResolver;
use bookhub_core::types::capability::Capability;
use bookhub_database::repositories::student::StudentRepository;
use bookhub_entity::booking::ActorType;
use bookhub_entity::offering::ActivityOffering;
use bookhub_entity::student::Student;

use crate::context::RequestContext;

/// Resolves who is booking and whether they are allowed to.
#[derive(Clone)]
pub struct EligibilityResolver {
    /// Student and guardianship reads.
    students: Arc<StudentRepository>,
    /// Injected permission policy.
    capabilities: Arc<dyn CapabilityResolver>,
}

impl EligibilityResolver {
    /// Creates a new eligibility resolver.
    pub fn new(students: Arc<StudentRepository>, capabilities: Arc<dyn CapabilityResolver>) -> Self {
        Self {
            students,
            capabilities,
        }
    }

    /// Resolve the acting user's relationship to the student.
    ///
    /// Staff roles always resolve to Staff. Otherwise the signed-in user
    /// must either be the student's own portal account or a linked
    /// guardian; anything else is a permission failure.
    pub async fn resolve_actor(
        &self,
        ctx: &RequestContext,
        student: &Student,
    ) -> AppResult<ActorType> {
        if ctx.is_staff() {
            return Ok(ActorType::Staff);
        }
        if student.portal_user_id == Some(ctx.user_id) {
            return Ok(ActorType::Student);
        }
        if self.students.is_guardian_of(ctx.user_id, student.id).await? {
            return Ok(ActorType::Guardian);
        }
        Err(AppError::permission_denied(format!(
            "User {} may not book for student {}",
            ctx.user_id, student.id
        )))
    }

    /// Enforce the offering's per-actor booking toggles.
    ///
    /// Staff holding the ManageBookings capability bypass the toggles.
    pub fn assert_actor_allowed(
        &self,
        ctx: &RequestContext,
        offering: &ActivityOffering,
        actor_type: ActorType,
    ) -> AppResult<()> {
        if actor_type == ActorType::Staff {
            if self
                .capabilities
                .actor_has_capability(ctx.role, Capability::ManageBookings)
            {
                return Ok(());
            }
            return Err(AppError::permission_denied(
                "Staff account lacks the booking management capability",
            ));
        }
        if !offering.actor_may_book(ctx.role) {
            return Err(AppError::permission_denied(format!(
                "Booking by {actor_type} accounts is disabled for this offering"
            )));
        }
        Ok(())
    }

    /// Enforce the offering's age limits at its start date.
    pub fn assert_age(&self, offering: &ActivityOffering, student: &Student) -> AppResult<()> {
        if offering.min_age.is_none() && offering.max_age.is_none() {
            return Ok(());
        }
        let age = student.age_on(offering.start_date).ok_or_else(|| {
            AppError::validation(format!(
                "Student {} has no date of birth on file; age-limited offering",
                student.id
            ))
        })?;
        if let Some(min) = offering.min_age {
            if age < min {
                return Err(AppError::validation(format!(
                    "Student is {age}, offering requires at least {min}"
                )));
            }
        }
        if let Some(max) = offering.max_age {
            if age > max {
                return Err(AppError::validation(format!(
                    "Student is {age}, offering allows at most {max}"
                )));
            }
        }
        Ok(())
    }

    /// Enforce that the offering is ready and its booking window is open.
    pub fn assert_window_open(
        &self,
        ctx: &RequestContext,
        offering: &ActivityOffering,
    ) -> AppResult<()> {
        if !offering.ready {
            return Err(AppError::state(format!(
                "Offering '{}' is not open for booking yet",
                offering.name
            )));
        }
        if !offering.is_bookable_at(ctx.request_time) {
            return Err(AppError::state(format!(
                "The booking window for '{}' is closed",
                offering.name
            )));
        }
        Ok(())
    }
}
