//! Waitlist promotion.
//!
//! When a confirmed seat frees up, the lowest-position waitlisted booking
//! of the section is promoted to a time-boxed offer. Promotion runs in its
//! own transaction so a failed promotion never unwinds the cancellation
//! that freed the seat.

use std::sync::Arc;

use chrono::{Duration, Utc};
use serde_json::json;
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use bookhub_core::config::booking::BookingConfig;
use bookhub_core::error::{AppError, ErrorKind};
use bookhub_core::result::AppResult;
use bookhub_core::traits::messaging::BookingEvent;
use bookhub_database::locks;
use bookhub_database::repositories::booking::BookingRepository;
use bookhub_database::repositories::section::SectionRepository;
use bookhub_entity::booking::ActivityBooking;
use bookhub_entity::offering::ActivityOffering;

use crate::dispatch::SideEffectDispatcher;

/// Promotes waitlisted bookings into expiring offers.
#[derive(Clone)]
pub struct WaitlistManager {
    pool: PgPool,
    bookings: Arc<BookingRepository>,
    sections: Arc<SectionRepository>,
    dispatcher: SideEffectDispatcher,
    config: BookingConfig,
}

impl WaitlistManager {
    /// Creates a new waitlist manager.
    pub fn new(
        pool: PgPool,
        bookings: Arc<BookingRepository>,
        sections: Arc<SectionRepository>,
        dispatcher: SideEffectDispatcher,
        config: BookingConfig,
    ) -> Self {
        Self {
            pool,
            bookings,
            sections,
            dispatcher,
            config,
        }
    }

    /// Offer the freed seat to the head of the section's waitlist.
    ///
    /// Returns the promoted booking, or `None` when the waitlist is empty.
    /// The offer expiry comes from the offering's `offer_hours`, falling
    /// back to the configured default.
    pub async fn promote_next(
        &self,
        offering: &ActivityOffering,
        section_id: Uuid,
    ) -> AppResult<Option<ActivityBooking>> {
        let mut tx = self.pool.begin().await.map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to begin transaction", e)
        })?;

        // The promoted offer reserves a seat, so promotion holds the same
        // shared offering lock as submissions and confirmations and stays
        // out of a running lottery pass.
        locks::lock_offering_shared(&mut *tx, offering.id).await?;
        self.sections.lock_row(&mut *tx, section_id).await?;
        let Some(next) = self
            .bookings
            .find_next_waitlisted_locked(&mut *tx, section_id)
            .await?
        else {
            tx.rollback().await.map_err(|e| {
                AppError::with_source(ErrorKind::Database, "Failed to end transaction", e)
            })?;
            return Ok(None);
        };

        let hours = offering
            .offer_hours
            .map(i64::from)
            .unwrap_or(self.config.default_offer_hours);
        let expires_at = Utc::now() + Duration::hours(hours);
        self.bookings
            .mark_offered(&mut *tx, next.id, expires_at)
            .await?;

        tx.commit().await.map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to commit promotion", e)
        })?;

        info!(
            booking_id = %next.id,
            section_id = %section_id,
            %expires_at,
            "Promoted waitlisted booking to offer"
        );

        let promoted = self.bookings.get(next.id).await?;
        self.dispatcher
            .notify(
                BookingEvent::Offered,
                &promoted,
                json!({
                    "offering": offering.name,
                    "section_id": section_id,
                    "offer_expires_at": expires_at,
                }),
            )
            .await;

        Ok(Some(promoted))
    }
}
