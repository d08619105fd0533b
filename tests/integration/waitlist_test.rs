//! Integration tests for waitlist promotion and offer confirmation.

use http::StatusCode;
use serde_json::json;
use uuid::Uuid;

use crate::helpers::{self, OfferingSpec, TestApp, data};

/// Seed one offering with a single-seat section, a confirmed holder and a
/// waitlisted follower. Returns (holder booking id, holder portal,
/// waitlisted booking id, waitlisted portal).
async fn seed_full_section(app: &TestApp) -> (Uuid, Uuid, Uuid, Uuid) {
    let offering = app.seed_offering(OfferingSpec::default()).await;
    let section = app.seed_section(offering, "Choir", Some(1), true).await;

    let (holder, holder_portal) = app.seed_student(2014).await;
    let held = app
        .submit_booking(holder_portal, "student", offering, holder, &[section])
        .await;
    assert_eq!(data(&held)["booking"]["status"], "confirmed");
    let held_id = parse_id(&data(&held)["booking"]["id"]);

    let (waiter, waiter_portal) = app.seed_student(2014).await;
    let waiting = app
        .submit_booking(waiter_portal, "student", offering, waiter, &[section])
        .await;
    assert_eq!(data(&waiting)["booking"]["status"], "waitlisted");
    let waiting_id = parse_id(&data(&waiting)["booking"]["id"]);

    (held_id, holder_portal, waiting_id, waiter_portal)
}

fn parse_id(value: &serde_json::Value) -> Uuid {
    value
        .as_str()
        .and_then(|s| Uuid::parse_str(s).ok())
        .expect("booking id")
}

#[tokio::test]
async fn test_cancellation_offers_seat_to_waitlist_head() {
    let Some(app) = helpers::test_app().await else { return };
    let (held_id, holder_portal, waiting_id, _) = seed_full_section(&app).await;

    let cancelled = app
        .request(
            "POST",
            &format!("/api/bookings/{held_id}/cancel"),
            Some(json!({ "reason": "moved schools" })),
            Some((holder_portal, "student")),
        )
        .await;
    assert_eq!(cancelled.status, StatusCode::OK);
    assert_eq!(data(&cancelled)["status"], "cancelled");

    let promoted = app.booking_row(waiting_id).await;
    assert_eq!(promoted["status"], "offered");
    assert_eq!(promoted["waitlist_state"], "offered");
    let expires = promoted["offer_expires_at"]
        .as_str()
        .expect("offer deadline set")
        .parse::<chrono::DateTime<chrono::Utc>>()
        .expect("valid timestamp");
    assert!(expires > chrono::Utc::now());
}

#[tokio::test]
async fn test_promoted_offer_can_be_confirmed() {
    let Some(app) = helpers::test_app().await else { return };
    let (held_id, holder_portal, waiting_id, waiter_portal) = seed_full_section(&app).await;

    app.request(
        "POST",
        &format!("/api/bookings/{held_id}/cancel"),
        None,
        Some((holder_portal, "student")),
    )
    .await;

    let confirmed = app
        .request(
            "POST",
            &format!("/api/bookings/{waiting_id}/confirm"),
            None,
            Some((waiter_portal, "student")),
        )
        .await;

    assert_eq!(confirmed.status, StatusCode::OK);
    assert_eq!(data(&confirmed)["status"], "confirmed");
    assert_eq!(data(&confirmed)["waitlist_position"], json!(null));
    assert_eq!(data(&confirmed)["offer_expires_at"], json!(null));
}

#[tokio::test]
async fn test_lapsed_offer_is_expired_on_confirmation_attempt() {
    let Some(app) = helpers::test_app().await else { return };
    let (_, _, waiting_id, waiter_portal) = seed_full_section(&app).await;

    // Put the waitlisted booking into an offer that lapsed an hour ago.
    sqlx::query(
        "UPDATE activity_bookings \
         SET status = 'offered', waitlist_state = 'offered', waitlist_position = NULL, \
             offer_expires_at = NOW() - interval '1 hour' \
         WHERE id = $1",
    )
    .bind(waiting_id)
    .execute(&app.db_pool)
    .await
    .expect("offer update failed");

    let response = app
        .request(
            "POST",
            &format!("/api/bookings/{waiting_id}/confirm"),
            None,
            Some((waiter_portal, "student")),
        )
        .await;

    assert_eq!(response.status, StatusCode::UNPROCESSABLE_ENTITY);
    // The expiry transition survives the failed confirmation.
    let row = app.booking_row(waiting_id).await;
    assert_eq!(row["status"], "expired");
    assert_eq!(row["offer_expires_at"], json!(null));
}

#[tokio::test]
async fn test_waitlisted_booking_confirms_into_a_freed_seat() {
    let Some(app) = helpers::test_app().await else { return };
    let offering = app
        .seed_offering(OfferingSpec {
            auto_promote_waitlist: false,
            ..OfferingSpec::default()
        })
        .await;
    let section = app.seed_section(offering, "Choir", Some(1), true).await;

    let (holder, holder_portal) = app.seed_student(2014).await;
    let held = app
        .submit_booking(holder_portal, "student", offering, holder, &[section])
        .await;
    let held_id = parse_id(&data(&held)["booking"]["id"]);

    let (waiter, waiter_portal) = app.seed_student(2014).await;
    let waiting = app
        .submit_booking(waiter_portal, "student", offering, waiter, &[section])
        .await;
    assert_eq!(data(&waiting)["booking"]["status"], "waitlisted");
    let waiting_id = parse_id(&data(&waiting)["booking"]["id"]);

    app.request(
        "POST",
        &format!("/api/bookings/{held_id}/cancel"),
        None,
        Some((holder_portal, "student")),
    )
    .await;

    // No auto-promotion happened, so the booking is still waitlisted and
    // the confirmation takes the freed seat directly.
    let confirmed = app
        .request(
            "POST",
            &format!("/api/bookings/{waiting_id}/confirm"),
            None,
            Some((waiter_portal, "student")),
        )
        .await;
    assert_eq!(confirmed.status, StatusCode::OK);
    assert_eq!(data(&confirmed)["status"], "confirmed");
    assert_eq!(app.reserved_count(section).await, 1);
}

#[tokio::test]
async fn test_waitlisted_confirmation_without_a_free_seat_is_refused() {
    let Some(app) = helpers::test_app().await else { return };
    let (_, _, waiting_id, waiter_portal) = seed_full_section(&app).await;

    let response = app
        .request(
            "POST",
            &format!("/api/bookings/{waiting_id}/confirm"),
            None,
            Some((waiter_portal, "student")),
        )
        .await;

    assert_eq!(response.status, StatusCode::CONFLICT);
    assert_eq!(response.body["error"], "CAPACITY");
    let row = app.booking_row(waiting_id).await;
    assert_eq!(row["status"], "waitlisted");
}

#[tokio::test]
async fn test_cancelling_an_open_offer_passes_the_seat_along() {
    let Some(app) = helpers::test_app().await else { return };
    let (held_id, holder_portal, first_waiting_id, first_waiter_portal) =
        seed_full_section(&app).await;

    let offering_row: (Uuid, Uuid) = sqlx::query_as(
        "SELECT offering_id, allocated_section_id FROM activity_bookings WHERE id = $1",
    )
    .bind(held_id)
    .fetch_one(&app.db_pool)
    .await
    .expect("booking lookup failed");
    let (offering, section) = offering_row;

    let (second_waiter, second_portal) = app.seed_student(2014).await;
    let second = app
        .submit_booking(second_portal, "student", offering, second_waiter, &[section])
        .await;
    let second_id = parse_id(&data(&second)["booking"]["id"]);
    assert_eq!(data(&second)["booking"]["status"], "waitlisted");

    app.request(
        "POST",
        &format!("/api/bookings/{held_id}/cancel"),
        None,
        Some((holder_portal, "student")),
    )
    .await;
    assert_eq!(app.booking_row(first_waiting_id).await["status"], "offered");

    // The open offer reserves the seat; declining it by cancellation frees
    // the seat for the next in line.
    let declined = app
        .request(
            "POST",
            &format!("/api/bookings/{first_waiting_id}/cancel"),
            None,
            Some((first_waiter_portal, "student")),
        )
        .await;
    assert_eq!(declined.status, StatusCode::OK);
    assert_eq!(app.booking_row(second_id).await["status"], "offered");
}

#[tokio::test]
async fn test_cancelling_twice_is_a_state_error() {
    let Some(app) = helpers::test_app().await else { return };
    let (held_id, holder_portal, _, _) = seed_full_section(&app).await;

    let first = app
        .request(
            "POST",
            &format!("/api/bookings/{held_id}/cancel"),
            None,
            Some((holder_portal, "student")),
        )
        .await;
    assert_eq!(first.status, StatusCode::OK);

    let second = app
        .request(
            "POST",
            &format!("/api/bookings/{held_id}/cancel"),
            None,
            Some((holder_portal, "student")),
        )
        .await;
    assert_eq!(second.status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(second.body["error"], "STATE");
}

#[tokio::test]
async fn test_no_promotion_when_auto_promote_is_off() {
    let Some(app) = helpers::test_app().await else { return };
    let offering = app
        .seed_offering(OfferingSpec {
            auto_promote_waitlist: false,
            ..OfferingSpec::default()
        })
        .await;
    let section = app.seed_section(offering, "Choir", Some(1), true).await;

    let (holder, holder_portal) = app.seed_student(2014).await;
    let held = app
        .submit_booking(holder_portal, "student", offering, holder, &[section])
        .await;
    let held_id = parse_id(&data(&held)["booking"]["id"]);

    let (waiter, waiter_portal) = app.seed_student(2014).await;
    let waiting = app
        .submit_booking(waiter_portal, "student", offering, waiter, &[section])
        .await;
    let waiting_id = parse_id(&data(&waiting)["booking"]["id"]);

    app.request(
        "POST",
        &format!("/api/bookings/{held_id}/cancel"),
        None,
        Some((holder_portal, "student")),
    )
    .await;

    let row = app.booking_row(waiting_id).await;
    assert_eq!(row["status"], "waitlisted");
}

#[tokio::test]
async fn test_teacher_cannot_cancel_bookings() {
    let Some(app) = helpers::test_app().await else { return };
    let (held_id, _, _, _) = seed_full_section(&app).await;

    let refused = app
        .request(
            "POST",
            &format!("/api/bookings/{held_id}/cancel"),
            None,
            Some((Uuid::new_v4(), "teacher")),
        )
        .await;
    assert_eq!(refused.status, StatusCode::FORBIDDEN);

    let allowed = app
        .request(
            "POST",
            &format!("/api/bookings/{held_id}/cancel"),
            None,
            Some((Uuid::new_v4(), "coordinator")),
        )
        .await;
    assert_eq!(allowed.status, StatusCode::OK);
    assert_eq!(data(&allowed)["status"], "cancelled");
}

#[tokio::test]
async fn test_confirming_a_confirmed_booking_is_a_state_error() {
    let Some(app) = helpers::test_app().await else { return };
    let (held_id, holder_portal, _, _) = seed_full_section(&app).await;

    let response = app
        .request(
            "POST",
            &format!("/api/bookings/{held_id}/confirm"),
            None,
            Some((holder_portal, "student")),
        )
        .await;

    assert_eq!(response.status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(response.body["error"], "STATE");
}
