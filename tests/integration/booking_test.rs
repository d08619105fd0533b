//! Integration tests for booking submission.

use chrono::{Duration, Utc};
use http::StatusCode;
use serde_json::json;
use uuid::Uuid;

use crate::helpers::{self, OfferingSpec, data};

#[tokio::test]
async fn test_fcfs_confirms_first_choice() {
    let Some(app) = helpers::test_app().await else { return };
    let offering = app.seed_offering(OfferingSpec::default()).await;
    let section = app.seed_section(offering, "Choir", Some(2), true).await;
    let (student, portal) = app.seed_student(2014).await;

    let response = app
        .submit_booking(portal, "student", offering, student, &[section])
        .await;

    assert_eq!(response.status, StatusCode::CREATED);
    let booking = &data(&response)["booking"];
    assert_eq!(booking["status"], "confirmed");
    assert_eq!(booking["allocated_section_id"], json!(section));
    assert_eq!(data(&response)["replayed"], json!(false));
}

#[tokio::test]
async fn test_full_section_waitlists_third_at_position_one() {
    let Some(app) = helpers::test_app().await else { return };
    let offering = app.seed_offering(OfferingSpec::default()).await;
    let choir = app.seed_section(offering, "Choir", Some(2), true).await;

    for _ in 0..2 {
        let (student, portal) = app.seed_student(2014).await;
        let response = app
            .submit_booking(portal, "student", offering, student, &[choir])
            .await;
        assert_eq!(data(&response)["booking"]["status"], "confirmed");
    }
    assert_eq!(app.reserved_count(choir).await, 2);

    let (third, third_portal) = app.seed_student(2014).await;
    let response = app
        .submit_booking(third_portal, "student", offering, third, &[choir])
        .await;

    assert_eq!(response.status, StatusCode::CREATED);
    let booking = &data(&response)["booking"];
    assert_eq!(booking["status"], "waitlisted");
    assert_eq!(booking["allocated_section_id"], json!(choir));
    assert_eq!(booking["waitlist_position"], json!(1));
    // The waitlisted booking does not consume a seat.
    assert_eq!(app.reserved_count(choir).await, 2);
}

#[tokio::test]
async fn test_full_section_without_waitlist_leaves_submitted() {
    let Some(app) = helpers::test_app().await else { return };
    let offering = app
        .seed_offering(OfferingSpec {
            allow_waitlist: false,
            ..OfferingSpec::default()
        })
        .await;
    let choir = app.seed_section(offering, "Choir", Some(1), true).await;

    let (first, first_portal) = app.seed_student(2014).await;
    app.submit_booking(first_portal, "student", offering, first, &[choir])
        .await;

    let (second, second_portal) = app.seed_student(2014).await;
    let response = app
        .submit_booking(second_portal, "student", offering, second, &[choir])
        .await;

    assert_eq!(response.status, StatusCode::CREATED);
    let booking = &data(&response)["booking"];
    assert_eq!(booking["status"], "submitted");
    assert_eq!(booking["allocated_section_id"], json!(null));
    assert_eq!(booking["waitlist_position"], json!(null));
}

#[tokio::test]
async fn test_schedule_conflict_skips_to_next_choice() {
    let Some(app) = helpers::test_app().await else { return };
    let slot_time = Utc::now() + Duration::days(35);

    // The student already holds a confirmed seat meeting at slot_time.
    let held_offering = app.seed_offering(OfferingSpec::default()).await;
    let section_x = app.seed_section(held_offering, "X", Some(10), true).await;
    app.seed_slot(section_x, slot_time, 2).await;
    let (student, portal) = app.seed_student(2014).await;
    let held = app
        .submit_booking(portal, "student", held_offering, student, &[section_x])
        .await;
    assert_eq!(data(&held)["booking"]["status"], "confirmed");

    // Y meets at the same time as X; Z does not.
    let offering = app.seed_offering(OfferingSpec::default()).await;
    let section_y = app.seed_section(offering, "Y", Some(10), true).await;
    app.seed_slot(section_y, slot_time + Duration::hours(1), 2).await;
    let section_z = app.seed_section(offering, "Z", Some(10), true).await;
    app.seed_slot(section_z, slot_time + Duration::days(1), 2).await;

    let response = app
        .submit_booking(portal, "student", offering, student, &[section_y, section_z])
        .await;

    assert_eq!(response.status, StatusCode::CREATED);
    let booking = &data(&response)["booking"];
    assert_eq!(booking["status"], "confirmed");
    assert_eq!(booking["allocated_section_id"], json!(section_z));
}

#[tokio::test]
async fn test_idempotent_resubmission_returns_original() {
    let Some(app) = helpers::test_app().await else { return };
    let offering = app.seed_offering(OfferingSpec::default()).await;
    let section = app.seed_section(offering, "Choir", Some(5), true).await;
    let (student, portal) = app.seed_student(2014).await;
    let key = format!("retry-{}", Uuid::new_v4());

    let payload = json!({
        "offering_id": offering,
        "student_id": student,
        "choices": [section],
        "idempotency_key": key,
    });

    let first = app
        .request("POST", "/api/bookings", Some(payload.clone()), Some((portal, "student")))
        .await;
    assert_eq!(first.status, StatusCode::CREATED);
    let first_id = data(&first)["booking"]["id"].clone();

    let second = app
        .request("POST", "/api/bookings", Some(payload), Some((portal, "student")))
        .await;
    assert_eq!(second.status, StatusCode::OK);
    assert_eq!(data(&second)["replayed"], json!(true));
    assert_eq!(data(&second)["booking"]["id"], first_id);

    let rows: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM activity_bookings WHERE idempotency_key = $1",
    )
    .bind(&key)
    .fetch_one(&app.db_pool)
    .await
    .expect("count failed");
    assert_eq!(rows, 1);
}

#[tokio::test]
async fn test_duplicate_active_booking_is_a_conflict() {
    let Some(app) = helpers::test_app().await else { return };
    let offering = app.seed_offering(OfferingSpec::default()).await;
    let section = app.seed_section(offering, "Choir", Some(5), true).await;
    let (student, portal) = app.seed_student(2014).await;

    app.submit_booking(portal, "student", offering, student, &[section])
        .await;
    let response = app
        .submit_booking(portal, "student", offering, student, &[section])
        .await;

    assert_eq!(response.status, StatusCode::CONFLICT);
    assert_eq!(response.body["error"], "CONFLICT");
}

#[tokio::test]
async fn test_student_booking_toggle_is_enforced() {
    let Some(app) = helpers::test_app().await else { return };
    let offering = app
        .seed_offering(OfferingSpec {
            allow_student_booking: false,
            ..OfferingSpec::default()
        })
        .await;
    let section = app.seed_section(offering, "Choir", Some(5), true).await;
    let (student, portal) = app.seed_student(2014).await;

    let refused = app
        .submit_booking(portal, "student", offering, student, &[section])
        .await;
    assert_eq!(refused.status, StatusCode::FORBIDDEN);

    // A linked guardian may still book for the same student.
    let guardian = app.seed_guardian(student).await;
    let allowed = app
        .submit_booking(guardian, "guardian", offering, student, &[section])
        .await;
    assert_eq!(allowed.status, StatusCode::CREATED);
    assert_eq!(data(&allowed)["booking"]["status"], "confirmed");
}

#[tokio::test]
async fn test_unknown_section_choice_is_rejected() {
    let Some(app) = helpers::test_app().await else { return };
    let offering = app.seed_offering(OfferingSpec::default()).await;
    app.seed_section(offering, "Choir", Some(5), true).await;
    let (student, portal) = app.seed_student(2014).await;

    let response = app
        .submit_booking(portal, "student", offering, student, &[Uuid::new_v4()])
        .await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_missing_identity_headers_are_refused() {
    let Some(app) = helpers::test_app().await else { return };

    let response = app
        .request("POST", "/api/bookings", Some(json!({})), None)
        .await;

    assert_eq!(response.status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_unrelated_user_may_not_book_for_student() {
    let Some(app) = helpers::test_app().await else { return };
    let offering = app.seed_offering(OfferingSpec::default()).await;
    let section = app.seed_section(offering, "Choir", Some(5), true).await;
    let (student, _) = app.seed_student(2014).await;
    let stranger = Uuid::new_v4();

    let response = app
        .submit_booking(stranger, "guardian", offering, student, &[section])
        .await;

    assert_eq!(response.status, StatusCode::FORBIDDEN);
}
