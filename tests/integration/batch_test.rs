//! Integration tests for batch submission.

use http::StatusCode;
use serde_json::json;
use uuid::Uuid;

use crate::helpers::{self, OfferingSpec, data};

#[tokio::test]
async fn test_batch_reports_per_item_outcomes() {
    let Some(app) = helpers::test_app().await else { return };
    let offering = app.seed_offering(OfferingSpec::default()).await;
    let section = app.seed_section(offering, "Choir", Some(10), true).await;

    let (alpha, _) = app.seed_student(2014).await;
    let (beta, _) = app.seed_student(2013).await;
    let coordinator = Uuid::new_v4();

    // The middle item points at a section that does not exist.
    let payload = json!({
        "items": [
            { "offering_id": offering, "student_id": alpha, "choices": [section] },
            { "offering_id": offering, "student_id": beta, "choices": [Uuid::new_v4()] },
            { "offering_id": offering, "student_id": beta, "choices": [section] },
        ],
    });

    let response = app
        .request("POST", "/api/bookings/batch", Some(payload), Some((coordinator, "coordinator")))
        .await;

    assert_eq!(response.status, StatusCode::OK);
    let report = data(&response);
    assert_eq!(report["succeeded"], json!(2));
    assert_eq!(report["failed"], json!(1));

    let items = report["items"].as_array().expect("items array");
    assert_eq!(items.len(), 3);
    assert_eq!(items[0]["status"], "confirmed");
    assert_eq!(items[0]["error"], json!(null));
    assert!(items[1]["error"].as_str().is_some_and(|e| e.starts_with("VALIDATION")));
    assert_eq!(items[1]["booking_id"], json!(null));
    assert_eq!(items[2]["status"], "confirmed");

    // The failed item rolled back alone; both good items persisted.
    assert_eq!(app.reserved_count(section).await, 2);
}

#[tokio::test]
async fn test_batch_failure_does_not_poison_later_items() {
    let Some(app) = helpers::test_app().await else { return };
    let offering = app.seed_offering(OfferingSpec::default()).await;
    let choir = app.seed_section(offering, "Choir", Some(1), true).await;
    let band = app.seed_section(offering, "Band", Some(1), false).await;
    let coordinator = Uuid::new_v4();

    let (alpha, _) = app.seed_student(2014).await;
    let (beta, _) = app.seed_student(2014).await;
    let (gamma, _) = app.seed_student(2014).await;

    // Alpha takes the only Choir seat, beta waitlists behind it, gamma
    // takes Band. One batch, three distinct allocation outcomes.
    let payload = json!({
        "items": [
            { "offering_id": offering, "student_id": alpha, "choices": [choir] },
            { "offering_id": offering, "student_id": beta, "choices": [choir] },
            { "offering_id": offering, "student_id": gamma, "choices": [band] },
        ],
    });

    let response = app
        .request("POST", "/api/bookings/batch", Some(payload), Some((coordinator, "coordinator")))
        .await;

    assert_eq!(response.status, StatusCode::OK);
    let items = data(&response)["items"].as_array().expect("items array");
    assert_eq!(items[0]["status"], "confirmed");
    assert_eq!(items[1]["status"], "waitlisted");
    assert_eq!(items[2]["status"], "confirmed");
}

#[tokio::test]
async fn test_batch_replays_idempotent_items() {
    let Some(app) = helpers::test_app().await else { return };
    let offering = app.seed_offering(OfferingSpec::default()).await;
    let section = app.seed_section(offering, "Choir", Some(5), true).await;
    let (student, portal) = app.seed_student(2014).await;
    let key = format!("batch-{}", Uuid::new_v4());

    let first = app
        .request(
            "POST",
            "/api/bookings",
            Some(json!({
                "offering_id": offering,
                "student_id": student,
                "choices": [section],
                "idempotency_key": key,
            })),
            Some((portal, "student")),
        )
        .await;
    let first_id = data(&first)["booking"]["id"].clone();

    let response = app
        .request(
            "POST",
            "/api/bookings/batch",
            Some(json!({
                "items": [{
                    "offering_id": offering,
                    "student_id": student,
                    "choices": [section],
                    "idempotency_key": key,
                }],
            })),
            Some((portal, "student")),
        )
        .await;

    assert_eq!(response.status, StatusCode::OK);
    let items = data(&response)["items"].as_array().expect("items array");
    assert_eq!(items[0]["booking_id"], first_id);
}

#[tokio::test]
async fn test_batch_replays_a_key_repeated_within_one_batch() {
    let Some(app) = helpers::test_app().await else { return };
    let offering = app.seed_offering(OfferingSpec::default()).await;
    let section = app.seed_section(offering, "Choir", Some(5), true).await;
    let (student, portal) = app.seed_student(2014).await;
    let key = format!("retry-{}", Uuid::new_v4());

    // The same item appears twice in one batch, as a client retry inside
    // a single upload would produce.
    let item = json!({
        "offering_id": offering,
        "student_id": student,
        "choices": [section],
        "idempotency_key": key,
    });
    let response = app
        .request(
            "POST",
            "/api/bookings/batch",
            Some(json!({ "items": [item.clone(), item] })),
            Some((portal, "student")),
        )
        .await;

    assert_eq!(response.status, StatusCode::OK);
    let report = data(&response);
    assert_eq!(report["succeeded"], json!(2));
    assert_eq!(report["failed"], json!(0));

    let items = report["items"].as_array().expect("items array");
    assert_eq!(items[0]["booking_id"], items[1]["booking_id"]);

    let rows: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM activity_bookings WHERE idempotency_key = $1")
            .bind(&key)
            .fetch_one(&app.db_pool)
            .await
            .expect("count query failed");
    assert_eq!(rows, 1);
}

#[tokio::test]
async fn test_empty_batch_is_rejected() {
    let Some(app) = helpers::test_app().await else { return };

    let response = app
        .request(
            "POST",
            "/api/bookings/batch",
            Some(json!({ "items": [] })),
            Some((Uuid::new_v4(), "coordinator")),
        )
        .await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
}
