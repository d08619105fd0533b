//! Integration tests for the seeded lottery pass.

use http::StatusCode;
use serde_json::{Value, json};
use uuid::Uuid;

use crate::helpers::{self, OfferingSpec, TestApp, TestResponse, data};

/// Seed a lottery offering with one section of the given capacity and
/// `students` submitted bookings. Returns (offering_id, section_id,
/// booking ids in submission order).
async fn seed_lottery(
    app: &TestApp,
    capacity: i32,
    students: usize,
    allow_waitlist: bool,
) -> (Uuid, Uuid, Vec<Uuid>) {
    let offering = app
        .seed_offering(OfferingSpec {
            mode: "lottery_preference",
            allow_waitlist,
            ..OfferingSpec::default()
        })
        .await;
    let section = app
        .seed_section(offering, "Robotics", Some(capacity), allow_waitlist)
        .await;

    let mut bookings = Vec::with_capacity(students);
    for _ in 0..students {
        let (student, portal) = app.seed_student(2013).await;
        let response = app
            .submit_booking(portal, "student", offering, student, &[section])
            .await;
        assert_eq!(response.status, StatusCode::CREATED);
        assert_eq!(data(&response)["booking"]["status"], "submitted");
        let id = data(&response)["booking"]["id"]
            .as_str()
            .and_then(|s| Uuid::parse_str(s).ok())
            .expect("booking id");
        bookings.push(id);
    }
    (offering, section, bookings)
}

async fn allocate(
    app: &TestApp,
    offering_id: Uuid,
    body: Value,
) -> TestResponse {
    app.request(
        "POST",
        &format!("/api/offerings/{offering_id}/allocate"),
        Some(body),
        Some((Uuid::new_v4(), "coordinator")),
    )
    .await
}

#[tokio::test]
async fn test_pass_fills_capacity_and_waitlists_the_rest() {
    let Some(app) = helpers::test_app().await else { return };
    let (offering, section, bookings) = seed_lottery(&app, 2, 4, true).await;

    let response = allocate(&app, offering, json!({ "seed": 42 })).await;

    assert_eq!(response.status, StatusCode::OK);
    let report = data(&response);
    assert_eq!(report["seed"], json!(42));
    assert_eq!(report["confirmed"], json!(2));
    assert_eq!(report["waitlisted"], json!(2));
    assert_eq!(report["rejected"], json!(0));

    // Waitlist positions are dense from 1.
    let mut positions: Vec<i64> = report["decisions"]
        .as_array()
        .expect("decisions array")
        .iter()
        .filter_map(|d| d["waitlist_position"].as_i64())
        .collect();
    positions.sort_unstable();
    assert_eq!(positions, vec![1, 2]);

    assert_eq!(app.reserved_count(section).await, 2);
    for id in &bookings {
        let row = app.booking_row(*id).await;
        assert!(matches!(
            row["status"].as_str(),
            Some("confirmed" | "waitlisted")
        ));
        // The decision trail carries the seed it was drawn with.
        assert_eq!(row["allocation_snapshot"]["seed"], json!(42));
    }
}

#[tokio::test]
async fn test_same_seed_reproduces_the_same_decisions() {
    let Some(app) = helpers::test_app().await else { return };
    let (offering, _, _) = seed_lottery(&app, 1, 3, true).await;

    let first = allocate(&app, offering, json!({ "seed": 7, "dry_run": true })).await;
    let second = allocate(&app, offering, json!({ "seed": 7, "dry_run": true })).await;

    assert_eq!(first.status, StatusCode::OK);
    assert_eq!(data(&first)["dry_run"], json!(true));
    assert_eq!(data(&first)["decisions"], data(&second)["decisions"]);
}

#[tokio::test]
async fn test_dry_run_persists_nothing() {
    let Some(app) = helpers::test_app().await else { return };
    let (offering, section, bookings) = seed_lottery(&app, 1, 3, true).await;

    let response = allocate(&app, offering, json!({ "dry_run": true })).await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(data(&response)["confirmed"], json!(1));
    assert_eq!(app.reserved_count(section).await, 0);
    for id in &bookings {
        assert_eq!(app.booking_row(*id).await["status"], "submitted");
    }
}

#[tokio::test]
async fn test_leftovers_are_rejected_when_waitlist_is_off() {
    let Some(app) = helpers::test_app().await else { return };
    let (offering, _, _) = seed_lottery(&app, 1, 3, false).await;

    let response = allocate(&app, offering, json!({ "seed": 11 })).await;

    assert_eq!(response.status, StatusCode::OK);
    let report = data(&response);
    assert_eq!(report["confirmed"], json!(1));
    assert_eq!(report["waitlisted"], json!(0));
    assert_eq!(report["rejected"], json!(2));
}

#[tokio::test]
async fn test_pass_refuses_non_lottery_offerings() {
    let Some(app) = helpers::test_app().await else { return };
    let offering = app.seed_offering(OfferingSpec::default()).await;

    let response = allocate(&app, offering, json!({})).await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.body["error"], "VALIDATION");
}

#[tokio::test]
async fn test_pass_requires_the_allocation_capability() {
    let Some(app) = helpers::test_app().await else { return };
    let (offering, _, _) = seed_lottery(&app, 1, 1, true).await;

    for role in ["student", "guardian", "teacher"] {
        let response = app
            .request(
                "POST",
                &format!("/api/offerings/{offering}/allocate"),
                Some(json!({})),
                Some((Uuid::new_v4(), role)),
            )
            .await;
        assert_eq!(response.status, StatusCode::FORBIDDEN, "role {role}");
    }
}

#[tokio::test]
async fn test_pass_with_no_pending_bookings_is_empty() {
    let Some(app) = helpers::test_app().await else { return };
    let offering = app
        .seed_offering(OfferingSpec {
            mode: "lottery_preference",
            ..OfferingSpec::default()
        })
        .await;
    app.seed_section(offering, "Robotics", Some(5), true).await;

    let response = allocate(&app, offering, json!({ "seed": 3 })).await;

    assert_eq!(response.status, StatusCode::OK);
    let report = data(&response);
    assert_eq!(report["confirmed"], json!(0));
    assert_eq!(report["decisions"], json!([]));
}
