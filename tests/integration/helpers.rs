//! Shared test helpers for integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use chrono::{DateTime, Duration, NaiveDate, Utc};
use http::{Request, StatusCode};
use serde_json::Value;
use sqlx::PgPool;
use tower::ServiceExt;
use uuid::Uuid;

use bookhub_core::config::app::ServerConfig;
use bookhub_core::config::booking::BookingConfig;
use bookhub_core::config::logging::LoggingConfig;
use bookhub_core::config::{AppConfig, DatabaseConfig};
use bookhub_core::traits::capability::{CapabilityResolver, DefaultCapabilities};
use bookhub_database::repositories::booking::BookingRepository;
use bookhub_database::repositories::offering::OfferingRepository;
use bookhub_database::repositories::schedule::ScheduleRepository;
use bookhub_database::repositories::section::SectionRepository;
use bookhub_database::repositories::student::StudentRepository;
use bookhub_service::allocation::{AllocationService, FcfsAllocator};
use bookhub_service::booking::BookingService;
use bookhub_service::conflict::ConflictDetector;
use bookhub_service::dispatch::{LoggingInvoiceIssuer, LoggingNotifier, SideEffectDispatcher};
use bookhub_service::eligibility::EligibilityResolver;
use bookhub_service::waitlist::WaitlistManager;

/// A response captured from the test router.
pub struct TestResponse {
    pub status: StatusCode,
    pub body: Value,
}

/// Test application context.
pub struct TestApp {
    /// The Axum router for making test requests.
    pub router: Router,
    /// Database pool for direct queries and seeding.
    pub db_pool: PgPool,
}

/// Build the test application, or `None` when no test database is
/// configured (the test should return early in that case).
pub async fn test_app() -> Option<TestApp> {
    let Ok(url) = std::env::var("BOOKHUB_TEST_DATABASE_URL") else {
        eprintln!("BOOKHUB_TEST_DATABASE_URL not set; skipping integration test");
        return None;
    };

    let config = AppConfig {
        server: ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
        },
        database: DatabaseConfig {
            url,
            max_connections: 5,
            min_connections: 1,
            connect_timeout_seconds: 5,
            idle_timeout_seconds: 60,
            lock_timeout_ms: 5_000,
        },
        booking: BookingConfig::default(),
        logging: LoggingConfig::default(),
    };

    let db_pool = bookhub_database::connect(&config.database)
        .await
        .expect("Failed to connect to test database");
    bookhub_database::migration::run_migrations(&db_pool)
        .await
        .expect("Failed to run migrations");

    let offerings = Arc::new(OfferingRepository::new(db_pool.clone()));
    let sections = Arc::new(SectionRepository::new(db_pool.clone()));
    let students = Arc::new(StudentRepository::new(db_pool.clone()));
    let bookings = Arc::new(BookingRepository::new(db_pool.clone()));
    let schedule = Arc::new(ScheduleRepository::new(db_pool.clone()));

    let capabilities: Arc<dyn CapabilityResolver> = Arc::new(DefaultCapabilities);
    let dispatcher = SideEffectDispatcher::new(
        Arc::new(LoggingInvoiceIssuer),
        Arc::new(LoggingNotifier),
        Arc::clone(&bookings),
    );
    let eligibility = EligibilityResolver::new(Arc::clone(&students), Arc::clone(&capabilities));
    let conflicts = ConflictDetector::new(Arc::clone(&schedule));
    let fcfs = FcfsAllocator::new(
        Arc::clone(&bookings),
        Arc::clone(&sections),
        conflicts.clone(),
    );
    let waitlist = WaitlistManager::new(
        db_pool.clone(),
        Arc::clone(&bookings),
        Arc::clone(&sections),
        dispatcher.clone(),
        config.booking.clone(),
    );
    let booking_service = Arc::new(BookingService::new(
        db_pool.clone(),
        Arc::clone(&offerings),
        Arc::clone(&sections),
        Arc::clone(&students),
        Arc::clone(&bookings),
        Arc::clone(&schedule),
        eligibility,
        conflicts,
        fcfs,
        Arc::clone(&capabilities),
        dispatcher.clone(),
        waitlist,
        config.booking.clone(),
    ));
    let allocation_service = Arc::new(AllocationService::new(
        db_pool.clone(),
        offerings,
        sections,
        schedule,
        bookings,
        capabilities,
        dispatcher,
    ));

    let state = bookhub_api::AppState {
        config: Arc::new(config),
        db_pool: db_pool.clone(),
        booking_service,
        allocation_service,
    };

    Some(TestApp {
        router: bookhub_api::build_router(state),
        db_pool,
    })
}

/// Options for a seeded offering; defaults describe an open FCFS offering.
pub struct OfferingSpec {
    pub mode: &'static str,
    pub capacity: Option<i32>,
    pub allow_waitlist: bool,
    pub auto_promote_waitlist: bool,
    pub allow_student_booking: bool,
    pub payment_required: bool,
    pub payment_amount: Option<&'static str>,
}

impl Default for OfferingSpec {
    fn default() -> Self {
        Self {
            mode: "first_come_first_serve",
            capacity: None,
            allow_waitlist: true,
            auto_promote_waitlist: true,
            allow_student_booking: true,
            payment_required: false,
            payment_amount: None,
        }
    }
}

impl TestApp {
    /// Send one JSON request with the trusted gateway identity headers.
    pub async fn request(
        &self,
        method: &str,
        path: &str,
        body: Option<Value>,
        user: Option<(Uuid, &str)>,
    ) -> TestResponse {
        let mut builder = Request::builder().method(method).uri(path);
        if let Some((user_id, role)) = user {
            builder = builder
                .header("x-portal-user", user_id.to_string())
                .header("x-portal-role", role);
        }
        let request = match body {
            Some(json) => builder
                .header("content-type", "application/json")
                .body(Body::from(json.to_string())),
            None => builder.body(Body::empty()),
        }
        .expect("request build failed");

        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("router call failed");
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body read failed");
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).expect("non-JSON response body")
        };
        TestResponse { status, body }
    }

    /// Insert an offering with an open booking window.
    pub async fn seed_offering(&self, spec: OfferingSpec) -> Uuid {
        let now = Utc::now();
        let start_date = (now + Duration::days(30)).date_naive();
        let end_date = start_date + Duration::days(60);
        sqlx::query_scalar(
            "INSERT INTO activity_offerings \
             (name, capacity, allocation_mode, booking_open_at, booking_close_at, ready, \
              start_date, end_date, allow_waitlist, auto_promote_waitlist, \
              allow_student_booking, payment_required, payment_amount) \
             VALUES ($1, $2, $3::allocation_mode, $4, $5, TRUE, $6, $7, $8, $9, $10, $11, \
                     $12::text::numeric) \
             RETURNING id",
        )
        .bind(format!("Offering {}", Uuid::new_v4()))
        .bind(spec.capacity)
        .bind(spec.mode)
        .bind(now - Duration::hours(1))
        .bind(now + Duration::days(7))
        .bind(start_date)
        .bind(end_date)
        .bind(spec.allow_waitlist)
        .bind(spec.auto_promote_waitlist)
        .bind(spec.allow_student_booking)
        .bind(spec.payment_required)
        .bind(spec.payment_amount)
        .fetch_one(&self.db_pool)
        .await
        .expect("offering insert failed")
    }

    /// Insert a section of an offering.
    pub async fn seed_section(
        &self,
        offering_id: Uuid,
        label: &str,
        capacity_override: Option<i32>,
        allow_waitlist: bool,
    ) -> Uuid {
        sqlx::query_scalar(
            "INSERT INTO activity_sections (offering_id, label, capacity_override, allow_waitlist) \
             VALUES ($1, $2, $3, $4) RETURNING id",
        )
        .bind(offering_id)
        .bind(label)
        .bind(capacity_override)
        .bind(allow_waitlist)
        .fetch_one(&self.db_pool)
        .await
        .expect("section insert failed")
    }

    /// Insert one concrete slot for a section.
    pub async fn seed_slot(&self, section_id: Uuid, starts_at: DateTime<Utc>, hours: i64) {
        sqlx::query("INSERT INTO section_slots (section_id, starts_at, ends_at) VALUES ($1, $2, $3)")
            .bind(section_id)
            .bind(starts_at)
            .bind(starts_at + Duration::hours(hours))
            .execute(&self.db_pool)
            .await
            .expect("slot insert failed");
    }

    /// Insert a student with their own portal account. Returns
    /// (student_id, portal_user_id).
    pub async fn seed_student(&self, birth_year: i32) -> (Uuid, Uuid) {
        let portal_user_id = Uuid::new_v4();
        let dob = NaiveDate::from_ymd_opt(birth_year, 5, 14).expect("valid date");
        let student_id: Uuid = sqlx::query_scalar(
            "INSERT INTO students (portal_user_id, full_name, date_of_birth) \
             VALUES ($1, $2, $3) RETURNING id",
        )
        .bind(portal_user_id)
        .bind(format!("Student {portal_user_id}"))
        .bind(dob)
        .fetch_one(&self.db_pool)
        .await
        .expect("student insert failed");
        (student_id, portal_user_id)
    }

    /// Link a guardian portal account to a student.
    pub async fn seed_guardian(&self, student_id: Uuid) -> Uuid {
        let guardian_user_id = Uuid::new_v4();
        sqlx::query("INSERT INTO guardian_links (guardian_user_id, student_id) VALUES ($1, $2)")
            .bind(guardian_user_id)
            .bind(student_id)
            .execute(&self.db_pool)
            .await
            .expect("guardian link insert failed");
        guardian_user_id
    }

    /// Submit a booking through the API as the student's own account.
    pub async fn submit_booking(
        &self,
        portal_user: Uuid,
        role: &str,
        offering_id: Uuid,
        student_id: Uuid,
        choices: &[Uuid],
    ) -> TestResponse {
        self.request(
            "POST",
            "/api/bookings",
            Some(serde_json::json!({
                "offering_id": offering_id,
                "student_id": student_id,
                "choices": choices,
            })),
            Some((portal_user, role)),
        )
        .await
    }

    /// Direct row count of reserving bookings in a section.
    pub async fn reserved_count(&self, section_id: Uuid) -> i64 {
        sqlx::query_scalar(
            "SELECT COUNT(*) FROM activity_bookings \
             WHERE allocated_section_id = $1 AND status IN ('offered', 'confirmed')",
        )
        .bind(section_id)
        .fetch_one(&self.db_pool)
        .await
        .expect("count query failed")
    }

    /// Fetch a booking field as JSON for assertions.
    pub async fn booking_row(&self, booking_id: Uuid) -> Value {
        let row: (Value,) = sqlx::query_as(
            "SELECT to_jsonb(b) FROM activity_bookings b WHERE id = $1",
        )
        .bind(booking_id)
        .fetch_one(&self.db_pool)
        .await
        .expect("booking fetch failed");
        row.0
    }
}

/// Extract `data` from a success envelope.
pub fn data(response: &TestResponse) -> &Value {
    &response.body["data"]
}
