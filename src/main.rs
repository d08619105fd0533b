//! BookHub server: school activity booking engine.
//!
//! Main entry point that wires all crates together and starts the server.

use std::sync::Arc;

use tracing_subscriber::{EnvFilter, fmt};

use bookhub_api::state::AppState;
use bookhub_core::config::AppConfig;
use bookhub_core::error::AppError;
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

#[tokio::main]
async fn main() {
    let env = std::env::var("BOOKHUB_ENV").unwrap_or_else(|_| "development".to_string());
    let config = match AppConfig::load(&env) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load configuration: {e}");
            std::process::exit(1);
        }
    };

    init_logging(&config);

    if let Err(e) = run(config).await {
        tracing::error!("Server error: {e}");
        std::process::exit(1);
    }
}

/// Initialize tracing/logging.
fn init_logging(config: &AppConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    match config.logging.format.as_str() {
        "json" => {
            fmt()
                .json()
                .with_env_filter(filter)
                .with_target(true)
                .init();
        }
        _ => {
            fmt().pretty().with_env_filter(filter).with_target(true).init();
        }
    }
}

/// Main server run function.
async fn run(config: AppConfig) -> Result<(), AppError> {
    tracing::info!("Starting BookHub v{}", env!("CARGO_PKG_VERSION"));

    let db_pool = bookhub_database::connect(&config.database).await?;

    tracing::info!("Running database migrations...");
    bookhub_database::migration::run_migrations(&db_pool).await?;
    tracing::info!("Database migrations complete");

    // Repositories
    let offerings = Arc::new(OfferingRepository::new(db_pool.clone()));
    let sections = Arc::new(SectionRepository::new(db_pool.clone()));
    let students = Arc::new(StudentRepository::new(db_pool.clone()));
    let bookings = Arc::new(BookingRepository::new(db_pool.clone()));
    let schedule = Arc::new(ScheduleRepository::new(db_pool.clone()));

    // Collaborators. Billing and messaging run as logging stand-ins until
    // the real gateways are wired in.
    let capabilities: Arc<dyn CapabilityResolver> = Arc::new(DefaultCapabilities);
    let dispatcher = SideEffectDispatcher::new(
        Arc::new(LoggingInvoiceIssuer),
        Arc::new(LoggingNotifier),
        Arc::clone(&bookings),
    );

    // Services
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

    let state = AppState {
        config: Arc::new(config.clone()),
        db_pool,
        booking_service,
        allocation_service,
    };
    let app = bookhub_api::build_router(state);

    let addr = config.server.bind_addr();
    tracing::info!("Listening on {addr}");
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| AppError::internal(format!("Failed to bind {addr}: {e}")))?;
    axum::serve(listener, app)
        .await
        .map_err(|e| AppError::internal(format!("Server failed: {e}")))?;

    Ok(())
}
