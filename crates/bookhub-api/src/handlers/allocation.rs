//! Administrative allocation handlers.

use axum::Json;
use axum::extract::{Path, State};
use uuid::Uuid;

use bookhub_core::error::AppError;
use bookhub_service::allocation::AllocationReport;

use crate::dto::request::RunAllocationPayload;
use crate::dto::response::ApiResponse;
use crate::extractors::AuthUser;
use crate::state::AppState;

/// POST /api/offerings/:id/allocate
pub async fn run_allocation(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(offering_id): Path<Uuid>,
    payload: Option<Json<RunAllocationPayload>>,
) -> Result<Json<ApiResponse<AllocationReport>>, AppError> {
    let Json(payload) = payload.unwrap_or_default();
    let report = state
        .allocation_service
        .run_lottery(auth.context(), offering_id, payload.seed, payload.dry_run)
        .await?;
    Ok(Json(ApiResponse::ok(report)))
}
