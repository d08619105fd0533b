//! Booking lifecycle handlers.

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use uuid::Uuid;
use validator::Validate;

use bookhub_core::error::AppError;
use bookhub_service::booking::{BatchSubmitReport, BookingView};

use crate::dto::request::{BatchSubmitPayload, CancelBookingPayload, SubmitBookingPayload};
use crate::dto::response::{ApiResponse, SubmitBookingResponse};
use crate::extractors::AuthUser;
use crate::state::AppState;

/// POST /api/bookings
pub async fn submit_booking(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(payload): Json<SubmitBookingPayload>,
) -> Result<(StatusCode, Json<ApiResponse<SubmitBookingResponse>>), AppError> {
    payload
        .validate()
        .map_err(|e| AppError::validation(e.to_string()))?;

    let outcome = state
        .booking_service
        .submit(auth.context(), payload.into())
        .await?;
    let booking = state
        .booking_service
        .view_booking(auth.context(), outcome.booking.id)
        .await?;

    let status = if outcome.replayed {
        StatusCode::OK
    } else {
        StatusCode::CREATED
    };
    Ok((
        status,
        Json(ApiResponse::ok(SubmitBookingResponse {
            replayed: outcome.replayed,
            booking,
        })),
    ))
}

/// POST /api/bookings/batch
pub async fn submit_batch(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(payload): Json<BatchSubmitPayload>,
) -> Result<Json<ApiResponse<BatchSubmitReport>>, AppError> {
    payload
        .validate()
        .map_err(|e| AppError::validation(e.to_string()))?;

    let requests = payload.items.into_iter().map(Into::into).collect();
    let report = state
        .booking_service
        .submit_batch(auth.context(), requests)
        .await?;
    Ok(Json(ApiResponse::ok(report)))
}

/// GET /api/bookings/:id
pub async fn get_booking(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<BookingView>>, AppError> {
    let view = state.booking_service.view_booking(auth.context(), id).await?;
    Ok(Json(ApiResponse::ok(view)))
}

/// POST /api/bookings/:id/confirm
pub async fn confirm_offer(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<BookingView>>, AppError> {
    state.booking_service.confirm_offer(auth.context(), id).await?;
    let view = state.booking_service.view_booking(auth.context(), id).await?;
    Ok(Json(ApiResponse::ok(view)))
}

/// POST /api/bookings/:id/cancel
pub async fn cancel_booking(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
    payload: Option<Json<CancelBookingPayload>>,
) -> Result<Json<ApiResponse<BookingView>>, AppError> {
    let reason = payload.and_then(|Json(p)| p.reason);
    state
        .booking_service
        .cancel_booking(auth.context(), id, reason)
        .await?;
    let view = state.booking_service.view_booking(auth.context(), id).await?;
    Ok(Json(ApiResponse::ok(view)))
}

/// GET /api/students/:id/bookings
pub async fn list_student_bookings(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(student_id): Path<Uuid>,
) -> Result<Json<ApiResponse<Vec<BookingView>>>, AppError> {
    let views = state
        .booking_service
        .list_for_student(auth.context(), student_id)
        .await?;
    Ok(Json(ApiResponse::ok(views)))
}
