//! Administrator routes. Every handler requires [`AdminUser`].

use crate::auth::AdminUser;
use crate::error::AppError;
use crate::state::AppState;
use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use booking_coordinator::lifecycle::{BookingStatus, Decision, VerificationDecision};
use booking_coordinator::state::{BookingId, BookingRecord, PaymentId, PaymentRecord};
use serde::{Deserialize, Serialize};

/// Requested booking status.
#[derive(Debug, Deserialize)]
pub struct StatusRequest {
    /// Target status (`confirmed`, `in_progress`, ...)
    pub status: BookingStatus,
}

/// Verdict on a payment proof.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationRequest {
    /// `approved` or `rejected`
    pub decision: Decision,
    /// Required when rejecting
    #[serde(default)]
    pub rejection_reason: Option<String>,
}

/// Fresh upload token for a booking.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadTokenResponse {
    /// Booking the token is bound to
    pub booking_id: BookingId,
    /// Single-use token
    pub upload_token: String,
}

/// Move a booking along its lifecycle.
///
/// `POST /admin/bookings/:id/status`
///
/// # Errors
///
/// 404 for an unknown booking, 409 for an illegal move or confirming an
/// unverified payment.
pub async fn update_booking_status(
    admin: AdminUser,
    State(state): State<AppState>,
    Path(id): Path<u64>,
    Json(request): Json<StatusRequest>,
) -> Result<Json<BookingRecord>, AppError> {
    tracing::info!(admin = %admin.username, booking_id = id, to = %request.status, "Booking status change requested");
    let booking = state
        .admin
        .transition_booking(BookingId(id), request.status)
        .await?;
    Ok(Json(booking))
}

/// Issue a new upload token, e.g. after a rejected proof.
///
/// `POST /admin/bookings/:id/upload-token`
///
/// # Errors
///
/// 404 for an unknown booking, 409 when the payment cannot take a proof.
pub async fn reissue_upload_token(
    admin: AdminUser,
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> Result<(StatusCode, Json<UploadTokenResponse>), AppError> {
    let booking_id = BookingId(id);
    let upload_token = state.admin.reissue_upload_token(booking_id).await?;
    tracing::info!(admin = %admin.username, booking_id = %booking_id, "Upload token reissued");

    Ok((
        StatusCode::CREATED,
        Json(UploadTokenResponse {
            booking_id,
            upload_token,
        }),
    ))
}

/// Record a verdict on the proof a payment is waiting on.
///
/// `POST /admin/payments/:id/verification`
///
/// # Errors
///
/// 400 for a rejection without a reason, 404 for an unknown payment, 409
/// unless the payment is awaiting review.
pub async fn decide_verification(
    admin: AdminUser,
    State(state): State<AppState>,
    Path(id): Path<u64>,
    Json(request): Json<VerificationRequest>,
) -> Result<Json<PaymentRecord>, AppError> {
    let decision = VerificationDecision {
        payment_id: PaymentId(id),
        decision: request.decision,
        rejection_reason: request.rejection_reason,
    };
    tracing::info!(admin = %admin.username, payment_id = id, decision = ?decision.decision, "Verification decision submitted");

    Ok(Json(state.admin.decide_verification(&decision).await?))
}

/// Refund a verified payment.
///
/// `POST /admin/payments/:id/refund`
///
/// # Errors
///
/// 404 for an unknown payment, 409 unless the payment is verified.
pub async fn refund_payment(
    admin: AdminUser,
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> Result<Json<PaymentRecord>, AppError> {
    tracing::info!(admin = %admin.username, payment_id = id, "Refund requested");
    Ok(Json(state.admin.refund_payment(PaymentId(id)).await?))
}

/// Clear a rate limit window, e.g. `booking:203.0.113.7`.
///
/// `POST /admin/rate-limits/:identifier/reset`
///
/// # Errors
///
/// 503 when the store is unreachable.
pub async fn reset_rate_limit(
    admin: AdminUser,
    State(state): State<AppState>,
    Path(identifier): Path<String>,
) -> Result<StatusCode, AppError> {
    state.limiter.reset(&identifier).await?;
    tracing::info!(admin = %admin.username, identifier = %identifier, "Rate limit reset");
    Ok(StatusCode::NO_CONTENT)
}
