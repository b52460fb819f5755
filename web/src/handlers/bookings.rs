//! Booking submission.

use crate::error::AppError;
use crate::extractors::{ClientIp, CorrelationId};
use crate::state::AppState;
use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use booking_coordinator::state::SessionId;
use booking_coordinator::submission::SubmissionReceipt;
use serde::Deserialize;
use serde_json::Value;

/// Optional query parameters for a submission.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitQuery {
    /// Wizard session to clear once the booking exists.
    pub session_id: Option<String>,
}

/// Submit a booking under `brand`.
///
/// `POST /:brand/bookings`
///
/// Answers 201 with the receipt (booking and invoice numbers, upload token,
/// bank transfer instructions). 400 for an unknown brand or invalid fields,
/// 429 once the caller's IP used up its window.
///
/// # Errors
///
/// See [`SubmissionPipeline::submit`](booking_coordinator::submission::SubmissionPipeline::submit).
pub async fn submit_booking(
    State(state): State<AppState>,
    Path(brand): Path<String>,
    client_ip: ClientIp,
    CorrelationId(correlation_id): CorrelationId,
    Query(query): Query<SubmitQuery>,
    Json(body): Json<Value>,
) -> Result<(StatusCode, Json<SubmissionReceipt>), AppError> {
    tracing::debug!(
        correlation_id = %correlation_id,
        client_ip = %client_ip,
        brand = %brand,
        "Booking submission received"
    );

    let session = query.session_id.as_deref().and_then(SessionId::parse);
    let receipt = state
        .pipeline
        .submit(&client_ip.to_string(), &brand, &body, session.as_ref())
        .await?;

    let booked_day = receipt.booking.scheduled_date.date_naive();
    if let Err(e) = state.availability.invalidate(&brand, booked_day).await {
        tracing::warn!(brand = %brand, date = %booked_day, error = %e, "Failed to invalidate cached availability");
    }

    Ok((StatusCode::CREATED, Json(receipt)))
}
