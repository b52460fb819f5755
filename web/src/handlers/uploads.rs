//! Proof-of-payment upload.
//!
//! The request body is the file itself; its `Content-Type` header names the
//! file type. Only the metadata reaches the payment record. Storing the
//! bytes is left to whatever sits behind this service.

use crate::error::AppError;
use crate::extractors::ClientIp;
use crate::state::AppState;
use axum::{
    Json,
    body::Bytes,
    extract::{Path, State},
    http::{HeaderMap, header},
};
use booking_coordinator::state::PaymentRecord;

/// Request body limit for uploads.
///
/// Larger than the 5 MiB file limit so that oversized files get the field
/// error rather than a bare 413.
pub const UPLOAD_BODY_LIMIT: usize = 10 * 1024 * 1024;

/// Media type without parameters, lowercased.
fn media_type(headers: &HeaderMap) -> String {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(';').next())
        .map(|v| v.trim().to_ascii_lowercase())
        .unwrap_or_default()
}

/// Redeem an upload token with a proof file.
///
/// `POST /uploads/:token`
///
/// The token is spent by the first request that presents it, even if the
/// file is then refused; an administrator can issue a new one.
///
/// # Errors
///
/// 404 for an unknown, expired or spent token, 400 when the file type or
/// size breaks the grant, 409 when the payment is not awaiting a proof.
pub async fn upload_proof(
    State(state): State<AppState>,
    Path(token): Path<String>,
    client_ip: ClientIp,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<PaymentRecord>, AppError> {
    let content_type = media_type(&headers);
    let size_bytes = u64::try_from(body.len()).unwrap_or(u64::MAX);

    let payment = state
        .admin
        .record_proof_upload(&token, &content_type, size_bytes)
        .await
        .inspect_err(|e| {
            tracing::info!(
                client_ip = %client_ip,
                content_type = %content_type,
                size_bytes = size_bytes,
                error = %e,
                "Proof upload refused"
            );
        })?;

    Ok(Json(payment))
}
