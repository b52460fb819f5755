//! Wizard drafts.
//!
//! The wizard posts its whole accumulated state on every step; `PUT`
//! replaces the stored draft outright. Session IDs are only ever minted by
//! `POST`; `PUT` refuses IDs that do not name a live draft. A draft is only
//! visible under the brand it was started with.

use crate::error::AppError;
use crate::state::AppState;
use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use booking_coordinator::BookingError;
use booking_coordinator::session::BookingDraft;
use booking_coordinator::state::SessionId;
use booking_coordinator::validation::ValidationErrors;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Draft payload posted by the wizard.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DraftRequest {
    /// Last completed step.
    #[serde(default)]
    pub step: u8,
    /// Every field entered so far.
    #[serde(default)]
    pub fields: Map<String, Value>,
}

/// Stored draft plus the handle to fetch it again.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DraftResponse {
    /// Session handle
    pub session_id: SessionId,
    /// Stored draft
    pub draft: BookingDraft,
    /// Seconds until the draft expires
    pub expires_in_seconds: u64,
}

fn ensure_brand(state: &AppState, brand: &str) -> Result<(), AppError> {
    if state.pipeline.is_valid_brand(brand) {
        Ok(())
    } else {
        Err(BookingError::ValidationFailed(ValidationErrors::single("general", "Invalid brand")).into())
    }
}

fn session_id(raw: &str) -> Result<SessionId, AppError> {
    SessionId::parse(raw).ok_or_else(|| AppError::bad_request("Invalid session id"))
}

async fn existing_draft(
    state: &AppState,
    brand: &str,
    id: &SessionId,
) -> Result<Option<BookingDraft>, AppError> {
    Ok(state
        .sessions
        .load::<BookingDraft>(id)
        .await?
        .filter(|draft| draft.brand == brand))
}

async fn store(
    state: &AppState,
    id: SessionId,
    brand: String,
    request: DraftRequest,
) -> Result<DraftResponse, AppError> {
    let draft = BookingDraft {
        brand,
        step: request.step,
        fields: request.fields,
    };
    state.sessions.save(&id, &draft).await?;

    Ok(DraftResponse {
        session_id: id,
        draft,
        expires_in_seconds: state.sessions.ttl().as_secs(),
    })
}

/// Start a new draft.
///
/// `POST /:brand/drafts`
///
/// # Errors
///
/// 400 for an unknown brand, 503 when the store is unreachable.
pub async fn create_draft(
    State(state): State<AppState>,
    Path(brand): Path<String>,
    Json(request): Json<DraftRequest>,
) -> Result<(StatusCode, Json<DraftResponse>), AppError> {
    ensure_brand(&state, &brand)?;
    let response = store(&state, SessionId::generate(), brand, request).await?;
    Ok((StatusCode::CREATED, Json(response)))
}

/// Replace a live draft, resetting its lifetime.
///
/// `PUT /:brand/drafts/:session_id`
///
/// # Errors
///
/// 400 for an unknown brand or malformed session ID. 404 when no draft was
/// started under this ID and brand, or it expired. 503 when the store is
/// unreachable.
pub async fn save_draft(
    State(state): State<AppState>,
    Path((brand, raw_id)): Path<(String, String)>,
    Json(request): Json<DraftRequest>,
) -> Result<Json<DraftResponse>, AppError> {
    ensure_brand(&state, &brand)?;
    let id = session_id(&raw_id)?;
    if existing_draft(&state, &brand, &id).await?.is_none() {
        return Err(AppError::not_found("Draft", id));
    }
    Ok(Json(store(&state, id, brand, request).await?))
}

/// Fetch a draft.
///
/// `GET /:brand/drafts/:session_id`
///
/// # Errors
///
/// 404 when the draft expired, never existed or belongs to another brand.
/// 503 when the store is unreachable.
pub async fn load_draft(
    State(state): State<AppState>,
    Path((brand, raw_id)): Path<(String, String)>,
) -> Result<Json<BookingDraft>, AppError> {
    ensure_brand(&state, &brand)?;
    let id = session_id(&raw_id)?;

    match existing_draft(&state, &brand, &id).await? {
        Some(draft) => Ok(Json(draft)),
        None => Err(AppError::not_found("Draft", id)),
    }
}

/// Discard a draft. Discarding an unknown draft, or one started under
/// another brand, succeeds without touching anything.
///
/// `DELETE /:brand/drafts/:session_id`
///
/// # Errors
///
/// 400 for an unknown brand or malformed session ID, 503 when the store is
/// unreachable.
pub async fn clear_draft(
    State(state): State<AppState>,
    Path((brand, raw_id)): Path<(String, String)>,
) -> Result<StatusCode, AppError> {
    ensure_brand(&state, &brand)?;
    let id = session_id(&raw_id)?;
    if existing_draft(&state, &brand, &id).await?.is_some() {
        state.sessions.clear(&id).await?;
    }
    Ok(StatusCode::NO_CONTENT)
}
