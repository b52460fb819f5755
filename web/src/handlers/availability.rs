//! Bookable time slots.
//!
//! Slots come from the catalog outside this service; an administrator
//! publishes them per brand and day and they live in the ephemeral store
//! for the cache TTL. A submission drops the day it booked so the next
//! read goes back to the catalog.

use crate::auth::AdminUser;
use crate::error::AppError;
use crate::state::AppState;
use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use booking_coordinator::BookingError;
use booking_coordinator::validation::ValidationErrors;
use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

/// Open slots for one brand and day.
#[derive(Debug, Serialize)]
pub struct AvailabilityResponse {
    /// Brand slug
    pub brand: String,
    /// Calendar day
    pub date: NaiveDate,
    /// Start times, `HH:MM`
    pub slots: Vec<String>,
}

/// Slots to publish.
#[derive(Debug, Deserialize)]
pub struct PublishSlotsRequest {
    /// Start times, `HH:MM`
    pub slots: Vec<String>,
}

fn parse_target(state: &AppState, brand: &str, raw_date: &str) -> Result<NaiveDate, AppError> {
    let mut errors = ValidationErrors::new();
    if !state.pipeline.is_valid_brand(brand) {
        errors.insert("general", "Invalid brand");
    }
    let date = NaiveDate::parse_from_str(raw_date, "%Y-%m-%d").ok();
    if date.is_none() {
        errors.insert("date", "Invalid date");
    }
    match date {
        Some(date) if errors.is_empty() => Ok(date),
        _ => Err(BookingError::ValidationFailed(errors).into()),
    }
}

/// Cached slots for a day.
///
/// `GET /:brand/availability/:date`
///
/// # Errors
///
/// 400 for an unknown brand or malformed date, 404 when nothing is cached
/// for the day, 503 when the store is unreachable.
pub async fn get_availability(
    State(state): State<AppState>,
    Path((brand, raw_date)): Path<(String, String)>,
) -> Result<Json<AvailabilityResponse>, AppError> {
    let date = parse_target(&state, &brand, &raw_date)?;

    match state.availability.get(&brand, date).await? {
        Some(slots) => Ok(Json(AvailabilityResponse { brand, date, slots })),
        None => Err(AppError::not_found("Availability", format!("{brand}/{date}"))),
    }
}

/// Publish the open slots for a day, replacing any cached set.
///
/// `PUT /admin/availability/:brand/:date`
///
/// # Errors
///
/// 400 for an unknown brand, malformed date or a slot that is not `HH:MM`.
/// 503 when the store is unreachable.
pub async fn publish_availability(
    admin: AdminUser,
    State(state): State<AppState>,
    Path((brand, raw_date)): Path<(String, String)>,
    Json(request): Json<PublishSlotsRequest>,
) -> Result<StatusCode, AppError> {
    let date = parse_target(&state, &brand, &raw_date)?;

    let mut errors = ValidationErrors::new();
    for (index, slot) in request.slots.iter().enumerate() {
        if NaiveTime::parse_from_str(slot, "%H:%M").is_err() {
            errors.insert(&format!("slots.{index}"), "Expected HH:MM");
        }
    }
    if !errors.is_empty() {
        return Err(BookingError::ValidationFailed(errors).into());
    }

    state.availability.put(&brand, date, &request.slots).await?;
    tracing::info!(
        admin = %admin.username,
        brand = %brand,
        date = %date,
        slots = request.slots.len(),
        "Availability published"
    );
    Ok(StatusCode::NO_CONTENT)
}
