//! Router configuration.

use crate::handlers::{admin, availability, bookings, drafts, health, uploads};
use crate::middleware::correlation_id_layer;
use crate::state::AppState;
use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{get, post, put},
};
use tower_http::trace::TraceLayer;

/// Build the complete router.
///
/// - `GET  /health`
/// - `POST /:brand/bookings`
/// - `POST /:brand/drafts`, `PUT|GET|DELETE /:brand/drafts/:session_id`
/// - `GET  /:brand/availability/:date`
/// - `POST /uploads/:token`
/// - `POST /admin/...`, `PUT /admin/availability/:brand/:date` (Basic auth)
pub fn build_router(state: AppState) -> Router {
    let admin_routes = Router::new()
        .route("/bookings/:id/status", post(admin::update_booking_status))
        .route("/bookings/:id/upload-token", post(admin::reissue_upload_token))
        .route("/payments/:id/verification", post(admin::decide_verification))
        .route("/payments/:id/refund", post(admin::refund_payment))
        .route("/rate-limits/:identifier/reset", post(admin::reset_rate_limit))
        .route(
            "/availability/:brand/:date",
            put(availability::publish_availability),
        );

    Router::new()
        .route("/health", get(health::health_check))
        .route("/:brand/bookings", post(bookings::submit_booking))
        .route("/:brand/drafts", post(drafts::create_draft))
        .route("/:brand/availability/:date", get(availability::get_availability))
        .route(
            "/:brand/drafts/:session_id",
            put(drafts::save_draft)
                .get(drafts::load_draft)
                .delete(drafts::clear_draft),
        )
        .route(
            "/uploads/:token",
            post(uploads::upload_proof).layer(DefaultBodyLimit::max(uploads::UPLOAD_BODY_LIMIT)),
        )
        .nest("/admin", admin_routes)
        .layer(correlation_id_layer())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
