//! Error types for web handlers.
//!
//! [`AppError`] bridges [`BookingError`] to HTTP responses:
//!
//! | Domain error                                   | Status |
//! |------------------------------------------------|--------|
//! | `ValidationFailed`                             | 400 (+ `fieldErrors`) |
//! | admin credentials missing or wrong             | 401 (+ `WWW-Authenticate`) |
//! | `TokenInvalidOrConsumed`, `NotFound`           | 404 |
//! | `IllegalTransition`, `PaymentNotVerified`      | 409 |
//! | `Conflict`                                     | 409 |
//! | `RateLimited`                                  | 429 (+ `Retry-After`) |
//! | `StoreUnavailable`                             | 503 |
//! | anything else                                  | 500 |

use axum::{
    Json,
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use booking_coordinator::BookingError;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

/// Application error type for web handlers.
#[derive(Debug)]
pub struct AppError {
    /// HTTP status code
    status: StatusCode,
    /// Error message (user-facing)
    message: String,
    /// Error code (for client error handling)
    code: &'static str,
    /// Per-field messages for validation failures
    field_errors: Option<BTreeMap<String, String>>,
    /// Seconds until a rate-limited caller may retry
    retry_after: Option<u64>,
    /// Internal error (for logging, not exposed to client)
    source: Option<anyhow::Error>,
}

impl AppError {
    /// Create a new application error.
    #[must_use]
    pub fn new(status: StatusCode, message: impl Into<String>, code: &'static str) -> Self {
        Self {
            status,
            message: message.into(),
            code,
            field_errors: None,
            retry_after: None,
            source: None,
        }
    }

    /// Create a new error with a source error.
    #[must_use]
    pub fn with_source(mut self, source: anyhow::Error) -> Self {
        self.source = Some(source);
        self
    }

    /// HTTP status this error renders as.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        self.status
    }

    /// Machine-readable error code.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        self.code
    }

    /// Create a 400 Bad Request error.
    #[must_use]
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message, "BAD_REQUEST")
    }

    /// Create a 401 error asking for admin Basic credentials.
    #[must_use]
    pub fn unauthorized() -> Self {
        Self::new(StatusCode::UNAUTHORIZED, "Authentication required", "UNAUTHORIZED")
    }

    /// Create a 404 Not Found error.
    #[must_use]
    pub fn not_found(resource: impl fmt::Display, id: impl fmt::Display) -> Self {
        Self::new(
            StatusCode::NOT_FOUND,
            format!("{resource} with id {id} not found"),
            "NOT_FOUND",
        )
    }

    /// Create a 500 Internal Server Error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            message,
            "INTERNAL_SERVER_ERROR",
        )
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn std::error::Error + 'static))
    }
}

impl From<BookingError> for AppError {
    fn from(err: BookingError) -> Self {
        match err {
            BookingError::ValidationFailed(errors) => {
                let mut app = Self::new(
                    StatusCode::BAD_REQUEST,
                    "Please correct the highlighted fields",
                    "VALIDATION_FAILED",
                );
                app.field_errors = Some(errors.into_inner());
                app
            }
            BookingError::RateLimited { retry_after, .. } => {
                let mut app = Self::new(
                    StatusCode::TOO_MANY_REQUESTS,
                    "Too many booking attempts. Please try again later.",
                    "RATE_LIMITED",
                );
                // Round up so a client never retries a moment too early.
                let secs = retry_after.as_secs() + u64::from(retry_after.subsec_nanos() > 0);
                app.retry_after = Some(secs.max(1));
                app
            }
            BookingError::TokenInvalidOrConsumed => Self::new(
                StatusCode::NOT_FOUND,
                "Upload link is invalid or has already been used",
                "TOKEN_INVALID",
            ),
            BookingError::NotFound { entity, id } => Self::not_found(entity, id),
            err @ (BookingError::IllegalTransition { .. }
            | BookingError::PaymentNotVerified { .. }) => {
                tracing::warn!(error = %err, "Lifecycle change refused");
                Self::new(StatusCode::CONFLICT, err.to_string(), "ILLEGAL_TRANSITION")
            }
            err @ BookingError::Conflict { .. } => {
                tracing::warn!(error = %err, "Concurrent update lost");
                Self::new(StatusCode::CONFLICT, err.to_string(), "CONFLICT")
            }
            err @ BookingError::StoreUnavailable(_) => Self::new(
                StatusCode::SERVICE_UNAVAILABLE,
                "Service temporarily unavailable. Please try again.",
                "SERVICE_UNAVAILABLE",
            )
            .with_source(err.into()),
            err @ (BookingError::InvalidConfig(_) | BookingError::Serialization(_)) => {
                Self::internal("An internal error occurred").with_source(err.into())
            }
        }
    }
}

/// Convert `anyhow::Error` to `AppError`.
impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        Self::internal("An internal error occurred").with_source(err)
    }
}

/// Error response body (JSON).
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ErrorResponse {
    /// Error code (for client error handling).
    code: &'static str,
    /// Human-readable error message.
    message: String,
    /// Field path → message, for validation failures.
    #[serde(skip_serializing_if = "Option::is_none")]
    field_errors: Option<BTreeMap<String, String>>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Log internal errors
        if self.status.is_server_error() {
            if let Some(source) = &self.source {
                tracing::error!(
                    status = %self.status,
                    code = %self.code,
                    message = %self.message,
                    error = %source,
                    "Internal server error"
                );
            } else {
                tracing::error!(
                    status = %self.status,
                    code = %self.code,
                    message = %self.message,
                    "Internal server error"
                );
            }
        }

        let body = ErrorResponse {
            code: self.code,
            message: self.message,
            field_errors: self.field_errors,
        };
        let mut response = (self.status, Json(body)).into_response();

        if let Some(secs) = self.retry_after {
            response
                .headers_mut()
                .insert(header::RETRY_AFTER, HeaderValue::from(secs));
        }
        if self.status == StatusCode::UNAUTHORIZED {
            response.headers_mut().insert(
                header::WWW_AUTHENTICATE,
                HeaderValue::from_static("Basic realm=\"admin\", charset=\"UTF-8\""),
            );
        }

        response
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)] // Test code
mod tests {
    use super::*;
    use booking_coordinator::validation::ValidationErrors;
    use std::time::Duration;

    #[test]
    fn test_error_display() {
        let err = AppError::bad_request("Invalid input");
        assert_eq!(err.to_string(), "[BAD_REQUEST] Invalid input");
    }

    #[test]
    fn test_status_mapping() {
        let cases = [
            (
                BookingError::ValidationFailed(ValidationErrors::single("email", "Invalid")),
                StatusCode::BAD_REQUEST,
            ),
            (BookingError::TokenInvalidOrConsumed, StatusCode::NOT_FOUND),
            (
                BookingError::IllegalTransition {
                    entity: "booking",
                    from: "pending".into(),
                    to: "completed".into(),
                },
                StatusCode::CONFLICT,
            ),
            (
                BookingError::PaymentNotVerified {
                    payment_status: "pending".into(),
                },
                StatusCode::CONFLICT,
            ),
            (
                BookingError::Conflict {
                    entity: "payment",
                    id: "3".into(),
                },
                StatusCode::CONFLICT,
            ),
            (
                BookingError::StoreUnavailable("down".into()),
                StatusCode::SERVICE_UNAVAILABLE,
            ),
            (
                BookingError::Serialization("bad".into()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (err, status) in cases {
            assert_eq!(AppError::from(err).status(), status);
        }
    }

    #[test]
    fn test_rate_limited_sets_retry_after() {
        let err = AppError::from(BookingError::RateLimited {
            reset_at: chrono::Utc::now(),
            retry_after: Duration::from_millis(12_300),
        });
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(response.headers()[header::RETRY_AFTER], "13");
    }

    #[test]
    fn test_unauthorized_challenges_for_basic() {
        let response = AppError::unauthorized().into_response();
        assert!(
            response.headers()[header::WWW_AUTHENTICATE]
                .to_str()
                .unwrap()
                .starts_with("Basic")
        );
    }
}
