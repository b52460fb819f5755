//! Error types for booking coordination.
//!
//! Two layers:
//!
//! - [`StoreError`] is returned by every [`EphemeralStore`](crate::providers::EphemeralStore)
//!   call and describes infrastructure failure only.
//! - [`BookingError`] is what the mechanisms hand back to the boundary.

use crate::validation::ValidationErrors;
use chrono::{DateTime, Utc};
use thiserror::Error;

/// Result type alias for coordinator operations.
pub type Result<T> = std::result::Result<T, BookingError>;

/// Result type alias for ephemeral store operations.
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Infrastructure failure reported by an ephemeral store backend.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The call did not complete within the configured bound.
    #[error("Store operation timed out")]
    Timeout,

    /// The backend could not be reached or rejected the command.
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    /// A compare-and-swap loop ran out of retries.
    #[error("Store contention: compare-and-swap retries exhausted")]
    Contention,

    /// A stored value could not be encoded or decoded.
    #[error("Store serialization error: {0}")]
    Serialization(String),
}

/// Error taxonomy for the booking lifecycle.
///
/// Field-level and rate-limit errors are meant to be rendered to the user.
/// Illegal transitions and store failures are logged and surfaced as failed
/// operations; they are never coerced into a default state.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum BookingError {
    // ═══════════════════════════════════════════════════════════
    // User-facing
    // ═══════════════════════════════════════════════════════════

    /// Submitted data failed schema validation.
    #[error("Validation failed: {0}")]
    ValidationFailed(ValidationErrors),

    /// The caller exceeded its request budget for the current window.
    #[error("Too many requests, retry after {retry_after:?}")]
    RateLimited {
        /// When the current window closes.
        reset_at: DateTime<Utc>,
        /// Duration to wait before retrying.
        retry_after: std::time::Duration,
    },

    /// Upload token unknown, expired or already used.
    ///
    /// The three cases are deliberately indistinguishable.
    #[error("Upload token is invalid or has already been used")]
    TokenInvalidOrConsumed,

    // ═══════════════════════════════════════════════════════════
    // Lifecycle
    // ═══════════════════════════════════════════════════════════

    /// Requested status is not reachable from the current one.
    #[error("Illegal {entity} transition from {from} to {to}")]
    IllegalTransition {
        /// Which machine rejected the request (`booking` or `payment`).
        entity: &'static str,
        /// Current status.
        from: String,
        /// Requested status.
        to: String,
    },

    /// A booking cannot be confirmed until its payment is verified.
    #[error("Booking cannot be confirmed while payment is {payment_status}")]
    PaymentNotVerified {
        /// Current status of the active payment (`none` when absent).
        payment_status: String,
    },

    /// The stored record changed between load and save.
    #[error("{entity} {id} was modified concurrently")]
    Conflict {
        /// Entity kind.
        entity: &'static str,
        /// Identifier of the record.
        id: String,
    },

    /// Referenced entity does not exist in durable storage.
    #[error("{entity} {id} not found")]
    NotFound {
        /// Entity kind.
        entity: &'static str,
        /// Identifier that was looked up.
        id: String,
    },

    // ═══════════════════════════════════════════════════════════
    // System
    // ═══════════════════════════════════════════════════════════

    /// The ephemeral store (or durable repository) could not serve the call.
    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    /// Configuration rejected at construction time.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Payload could not be serialized or deserialized.
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl BookingError {
    /// Returns `true` if this error should be rendered to the end user.
    ///
    /// # Examples
    ///
    /// ```
    /// # use booking_coordinator::BookingError;
    /// assert!(BookingError::TokenInvalidOrConsumed.is_user_error());
    /// assert!(!BookingError::StoreUnavailable("down".into()).is_user_error());
    /// ```
    #[must_use]
    pub const fn is_user_error(&self) -> bool {
        matches!(
            self,
            Self::ValidationFailed(_) | Self::RateLimited { .. } | Self::TokenInvalidOrConsumed
        )
    }

    /// Returns `true` if retrying later may succeed without changing input.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::RateLimited { .. } | Self::StoreUnavailable(_) | Self::Conflict { .. }
        )
    }
}

impl From<StoreError> for BookingError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Serialization(msg) => Self::Serialization(msg),
            other => Self::StoreUnavailable(other.to_string()),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)] // Test code
mod tests {
    use super::*;

    #[test]
    fn test_store_error_maps_to_unavailable() {
        let err: BookingError = StoreError::Timeout.into();
        assert_eq!(
            err,
            BookingError::StoreUnavailable("Store operation timed out".to_string())
        );
        assert!(err.is_retryable());
    }

    #[test]
    fn test_store_serialization_stays_serialization() {
        let err: BookingError = StoreError::Serialization("bad json".into()).into();
        assert!(matches!(err, BookingError::Serialization(_)));
    }

    #[test]
    fn test_conflict_is_retryable() {
        let err = BookingError::Conflict {
            entity: "payment",
            id: "7".into(),
        };
        assert_eq!(err.to_string(), "payment 7 was modified concurrently");
        assert!(err.is_retryable());
        assert!(!err.is_user_error());
    }

    #[test]
    fn test_illegal_transition_display() {
        let err = BookingError::IllegalTransition {
            entity: "booking",
            from: "pending".into(),
            to: "completed".into(),
        };
        assert_eq!(
            err.to_string(),
            "Illegal booking transition from pending to completed"
        );
        assert!(!err.is_user_error());
    }
}
