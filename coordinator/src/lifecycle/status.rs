//! Status vocabularies for bookings, payments and verification outcomes.
//!
//! Serialized as snake_case strings, the same values durable storage keeps in
//! its `status` columns.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Error returned when parsing an unknown status string.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind} status: {value}")]
pub struct UnknownStatus {
    /// Which vocabulary was being parsed.
    pub kind: &'static str,
    /// Offending input.
    pub value: String,
}

/// Booking lifecycle status.
///
/// ```text
/// pending → confirmed → in_progress → completed
///    ↓          ↓            ↓
///    └──────────┴────────────┴──→ cancelled
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BookingStatus {
    /// Submitted, awaiting payment verification.
    Pending,
    /// Payment verified, engagement scheduled.
    Confirmed,
    /// Service is being delivered.
    InProgress,
    /// Service delivered. Terminal.
    Completed,
    /// Abandoned before completion. Terminal.
    Cancelled,
}

impl BookingStatus {
    /// Every booking status, in lifecycle order.
    pub const ALL: [Self; 5] = [
        Self::Pending,
        Self::Confirmed,
        Self::InProgress,
        Self::Completed,
        Self::Cancelled,
    ];

    /// Statuses directly reachable from `self`.
    #[must_use]
    pub const fn successors(self) -> &'static [Self] {
        match self {
            Self::Pending => &[Self::Confirmed, Self::Cancelled],
            Self::Confirmed => &[Self::InProgress, Self::Cancelled],
            Self::InProgress => &[Self::Completed, Self::Cancelled],
            Self::Completed | Self::Cancelled => &[],
        }
    }

    /// Whether `target` is directly reachable from `self`.
    #[must_use]
    pub fn can_transition_to(self, target: Self) -> bool {
        self.successors().contains(&target)
    }

    /// Whether no further transition is possible.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled)
    }

    /// Storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Confirmed => "confirmed",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
        }
    }
}

/// Payment status.
///
/// ```text
/// pending → awaiting_review → verified → refunded
///                ↑    ↓
///                rejected
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    /// No proof uploaded yet.
    Pending,
    /// Proof uploaded, waiting for an administrator decision.
    AwaitingReview,
    /// Administrator approved the proof.
    Verified,
    /// Administrator rejected the proof; a new upload is allowed.
    Rejected,
    /// Verified payment reversed by an administrator. Terminal.
    Refunded,
}

impl PaymentStatus {
    /// Every payment status.
    pub const ALL: [Self; 5] = [
        Self::Pending,
        Self::AwaitingReview,
        Self::Verified,
        Self::Rejected,
        Self::Refunded,
    ];

    /// Statuses directly reachable from `self`.
    #[must_use]
    pub const fn successors(self) -> &'static [Self] {
        match self {
            Self::Pending | Self::Rejected => &[Self::AwaitingReview],
            Self::AwaitingReview => &[Self::Verified, Self::Rejected],
            Self::Verified => &[Self::Refunded],
            Self::Refunded => &[],
        }
    }

    /// Whether `target` is directly reachable from `self`.
    #[must_use]
    pub fn can_transition_to(self, target: Self) -> bool {
        self.successors().contains(&target)
    }

    /// Storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::AwaitingReview => "awaiting_review",
            Self::Verified => "verified",
            Self::Rejected => "rejected",
            Self::Refunded => "refunded",
        }
    }
}

/// Outcome of the administrator's review of a payment proof.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerificationStatus {
    /// First proof uploaded, not yet reviewed.
    Pending,
    /// Proof accepted.
    Approved,
    /// Proof refused.
    Rejected,
    /// A replacement proof arrived after a rejection and needs a fresh look.
    RequiresReview,
}

impl VerificationStatus {
    /// Storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
            Self::RequiresReview => "requires_review",
        }
    }
}

macro_rules! status_string_impls {
    ($ty:ty, $kind:literal, [$($variant:ident),+ $(,)?]) => {
        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $ty {
            type Err = UnknownStatus;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                $(
                    if s == <$ty>::$variant.as_str() {
                        return Ok(<$ty>::$variant);
                    }
                )+
                Err(UnknownStatus {
                    kind: $kind,
                    value: s.to_string(),
                })
            }
        }
    };
}

status_string_impls!(
    BookingStatus,
    "booking",
    [Pending, Confirmed, InProgress, Completed, Cancelled]
);
status_string_impls!(
    PaymentStatus,
    "payment",
    [Pending, AwaitingReview, Verified, Rejected, Refunded]
);
status_string_impls!(
    VerificationStatus,
    "verification",
    [Pending, Approved, Rejected, RequiresReview]
);

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)] // Test code
mod tests {
    use super::*;

    #[test]
    fn test_booking_status_round_trips_through_strings() {
        for status in BookingStatus::ALL {
            assert_eq!(status.as_str().parse::<BookingStatus>(), Ok(status));
        }
        assert_eq!(
            serde_json::to_string(&BookingStatus::InProgress).unwrap(),
            "\"in_progress\""
        );
    }

    #[test]
    fn test_unknown_status_is_rejected() {
        let err = "shipped".parse::<BookingStatus>().unwrap_err();
        assert_eq!(err.to_string(), "unknown booking status: shipped");
        assert!("awaiting-review".parse::<PaymentStatus>().is_err());
    }

    #[test]
    fn test_cancelled_reachable_from_every_non_terminal_state() {
        for status in BookingStatus::ALL {
            assert_eq!(
                status.can_transition_to(BookingStatus::Cancelled),
                !status.is_terminal(),
                "{status}"
            );
        }
    }

    #[test]
    fn test_refunded_only_from_verified() {
        for status in PaymentStatus::ALL {
            assert_eq!(
                status.can_transition_to(PaymentStatus::Refunded),
                status == PaymentStatus::Verified
            );
        }
    }

    #[test]
    fn test_verification_status_strings() {
        assert_eq!(
            "requires_review".parse::<VerificationStatus>(),
            Ok(VerificationStatus::RequiresReview)
        );
    }
}
