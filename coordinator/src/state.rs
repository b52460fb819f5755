//! Identifier and record types shared across the coordinator.
//!
//! Bookings and payments are owned by durable storage outside this crate; the
//! records here are the snapshot shape the lifecycle machines read and return.

use crate::lifecycle::{BookingStatus, PaymentStatus, VerificationStatus};
use base64::Engine;
use chrono::{DateTime, Utc};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use std::fmt;

// ═══════════════════════════════════════════════════════════════════════
// ID Types
// ═══════════════════════════════════════════════════════════════════════

/// Durable identifier of a booking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BookingId(pub u64);

impl fmt::Display for BookingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Durable identifier of a payment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PaymentId(pub u64);

impl fmt::Display for PaymentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Opaque identifier of a wizard session.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub String);

impl SessionId {
    /// Generate a new unpredictable session identifier.
    ///
    /// Uses 256 bits of randomness, encoded as base64url (43 characters).
    #[must_use]
    pub fn generate() -> Self {
        Self(random_token())
    }

    /// Accept `raw` only if it has the shape [`SessionId::generate`] produces:
    /// 43 base64url characters encoding 32 bytes.
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        if raw.len() != 43 {
            return None;
        }
        base64::engine::general_purpose::URL_SAFE_NO_PAD
            .decode(raw)
            .ok()
            .filter(|bytes| bytes.len() == 32)
            .map(|_| Self(raw.to_string()))
    }

    /// Borrow the identifier as a string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Generate a cryptographically secure random token.
///
/// Returns a 256-bit random value encoded as base64url (43 characters).
pub(crate) fn random_token() -> String {
    let mut rng = rand::thread_rng();
    let mut random_bytes = [0u8; 32];
    rng.fill_bytes(&mut random_bytes);
    base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(random_bytes)
}

// ═══════════════════════════════════════════════════════════════════════
// Records
// ═══════════════════════════════════════════════════════════════════════

/// Snapshot of a booking as held by durable storage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookingRecord {
    /// Booking identifier.
    pub id: BookingId,

    /// Human-facing booking number (`{BRAND}-{unix_millis}`).
    pub booking_number: String,

    /// Invoice number derived from the booking number.
    pub invoice_number: String,

    /// Brand slug the booking was made under.
    pub brand: String,

    /// Lifecycle status.
    pub status: BookingStatus,

    /// Current payment, if one has been opened.
    pub active_payment: Option<PaymentId>,

    /// Validated submission data.
    pub details: serde_json::Value,

    /// Creation timestamp.
    pub created_at: DateTime<Utc>,

    /// Last status change.
    pub updated_at: DateTime<Utc>,
}

/// Snapshot of a payment as held by durable storage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentRecord {
    /// Payment identifier.
    pub id: PaymentId,

    /// Booking the payment settles.
    pub booking_id: BookingId,

    /// Payment status.
    pub status: PaymentStatus,

    /// Outcome of the latest administrator review, if any.
    pub verification: Option<VerificationStatus>,

    /// Reason given when the proof was rejected.
    pub rejection_reason: Option<String>,

    /// Content type of the latest uploaded proof.
    pub proof_content_type: Option<String>,

    /// When the payment was verified.
    pub verified_at: Option<DateTime<Utc>>,

    /// Last status change.
    pub updated_at: DateTime<Utc>,
}

impl PaymentRecord {
    /// Open a new payment in `pending` for a booking.
    #[must_use]
    pub const fn open(id: PaymentId, booking_id: BookingId, now: DateTime<Utc>) -> Self {
        Self {
            id,
            booking_id,
            status: PaymentStatus::Pending,
            verification: None,
            rejection_reason: None,
            proof_content_type: None,
            verified_at: None,
            updated_at: now,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)] // Test code
mod tests {
    use super::*;

    #[test]
    fn test_session_ids_are_unique_and_url_safe() {
        let a = SessionId::generate();
        let b = SessionId::generate();
        assert_ne!(a, b);
        assert_eq!(a.as_str().len(), 43);
        assert!(
            a.as_str()
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        );
    }

    #[test]
    fn test_parse_accepts_only_generated_shape() {
        let id = SessionId::generate();
        assert_eq!(SessionId::parse(id.as_str()), Some(id));

        assert_eq!(SessionId::parse("my-chosen-session"), None);
        assert_eq!(SessionId::parse(""), None);
        assert_eq!(SessionId::parse(&"a".repeat(44)), None);
        assert_eq!(SessionId::parse(&format!("{}=", "a".repeat(42))), None);
    }

    #[test]
    fn test_open_payment_starts_pending() {
        let payment = PaymentRecord::open(PaymentId(7), BookingId(3), Utc::now());
        assert_eq!(payment.status, PaymentStatus::Pending);
        assert!(payment.verification.is_none());
    }
}
