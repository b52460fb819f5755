//! Booking status transitions.

use super::status::{BookingStatus, PaymentStatus, VerificationStatus};
use crate::error::{BookingError, Result};
use crate::state::{BookingId, BookingRecord, PaymentRecord};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A validated booking status change, ready to be persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookingTransition {
    /// Booking being moved.
    pub booking_id: BookingId,
    /// Status before the change.
    pub from: BookingStatus,
    /// Status after the change.
    pub to: BookingStatus,
    /// When the change was decided.
    pub at: DateTime<Utc>,
}

impl BookingTransition {
    /// Apply the transition to a snapshot.
    #[must_use]
    pub fn apply(&self, booking: &BookingRecord) -> BookingRecord {
        BookingRecord {
            status: self.to,
            updated_at: self.at,
            ..booking.clone()
        }
    }
}

/// Decide whether `booking` may move to `target`.
///
/// Two checks, in order:
///
/// 1. `target` must be a direct successor of the current status.
/// 2. Moving into `confirmed` additionally requires the active payment to be
///    `verified` with an `approved` verification.
///
/// # Errors
///
/// - [`BookingError::IllegalTransition`] when `target` is not adjacent.
/// - [`BookingError::PaymentNotVerified`] when confirming without a verified payment.
pub fn transition_booking(
    booking: &BookingRecord,
    payment: Option<&PaymentRecord>,
    target: BookingStatus,
    now: DateTime<Utc>,
) -> Result<BookingTransition> {
    if !booking.status.can_transition_to(target) {
        return Err(BookingError::IllegalTransition {
            entity: "booking",
            from: booking.status.to_string(),
            to: target.to_string(),
        });
    }

    if target == BookingStatus::Confirmed {
        ensure_payment_verified(payment)?;
    }

    Ok(BookingTransition {
        booking_id: booking.id,
        from: booking.status,
        to: target,
        at: now,
    })
}

/// Guard for entering `confirmed`.
///
/// # Errors
///
/// Returns [`BookingError::PaymentNotVerified`] unless the payment is verified
/// and approved.
pub fn ensure_payment_verified(payment: Option<&PaymentRecord>) -> Result<()> {
    match payment {
        Some(p)
            if p.status == PaymentStatus::Verified
                && p.verification == Some(VerificationStatus::Approved) =>
        {
            Ok(())
        }
        Some(p) => Err(BookingError::PaymentNotVerified {
            payment_status: p.status.to_string(),
        }),
        None => Err(BookingError::PaymentNotVerified {
            payment_status: "none".to_string(),
        }),
    }
}
