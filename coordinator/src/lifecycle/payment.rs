//! Payment status transitions and the administrator's verification decision.
//!
//! The decision is the only way out of `awaiting_review`. Nothing here moves a
//! payment on a timer.

use super::status::{PaymentStatus, VerificationStatus};
use crate::error::{BookingError, Result};
use crate::state::{PaymentId, PaymentRecord};
use crate::validation::ValidationErrors;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Administrator verdict on an uploaded proof.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    /// Accept the proof.
    Approved,
    /// Refuse the proof; requires a reason.
    Rejected,
}

/// Input to [`decide_verification`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationDecision {
    /// Payment under review.
    pub payment_id: PaymentId,
    /// Verdict.
    pub decision: Decision,
    /// Required (non-blank) when `decision` is `rejected`, ignored otherwise.
    #[serde(default)]
    pub rejection_reason: Option<String>,
}

impl VerificationDecision {
    /// Check the decision on its own, independent of payment state.
    ///
    /// Returns the trimmed rejection reason for `rejected`, `None` for `approved`.
    ///
    /// # Errors
    ///
    /// Returns [`BookingError::ValidationFailed`] when a rejection has no reason.
    pub fn validated_reason(&self) -> Result<Option<String>> {
        match self.decision {
            Decision::Approved => Ok(None),
            Decision::Rejected => {
                let reason = self
                    .rejection_reason
                    .as_deref()
                    .map(str::trim)
                    .filter(|r| !r.is_empty());
                match reason {
                    Some(r) => Ok(Some(r.to_string())),
                    None => Err(BookingError::ValidationFailed(ValidationErrors::single(
                        "rejectionReason",
                        "Rejection reason is required",
                    ))),
                }
            }
        }
    }
}

fn illegal(from: PaymentStatus, to: PaymentStatus) -> BookingError {
    BookingError::IllegalTransition {
        entity: "payment",
        from: from.to_string(),
        to: to.to_string(),
    }
}

/// Apply an administrator decision to a payment.
///
/// The decision is validated before the payment state is looked at, so a
/// rejection without a reason fails validation from any state.
///
/// # Errors
///
/// - [`BookingError::ValidationFailed`] for a rejection without a reason.
/// - [`BookingError::IllegalTransition`] unless the payment is `awaiting_review`.
pub fn decide_verification(
    payment: &PaymentRecord,
    decision: &VerificationDecision,
    now: DateTime<Utc>,
) -> Result<PaymentRecord> {
    let reason = decision.validated_reason()?;

    let (target, verification) = match decision.decision {
        Decision::Approved => (PaymentStatus::Verified, VerificationStatus::Approved),
        Decision::Rejected => (PaymentStatus::Rejected, VerificationStatus::Rejected),
    };

    if payment.status != PaymentStatus::AwaitingReview {
        return Err(illegal(payment.status, target));
    }

    Ok(PaymentRecord {
        status: target,
        verification: Some(verification),
        rejection_reason: reason,
        verified_at: (target == PaymentStatus::Verified).then_some(now),
        updated_at: now,
        ..payment.clone()
    })
}

/// Record that a proof of payment was uploaded.
///
/// Allowed from `pending` (first upload) and `rejected` (re-upload). A
/// re-upload is flagged `requires_review`.
///
/// # Errors
///
/// Returns [`BookingError::IllegalTransition`] from any other state.
pub fn record_proof_upload(
    payment: &PaymentRecord,
    content_type: &str,
    now: DateTime<Utc>,
) -> Result<PaymentRecord> {
    let verification = match payment.status {
        PaymentStatus::Pending => VerificationStatus::Pending,
        PaymentStatus::Rejected => VerificationStatus::RequiresReview,
        other => return Err(illegal(other, PaymentStatus::AwaitingReview)),
    };

    Ok(PaymentRecord {
        status: PaymentStatus::AwaitingReview,
        verification: Some(verification),
        proof_content_type: Some(content_type.to_string()),
        updated_at: now,
        ..payment.clone()
    })
}

/// Reverse a verified payment.
///
/// # Errors
///
/// Returns [`BookingError::IllegalTransition`] unless the payment is `verified`.
pub fn refund_payment(payment: &PaymentRecord, now: DateTime<Utc>) -> Result<PaymentRecord> {
    if !payment.status.can_transition_to(PaymentStatus::Refunded) {
        return Err(illegal(payment.status, PaymentStatus::Refunded));
    }

    Ok(PaymentRecord {
        status: PaymentStatus::Refunded,
        updated_at: now,
        ..payment.clone()
    })
}
