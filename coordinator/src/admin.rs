//! Administrative workflow.
//!
//! Each operation loads snapshots from the [`LifecycleRepository`], asks the
//! pure state machines in [`crate::lifecycle`] for the next snapshot, and
//! writes it back with a compare-and-set on the status it loaded. Rejections
//! and lost races are logged and returned; nothing is coerced to the nearest
//! legal state.

use crate::clock::Clock;
use crate::error::{BookingError, Result};
use crate::lifecycle::{self, BookingStatus, PaymentStatus, VerificationDecision};
use crate::providers::LifecycleRepository;
use crate::state::{BookingId, BookingRecord, PaymentId, PaymentRecord};
use crate::upload_token::{DEFAULT_ALLOWED_TYPES, UploadTokenIssuer};
use std::sync::Arc;

/// Administrator-triggered lifecycle changes.
#[derive(Clone)]
pub struct AdminWorkflow {
    repository: Arc<dyn LifecycleRepository>,
    tokens: UploadTokenIssuer,
    clock: Arc<dyn Clock>,
}

impl AdminWorkflow {
    /// Create the workflow.
    #[must_use]
    pub fn new(
        repository: Arc<dyn LifecycleRepository>,
        tokens: UploadTokenIssuer,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            repository,
            tokens,
            clock,
        }
    }

    async fn active_payment(&self, booking: &BookingRecord) -> Result<Option<PaymentRecord>> {
        match booking.active_payment {
            Some(id) => self.repository.load_payment(id).await.map(Some),
            None => Ok(None),
        }
    }

    /// Move a booking to `target`.
    ///
    /// # Errors
    ///
    /// - [`BookingError::NotFound`] for an unknown booking.
    /// - [`BookingError::IllegalTransition`] when `target` is not adjacent.
    /// - [`BookingError::PaymentNotVerified`] when confirming an unpaid booking.
    /// - [`BookingError::Conflict`] when the booking, or the payment a
    ///   confirmation relied on, changed after it was loaded.
    pub async fn transition_booking(
        &self,
        booking_id: BookingId,
        target: BookingStatus,
    ) -> Result<BookingRecord> {
        let booking = self.repository.load_booking(booking_id).await?;
        let payment = self.active_payment(&booking).await?;

        let transition =
            lifecycle::transition_booking(&booking, payment.as_ref(), target, self.clock.now())
                .inspect_err(|e| {
                    tracing::warn!(
                        booking_id = %booking_id,
                        from = %booking.status,
                        to = %target,
                        error = %e,
                        "Booking transition rejected"
                    );
                })?;

        let updated = transition.apply(&booking);
        let guard = payment.as_ref().filter(|_| target == BookingStatus::Confirmed);
        self.repository
            .save_booking(&updated, booking.status, guard)
            .await
            .inspect_err(|e| {
                tracing::warn!(
                    booking_id = %booking_id,
                    to = %target,
                    error = %e,
                    "Booking transition not saved"
                );
            })?;

        tracing::info!(
            booking_id = %booking_id,
            from = %transition.from,
            to = %transition.to,
            "Booking transition applied"
        );
        Ok(updated)
    }

    /// Record an administrator's verdict on a payment proof.
    ///
    /// # Errors
    ///
    /// - [`BookingError::ValidationFailed`] for a rejection without a reason.
    /// - [`BookingError::NotFound`] for an unknown payment.
    /// - [`BookingError::IllegalTransition`] unless the payment awaits review.
    /// - [`BookingError::Conflict`] when another decision landed first.
    pub async fn decide_verification(
        &self,
        decision: &VerificationDecision,
    ) -> Result<PaymentRecord> {
        decision.validated_reason()?;
        let payment = self.repository.load_payment(decision.payment_id).await?;

        let updated = lifecycle::decide_verification(&payment, decision, self.clock.now())
            .inspect_err(|e| {
                tracing::warn!(
                    payment_id = %decision.payment_id,
                    status = %payment.status,
                    error = %e,
                    "Verification decision rejected"
                );
            })?;

        self.repository
            .save_payment(&updated, payment.status)
            .await
            .inspect_err(|e| {
                tracing::warn!(
                    payment_id = %decision.payment_id,
                    error = %e,
                    "Verification decision not saved"
                );
            })?;
        tracing::info!(
            payment_id = %updated.id,
            status = %updated.status,
            "Payment verification recorded"
        );
        Ok(updated)
    }

    /// Redeem an upload token and move the booking's payment to review.
    ///
    /// The token is spent even if the file is then refused.
    ///
    /// # Errors
    ///
    /// - [`BookingError::TokenInvalidOrConsumed`] for an unknown, expired or spent token.
    /// - [`BookingError::ValidationFailed`] when the file breaks the grant.
    /// - [`BookingError::IllegalTransition`] when the payment is not awaiting a proof.
    pub async fn record_proof_upload(
        &self,
        token: &str,
        content_type: &str,
        size_bytes: u64,
    ) -> Result<PaymentRecord> {
        let grant = self
            .tokens
            .verify_and_consume(token)
            .await?
            .ok_or(BookingError::TokenInvalidOrConsumed)?;
        grant.check_file(content_type, size_bytes)?;

        let booking = self.repository.load_booking(grant.booking_id).await?;
        let payment = self
            .active_payment(&booking)
            .await?
            .ok_or_else(|| BookingError::NotFound {
                entity: "payment",
                id: format!("active payment of booking {}", booking.id),
            })?;

        let updated = lifecycle::record_proof_upload(&payment, content_type, self.clock.now())?;
        self.repository.save_payment(&updated, payment.status).await?;

        tracing::info!(
            booking_id = %booking.id,
            payment_id = %updated.id,
            verification = ?updated.verification,
            "Payment proof recorded"
        );
        Ok(updated)
    }

    /// Issue a fresh upload token, e.g. after a rejected proof.
    ///
    /// # Errors
    ///
    /// - [`BookingError::NotFound`] for an unknown booking or payment.
    /// - [`BookingError::IllegalTransition`] unless the payment can accept a proof.
    pub async fn reissue_upload_token(&self, booking_id: BookingId) -> Result<String> {
        let booking = self.repository.load_booking(booking_id).await?;
        let payment = self
            .active_payment(&booking)
            .await?
            .ok_or_else(|| BookingError::NotFound {
                entity: "payment",
                id: format!("active payment of booking {booking_id}"),
            })?;

        if !payment
            .status
            .can_transition_to(PaymentStatus::AwaitingReview)
        {
            return Err(BookingError::IllegalTransition {
                entity: "payment",
                from: payment.status.to_string(),
                to: PaymentStatus::AwaitingReview.to_string(),
            });
        }

        self.tokens.issue(booking_id, &DEFAULT_ALLOWED_TYPES).await
    }

    /// Reverse a verified payment.
    ///
    /// # Errors
    ///
    /// - [`BookingError::NotFound`] for an unknown payment.
    /// - [`BookingError::IllegalTransition`] unless the payment is verified.
    /// - [`BookingError::Conflict`] when the payment changed after it was loaded.
    pub async fn refund_payment(&self, payment_id: PaymentId) -> Result<PaymentRecord> {
        let payment = self.repository.load_payment(payment_id).await?;
        let updated = lifecycle::refund_payment(&payment, self.clock.now())?;
        self.repository.save_payment(&updated, payment.status).await?;

        tracing::info!(payment_id = %payment_id, "Payment refunded");
        Ok(updated)
    }
}
