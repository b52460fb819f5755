//! Durable storage seam for bookings and payments.
//!
//! The coordinator never decides how bookings are persisted. It loads a
//! snapshot, runs the state machine, and hands the result back here.

use crate::error::Result;
use crate::lifecycle::{BookingStatus, PaymentStatus};
use crate::state::{BookingId, BookingRecord, PaymentId, PaymentRecord};
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// A booking about to be written for the first time.
#[derive(Debug, Clone, PartialEq)]
pub struct NewBooking {
    /// Human-facing booking number.
    pub booking_number: String,
    /// Invoice number derived from the booking number.
    pub invoice_number: String,
    /// Brand slug.
    pub brand: String,
    /// Validated submission data.
    pub details: serde_json::Value,
    /// Submission time.
    pub created_at: DateTime<Utc>,
}

/// Persistence for booking and payment snapshots.
///
/// # Implementation Notes
///
/// - `create_booking` assigns identifiers and opens the first payment in
///   `pending`, linked as the booking's active payment.
/// - Loads of unknown ids return [`BookingError::NotFound`](crate::BookingError::NotFound).
/// - Saves are compare-and-set: the stored status must still equal the
///   status the caller loaded, checked and written atomically. A mismatch
///   returns [`BookingError::Conflict`](crate::BookingError::Conflict) and
///   writes nothing.
/// - Infrastructure failure maps to
///   [`BookingError::StoreUnavailable`](crate::BookingError::StoreUnavailable).
#[async_trait]
pub trait LifecycleRepository: Send + Sync {
    /// Insert a booking and its initial payment.
    ///
    /// # Errors
    ///
    /// Returns error if the backend cannot be reached.
    async fn create_booking(&self, booking: NewBooking) -> Result<(BookingRecord, PaymentRecord)>;

    /// Load a booking snapshot.
    ///
    /// # Errors
    ///
    /// Returns error if the booking does not exist or the backend fails.
    async fn load_booking(&self, id: BookingId) -> Result<BookingRecord>;

    /// Replace a booking snapshot whose stored status is still `expected`.
    ///
    /// When `payment` is given, the save also requires that payment's stored
    /// status to still equal `payment.status`. Confirmation passes the
    /// verified payment it was decided against, so a concurrent refund cannot
    /// slip in between the check and the write.
    ///
    /// # Errors
    ///
    /// Returns error if the booking does not exist, either status moved
    /// (`Conflict`), or the backend fails.
    async fn save_booking(
        &self,
        booking: &BookingRecord,
        expected: BookingStatus,
        payment: Option<&PaymentRecord>,
    ) -> Result<()>;

    /// Load a payment snapshot.
    ///
    /// # Errors
    ///
    /// Returns error if the payment does not exist or the backend fails.
    async fn load_payment(&self, id: PaymentId) -> Result<PaymentRecord>;

    /// Replace a payment snapshot whose stored status is still `expected`.
    ///
    /// # Errors
    ///
    /// Returns error if the payment does not exist, its status moved
    /// (`Conflict`), or the backend fails.
    async fn save_payment(&self, payment: &PaymentRecord, expected: PaymentStatus) -> Result<()>;
}
