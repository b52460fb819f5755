//! Booking lifecycle state machines.
//!
//! Pure decision logic: every function takes a snapshot and returns either the
//! next snapshot or a rejection. Persisting the result is the caller's job.
//!
//! The booking and payment machines compose through one guard: a booking may
//! only enter `confirmed` while its active payment is `verified`.

pub mod booking;
pub mod payment;
pub mod status;

pub use booking::{BookingTransition, ensure_payment_verified, transition_booking};
pub use payment::{
    Decision, VerificationDecision, decide_verification, record_proof_upload, refund_payment,
};
pub use status::{BookingStatus, PaymentStatus, UnknownStatus, VerificationStatus};
