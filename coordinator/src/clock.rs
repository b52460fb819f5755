//! Time source abstraction.
//!
//! Every expiry decision (rate windows, token lifetimes, "scheduled date is in
//! the future") reads time through [`Clock`] so tests can pin or advance it.

use chrono::{DateTime, Utc};

/// Clock trait - abstracts time operations for testability.
///
/// # Examples
///
/// ```
/// use booking_coordinator::clock::{Clock, SystemClock};
///
/// let clock = SystemClock;
/// let before = chrono::Utc::now();
/// assert!(clock.now() >= before);
/// ```
pub trait Clock: Send + Sync {
    /// Get the current time.
    fn now(&self) -> DateTime<Utc>;
}

/// Production clock backed by the system time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
