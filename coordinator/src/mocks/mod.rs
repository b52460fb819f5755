//! Test doubles.
//!
//! In-memory and failure-injecting implementations for unit and integration
//! tests. Compiled with the `test-utils` feature (on by default).

use crate::clock::Clock;
use crate::error::{StoreError, StoreResult};
use crate::providers::EphemeralStore;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicI64, Ordering};
use std::time::Duration;

pub use crate::stores::InMemoryLifecycleRepository;

/// Clock that only moves when told to.
///
/// Millisecond precision.
///
/// # Examples
///
/// ```
/// use booking_coordinator::clock::Clock;
/// use booking_coordinator::mocks::ManualClock;
/// use chrono::{Duration, TimeZone, Utc};
///
/// let start = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
/// let clock = ManualClock::new(start);
/// clock.advance(Duration::seconds(30));
/// assert_eq!(clock.now(), start + Duration::seconds(30));
/// ```
#[derive(Debug)]
pub struct ManualClock {
    millis: AtomicI64,
}

impl ManualClock {
    /// Create a clock frozen at `start`.
    #[must_use]
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            millis: AtomicI64::new(start.timestamp_millis()),
        }
    }

    /// Move the clock forward (or backward, for a negative `by`).
    pub fn advance(&self, by: chrono::Duration) {
        self.millis.fetch_add(by.num_milliseconds(), Ordering::SeqCst);
    }

    /// Jump to `at`.
    pub fn set(&self, at: DateTime<Utc>) {
        self.millis.store(at.timestamp_millis(), Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        DateTime::from_timestamp_millis(self.millis.load(Ordering::SeqCst)).unwrap_or_default()
    }
}

/// Store whose every call fails as if the backend were down.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnavailableStore;

impl UnavailableStore {
    fn outage<T>() -> StoreResult<T> {
        Err(StoreError::Unavailable("connection refused".to_string()))
    }
}

#[async_trait]
impl EphemeralStore for UnavailableStore {
    async fn set(&self, _key: &str, _value: Vec<u8>, _ttl: Duration) -> StoreResult<()> {
        Self::outage()
    }

    async fn get(&self, _key: &str) -> StoreResult<Option<Vec<u8>>> {
        Self::outage()
    }

    async fn delete(&self, _key: &str) -> StoreResult<()> {
        Self::outage()
    }

    async fn take(&self, _key: &str) -> StoreResult<Option<Vec<u8>>> {
        Self::outage()
    }

    async fn compare_and_swap(
        &self,
        _key: &str,
        _expected: Option<&[u8]>,
        _value: Vec<u8>,
        _ttl: Duration,
    ) -> StoreResult<bool> {
        Self::outage()
    }
}

/// Store whose calls never complete.
///
/// Wrap in [`BoundedStore`](crate::stores::BoundedStore) to exercise timeouts.
#[derive(Debug, Clone, Copy, Default)]
pub struct StallingStore;

#[async_trait]
impl EphemeralStore for StallingStore {
    async fn set(&self, _key: &str, _value: Vec<u8>, _ttl: Duration) -> StoreResult<()> {
        std::future::pending().await
    }

    async fn get(&self, _key: &str) -> StoreResult<Option<Vec<u8>>> {
        std::future::pending().await
    }

    async fn delete(&self, _key: &str) -> StoreResult<()> {
        std::future::pending().await
    }

    async fn take(&self, _key: &str) -> StoreResult<Option<Vec<u8>>> {
        std::future::pending().await
    }

    async fn compare_and_swap(
        &self,
        _key: &str,
        _expected: Option<&[u8]>,
        _value: Vec<u8>,
        _ttl: Duration,
    ) -> StoreResult<bool> {
        std::future::pending().await
    }
}
