//! Timeout decorator for any ephemeral store.
//!
//! No caller may be wedged by a slow or unreachable backend: each call is
//! raced against a fixed bound and reported as [`StoreError::Timeout`] when it
//! loses.

use crate::error::{StoreError, StoreResult};
use crate::providers::EphemeralStore;
use async_trait::async_trait;
use std::future::Future;
use std::time::Duration;

/// Wraps an [`EphemeralStore`] so every call completes within `timeout`.
///
/// # Example
///
/// ```
/// use booking_coordinator::stores::{BoundedStore, MemoryStore};
/// use std::time::Duration;
///
/// let store = BoundedStore::new(MemoryStore::new(), Duration::from_millis(500));
/// assert_eq!(store.timeout(), Duration::from_millis(500));
/// ```
#[derive(Clone)]
pub struct BoundedStore<S> {
    inner: S,
    timeout: Duration,
}

impl<S> BoundedStore<S> {
    /// Wrap `inner` with a per-call `timeout`.
    #[must_use]
    pub const fn new(inner: S, timeout: Duration) -> Self {
        Self { inner, timeout }
    }

    /// Configured per-call bound.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Borrow the wrapped store.
    #[must_use]
    pub const fn inner(&self) -> &S {
        &self.inner
    }

    async fn bounded<T: Send>(
        &self,
        op: &'static str,
        key: &str,
        fut: impl Future<Output = StoreResult<T>> + Send,
    ) -> StoreResult<T> {
        if let Ok(result) = tokio::time::timeout(self.timeout, fut).await {
            result
        } else {
            tracing::warn!(
                op = op,
                key = %key,
                timeout_ms = u64::try_from(self.timeout.as_millis()).unwrap_or(u64::MAX),
                "Store call timed out"
            );
            Err(StoreError::Timeout)
        }
    }
}

#[async_trait]
impl<S: EphemeralStore> EphemeralStore for BoundedStore<S> {
    async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> StoreResult<()> {
        self.bounded("set", key, self.inner.set(key, value, ttl)).await
    }

    async fn get(&self, key: &str) -> StoreResult<Option<Vec<u8>>> {
        self.bounded("get", key, self.inner.get(key)).await
    }

    async fn delete(&self, key: &str) -> StoreResult<()> {
        self.bounded("delete", key, self.inner.delete(key)).await
    }

    async fn take(&self, key: &str) -> StoreResult<Option<Vec<u8>>> {
        self.bounded("take", key, self.inner.take(key)).await
    }

    async fn compare_and_swap(
        &self,
        key: &str,
        expected: Option<&[u8]>,
        value: Vec<u8>,
        ttl: Duration,
    ) -> StoreResult<bool> {
        self.bounded(
            "compare_and_swap",
            key,
            self.inner.compare_and_swap(key, expected, value, ttl),
        )
        .await
    }
}
