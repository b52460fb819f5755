//! In-process ephemeral store.
//!
//! A mutex-guarded map with clock-driven expiry. Suitable for single-process
//! deployments and tests; every operation holds the lock for its whole
//! read-modify-write, which gives per-key linearizability for free.

use crate::clock::{Clock, SystemClock};
use crate::error::{StoreError, StoreResult};
use crate::providers::EphemeralStore;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

#[derive(Debug, Clone)]
struct Entry {
    value: Vec<u8>,
    expires_at: DateTime<Utc>,
}

/// In-memory [`EphemeralStore`].
///
/// # Memory Management
///
/// Expired entries are evicted lazily when their key is touched. Call
/// [`purge_expired`](Self::purge_expired) periodically to sweep keys that are
/// never read again.
#[derive(Clone)]
pub struct MemoryStore {
    entries: Arc<Mutex<HashMap<String, Entry>>>,
    clock: Arc<dyn Clock>,
}

impl MemoryStore {
    /// Create an empty store on the system clock.
    #[must_use]
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    /// Create an empty store reading time from `clock`.
    #[must_use]
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: Arc::new(Mutex::new(HashMap::new())),
            clock,
        }
    }

    fn lock(&self) -> StoreResult<MutexGuard<'_, HashMap<String, Entry>>> {
        self.entries
            .lock()
            .map_err(|_| StoreError::Unavailable("Mutex lock failed".to_string()))
    }

    fn expiry(&self, ttl: Duration) -> DateTime<Utc> {
        let ttl = chrono::Duration::from_std(ttl).unwrap_or(chrono::Duration::MAX);
        self.clock
            .now()
            .checked_add_signed(ttl)
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }

    /// Remove the entry under `key` if it has expired, then return the live one.
    fn live<'a>(
        entries: &'a mut HashMap<String, Entry>,
        key: &str,
        now: DateTime<Utc>,
    ) -> Option<&'a Entry> {
        if entries.get(key).is_some_and(|e| e.expires_at <= now) {
            entries.remove(key);
        }
        entries.get(key)
    }

    /// Drop every expired entry. Returns how many were removed.
    ///
    /// # Errors
    ///
    /// Returns error if the lock is poisoned.
    pub fn purge_expired(&self) -> StoreResult<usize> {
        let now = self.clock.now();
        let mut entries = self.lock()?;
        let before = entries.len();
        entries.retain(|_, e| e.expires_at > now);
        let removed = before - entries.len();
        if removed > 0 {
            tracing::debug!(removed = removed, "Purged expired entries");
        }
        Ok(removed)
    }

    /// Number of entries currently held, expired or not (for testing).
    ///
    /// # Errors
    ///
    /// Returns error if the lock is poisoned.
    pub fn len(&self) -> StoreResult<usize> {
        Ok(self.lock()?.len())
    }

    /// Whether the store holds no entries (for testing).
    ///
    /// # Errors
    ///
    /// Returns error if the lock is poisoned.
    pub fn is_empty(&self) -> StoreResult<bool> {
        Ok(self.lock()?.is_empty())
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EphemeralStore for MemoryStore {
    async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> StoreResult<()> {
        let expires_at = self.expiry(ttl);
        self.lock()?
            .insert(key.to_string(), Entry { value, expires_at });
        Ok(())
    }

    async fn get(&self, key: &str) -> StoreResult<Option<Vec<u8>>> {
        let now = self.clock.now();
        let mut entries = self.lock()?;
        Ok(Self::live(&mut entries, key, now).map(|e| e.value.clone()))
    }

    async fn delete(&self, key: &str) -> StoreResult<()> {
        self.lock()?.remove(key);
        Ok(())
    }

    async fn take(&self, key: &str) -> StoreResult<Option<Vec<u8>>> {
        let now = self.clock.now();
        let mut entries = self.lock()?;
        Ok(entries
            .remove(key)
            .filter(|e| e.expires_at > now)
            .map(|e| e.value))
    }

    async fn compare_and_swap(
        &self,
        key: &str,
        expected: Option<&[u8]>,
        value: Vec<u8>,
        ttl: Duration,
    ) -> StoreResult<bool> {
        let now = self.clock.now();
        let expires_at = self.expiry(ttl);
        let mut entries = self.lock()?;

        let current = Self::live(&mut entries, key, now).map(|e| e.value.as_slice());
        if current != expected {
            return Ok(false);
        }

        entries.insert(key.to_string(), Entry { value, expires_at });
        Ok(true)
    }
}
