//! Short-lived cache of bookable time slots per brand and date.

use crate::config::CoordinatorConfig;
use crate::error::Result;
use crate::providers::{EphemeralStore, decode, encode};
use chrono::NaiveDate;
use std::sync::Arc;
use std::time::Duration;

/// Availability lookups cached in the ephemeral store.
#[derive(Clone)]
pub struct AvailabilityCache {
    store: Arc<dyn EphemeralStore>,
    ttl: Duration,
}

impl AvailabilityCache {
    /// Create a cache with the configured TTL.
    #[must_use]
    pub fn new(store: Arc<dyn EphemeralStore>, config: &CoordinatorConfig) -> Self {
        Self {
            store,
            ttl: config.availability_ttl,
        }
    }

    fn key(brand: &str, date: NaiveDate) -> String {
        format!("availability:{brand}:{date}")
    }

    /// Cache the open slots (`"09:00"`, `"13:30"`, ...) for a day.
    ///
    /// # Errors
    ///
    /// Returns error if the store cannot be reached.
    pub async fn put(&self, brand: &str, date: NaiveDate, slots: &[String]) -> Result<()> {
        self.store
            .set(&Self::key(brand, date), encode(slots)?, self.ttl)
            .await?;
        tracing::debug!(brand = brand, date = %date, slots = slots.len(), "Cached availability");
        Ok(())
    }

    /// Cached slots for a day, if still fresh.
    ///
    /// # Errors
    ///
    /// Returns error if the store cannot be reached or the entry is unreadable.
    pub async fn get(&self, brand: &str, date: NaiveDate) -> Result<Option<Vec<String>>> {
        match self.store.get(&Self::key(brand, date)).await? {
            Some(bytes) => Ok(Some(decode(&bytes)?)),
            None => Ok(None),
        }
    }

    /// Drop the cached slots for a day, e.g. after a booking takes one.
    ///
    /// # Errors
    ///
    /// Returns error if the store cannot be reached.
    pub async fn invalidate(&self, brand: &str, date: NaiveDate) -> Result<()> {
        self.store.delete(&Self::key(brand, date)).await?;
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)] // Test code
mod tests {
    use super::*;
    use crate::mocks::ManualClock;
    use crate::stores::MemoryStore;
    use chrono::Utc;

    #[tokio::test]
    async fn test_put_get_expire() {
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let store = MemoryStore::with_clock(clock.clone());
        let cache = AvailabilityCache::new(Arc::new(store.clone()), &CoordinatorConfig::default());
        let date = NaiveDate::from_ymd_opt(2026, 7, 14).unwrap();
        let slots = vec!["09:00".to_string(), "13:00".to_string()];

        cache.put("lava", date, &slots).await.unwrap();
        assert_eq!(cache.get("lava", date).await.unwrap(), Some(slots));
        assert!(store.get("availability:lava:2026-07-14").await.unwrap().is_some());
        assert_eq!(cache.get("puffy", date).await.unwrap(), None);

        clock.advance(chrono::Duration::minutes(5));
        assert_eq!(cache.get("lava", date).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_invalidate() {
        let cache = AvailabilityCache::new(Arc::new(MemoryStore::new()), &CoordinatorConfig::default());
        let date = NaiveDate::from_ymd_opt(2026, 7, 14).unwrap();
        cache.put("indomie", date, &["10:00".to_string()]).await.unwrap();
        cache.invalidate("indomie", date).await.unwrap();
        assert_eq!(cache.get("indomie", date).await.unwrap(), None);
    }
}
