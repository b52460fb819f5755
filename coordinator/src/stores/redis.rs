//! Redis-backed ephemeral store.
//!
//! # Architecture
//!
//! - **Keys**: every key is prefixed (default `booking:`) to avoid collisions
//!   on shared instances
//! - **Expiry**: `SET ... PX` so Redis evicts on its own
//! - **Single use**: `GETDEL` fetches and deletes in one command
//! - **Compare-and-swap**: a Lua script, executed atomically by Redis
//!
//! # Example
//!
//! ```no_run
//! use booking_coordinator::stores::RedisStore;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let store = RedisStore::new("redis://127.0.0.1:6379", "booking:").await?;
//! # Ok(())
//! # }
//! ```

use crate::error::{StoreError, StoreResult};
use crate::providers::EphemeralStore;
use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Client, Script};
use std::time::Duration;

/// Replace `KEYS[1]` with `ARGV[3]` (expiring after `ARGV[4]` ms) only if its
/// current value matches. `ARGV[1]` is `"1"` when a value is expected
/// (`ARGV[2]`), `"0"` when the key must be absent.
const COMPARE_AND_SWAP_LUA: &str = r"
local current = redis.call('GET', KEYS[1])
if ARGV[1] == '0' then
  if current then return 0 end
else
  if current ~= ARGV[2] then return 0 end
end
redis.call('SET', KEYS[1], ARGV[3], 'PX', ARGV[4])
return 1
";

/// `Redis` [`EphemeralStore`].
///
/// # Thread Safety
///
/// `Clone` shares the same `ConnectionManager`.
#[derive(Clone)]
pub struct RedisStore {
    /// Connection manager for connection pooling.
    conn_manager: ConnectionManager,
    key_prefix: String,
    cas_script: Script,
}

impl RedisStore {
    /// Connect to `Redis`.
    ///
    /// # Arguments
    ///
    /// * `redis_url` - `Redis` connection URL (e.g., "<redis://127.0.0.1:6379>")
    /// * `key_prefix` - Namespace prepended to every key
    ///
    /// # Errors
    ///
    /// Returns error if the URL is malformed or the connection fails.
    pub async fn new(redis_url: &str, key_prefix: &str) -> StoreResult<Self> {
        let client = Client::open(redis_url).map_err(|e| {
            StoreError::Unavailable(format!("Failed to create Redis client: {e}"))
        })?;

        let conn_manager = ConnectionManager::new(client).await.map_err(|e| {
            StoreError::Unavailable(format!("Failed to create Redis connection manager: {e}"))
        })?;

        tracing::info!(key_prefix = key_prefix, "RedisStore initialized successfully");

        Ok(Self {
            conn_manager,
            key_prefix: key_prefix.to_string(),
            cas_script: Script::new(COMPARE_AND_SWAP_LUA),
        })
    }

    fn namespaced(&self, key: &str) -> String {
        format!("{}{key}", self.key_prefix)
    }

    fn ttl_millis(ttl: Duration) -> u64 {
        u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX).max(1)
    }
}

fn unavailable(op: &str) -> impl FnOnce(redis::RedisError) -> StoreError + '_ {
    move |e| StoreError::Unavailable(format!("Redis {op} failed: {e}"))
}

#[async_trait]
impl EphemeralStore for RedisStore {
    async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> StoreResult<()> {
        let mut conn = self.conn_manager.clone();
        let () = conn
            .pset_ex(self.namespaced(key), value, Self::ttl_millis(ttl))
            .await
            .map_err(unavailable("SET"))?;
        Ok(())
    }

    async fn get(&self, key: &str) -> StoreResult<Option<Vec<u8>>> {
        let mut conn = self.conn_manager.clone();
        conn.get(self.namespaced(key))
            .await
            .map_err(unavailable("GET"))
    }

    async fn delete(&self, key: &str) -> StoreResult<()> {
        let mut conn = self.conn_manager.clone();
        let _: i64 = conn
            .del(self.namespaced(key))
            .await
            .map_err(unavailable("DEL"))?;
        Ok(())
    }

    async fn take(&self, key: &str) -> StoreResult<Option<Vec<u8>>> {
        let mut conn = self.conn_manager.clone();
        // GETDEL: get + delete in one command, so concurrent callers cannot
        // both observe the value.
        conn.get_del(self.namespaced(key))
            .await
            .map_err(unavailable("GETDEL"))
    }

    async fn compare_and_swap(
        &self,
        key: &str,
        expected: Option<&[u8]>,
        value: Vec<u8>,
        ttl: Duration,
    ) -> StoreResult<bool> {
        let mut conn = self.conn_manager.clone();
        let (flag, expected): (&str, &[u8]) = match expected {
            Some(bytes) => ("1", bytes),
            None => ("0", &[]),
        };

        let swapped: i32 = self
            .cas_script
            .key(self.namespaced(key))
            .arg(flag)
            .arg(expected)
            .arg(value)
            .arg(Self::ttl_millis(ttl))
            .invoke_async(&mut conn)
            .await
            .map_err(unavailable("EVALSHA"))?;

        Ok(swapped == 1)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)] // Test code
mod tests {
    use super::*;

    // Note: These tests require a running Redis instance
    // Run with: docker run -d -p 6379:6379 redis:7-alpine

    async fn store() -> RedisStore {
        RedisStore::new(
            "redis://127.0.0.1:6379",
            &format!("test:{}:", uuid::Uuid::new_v4()),
        )
        .await
        .unwrap()
    }

    #[tokio::test]
    #[ignore] // Requires Redis running
    async fn test_redis_set_get_take() {
        let store = store().await;
        store.set("k", b"v".to_vec(), Duration::from_secs(30)).await.unwrap();
        assert_eq!(store.get("k").await.unwrap(), Some(b"v".to_vec()));
        assert_eq!(store.take("k").await.unwrap(), Some(b"v".to_vec()));
        assert_eq!(store.take("k").await.unwrap(), None);
    }

    #[tokio::test]
    #[ignore] // Requires Redis running
    async fn test_redis_expiry() {
        let store = store().await;
        store.set("k", b"v".to_vec(), Duration::from_millis(200)).await.unwrap();
        tokio::time::sleep(Duration::from_millis(400)).await;
        assert_eq!(store.get("k").await.unwrap(), None);
    }

    #[tokio::test]
    #[ignore] // Requires Redis running
    async fn test_redis_compare_and_swap() {
        let store = store().await;
        let ttl = Duration::from_secs(30);
        assert!(store.compare_and_swap("c", None, b"1".to_vec(), ttl).await.unwrap());
        assert!(!store.compare_and_swap("c", None, b"2".to_vec(), ttl).await.unwrap());
        assert!(store.compare_and_swap("c", Some(b"1"), b"2".to_vec(), ttl).await.unwrap());
        assert_eq!(store.get("c").await.unwrap(), Some(b"2".to_vec()));
        store.delete("c").await.unwrap();
    }
}
