//! Ephemeral key-value store trait.
//!
//! The store works on opaque byte blobs. Structured values cross the boundary
//! through [`encode`] and [`decode`], so schema checks happen at the point of
//! use rather than inside the backend.

use crate::error::{StoreError, StoreResult};
use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::time::Duration;

/// Key-value store with per-key expiry.
///
/// # Implementation Notes
///
/// - `get` after expiry MUST behave exactly like `get` on a key that was never
///   set, whether the backend evicts lazily or eagerly.
/// - Operations on a single key are linearizable. No ordering is required
///   across distinct keys.
/// - **CRITICAL**: `take` and `compare_and_swap` MUST be atomic on the backend
///   (Redis `GETDEL` and a Lua script, or a mutex-protected map in memory).
///   Two round trips without a guard lose updates.
///
/// Backends report infrastructure failure as [`StoreError`]; absence is
/// always `Ok(None)`, never an error.
#[async_trait]
pub trait EphemeralStore: Send + Sync {
    /// Store `value` under `key`, replacing any previous value.
    ///
    /// # Errors
    ///
    /// Returns error if the backend cannot be reached.
    async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> StoreResult<()>;

    /// Fetch the value under `key`.
    ///
    /// # Errors
    ///
    /// Returns error if the backend cannot be reached.
    async fn get(&self, key: &str) -> StoreResult<Option<Vec<u8>>>;

    /// Remove `key`. Removing a missing key is not an error.
    ///
    /// # Errors
    ///
    /// Returns error if the backend cannot be reached.
    async fn delete(&self, key: &str) -> StoreResult<()>;

    /// Atomically fetch and remove the value under `key`.
    ///
    /// Of any number of concurrent callers, at most one observes `Some`.
    ///
    /// # Errors
    ///
    /// Returns error if the backend cannot be reached.
    async fn take(&self, key: &str) -> StoreResult<Option<Vec<u8>>>;

    /// Atomically replace the value under `key` if it still equals `expected`.
    ///
    /// `expected = None` means "only if the key is absent (or expired)".
    /// Returns `true` when the write happened.
    ///
    /// # Errors
    ///
    /// Returns error if the backend cannot be reached.
    async fn compare_and_swap(
        &self,
        key: &str,
        expected: Option<&[u8]>,
        value: Vec<u8>,
        ttl: Duration,
    ) -> StoreResult<bool>;
}

/// Serialize a value for storage.
///
/// # Errors
///
/// Returns [`StoreError::Serialization`] if the value cannot be encoded.
pub fn encode<T: Serialize + ?Sized>(value: &T) -> StoreResult<Vec<u8>> {
    serde_json::to_vec(value).map_err(|e| StoreError::Serialization(e.to_string()))
}

/// Deserialize a stored blob.
///
/// # Errors
///
/// Returns [`StoreError::Serialization`] if the bytes do not match `T`.
pub fn decode<T: DeserializeOwned>(bytes: &[u8]) -> StoreResult<T> {
    serde_json::from_slice(bytes).map_err(|e| StoreError::Serialization(e.to_string()))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)] // Test code
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Nested {
        count: u32,
        label: String,
        inner: std::collections::BTreeMap<String, serde_json::Value>,
    }

    #[test]
    fn test_structured_values_survive_the_blob_boundary() {
        let mut inner = std::collections::BTreeMap::new();
        inner.insert("price".to_string(), serde_json::json!(150_000.5));
        inner.insert("tags".to_string(), serde_json::json!(["a", "b"]));
        let value = Nested {
            count: 3,
            label: "puffy".to_string(),
            inner,
        };

        let bytes = encode(&value).unwrap();
        let back: Nested = decode(&bytes).unwrap();
        assert_eq!(back, value);
    }

    #[test]
    fn test_decode_rejects_mismatched_shape() {
        let bytes = encode(&serde_json::json!({"unexpected": true})).unwrap();
        let result: StoreResult<Nested> = decode(&bytes);
        assert!(matches!(result, Err(StoreError::Serialization(_))));
    }
}
