//! Single-use upload tokens.
//!
//! # Security
//!
//! - **Unguessable**: 256 random bits, base64url encoded
//! - **Hashed at rest**: the store key is the SHA-256 digest of the token, so
//!   a store dump does not hand out bearer credentials
//! - **Single use**: [`UploadTokenIssuer::verify_and_consume`] is one atomic
//!   `take`; of any number of concurrent callers exactly one receives the grant
//! - **Expiry checked twice**: by store TTL and again against `expires_at`
//!
//! A token that never existed, expired or was already used all look the same
//! to the caller.

use crate::clock::Clock;
use crate::config::CoordinatorConfig;
use crate::error::{BookingError, Result};
use crate::providers::{EphemeralStore, decode, encode};
use crate::state::{BookingId, random_token};
use crate::validation::ValidationErrors;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::sync::Arc;
use std::time::Duration;

/// Content types accepted for proof-of-payment images.
pub const DEFAULT_ALLOWED_TYPES: [&str; 3] = ["image/jpeg", "image/png", "image/webp"];

/// Largest accepted upload (5 MiB).
pub const MAX_UPLOAD_BYTES: u64 = 5 * 1024 * 1024;

/// What a token authorizes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadGrant {
    /// Booking the upload belongs to.
    pub booking_id: BookingId,
    /// Accepted MIME types.
    pub allowed_types: Vec<String>,
    /// When the token was issued.
    pub issued_at: DateTime<Utc>,
    /// When the token stops being valid.
    pub expires_at: DateTime<Utc>,
}

impl UploadGrant {
    /// Check a file against this grant.
    ///
    /// # Errors
    ///
    /// Returns [`BookingError::ValidationFailed`] with a `file` entry when the
    /// content type is not allowed or the file exceeds 5 MiB.
    pub fn check_file(&self, content_type: &str, size_bytes: u64) -> Result<()> {
        if !self.allowed_types.iter().any(|t| t == content_type) {
            return Err(BookingError::ValidationFailed(ValidationErrors::single(
                "file",
                &format!(
                    "File type {content_type} not allowed. Allowed types: {}",
                    self.allowed_types.join(", ")
                ),
            )));
        }

        if size_bytes > MAX_UPLOAD_BYTES {
            let mib = |bytes: u64| (bytes + 512 * 1024) / (1024 * 1024);
            return Err(BookingError::ValidationFailed(ValidationErrors::single(
                "file",
                &format!(
                    "File size {}MB exceeds maximum {}MB",
                    mib(size_bytes),
                    mib(MAX_UPLOAD_BYTES)
                ),
            )));
        }

        Ok(())
    }
}

/// Issues and redeems upload tokens.
#[derive(Clone)]
pub struct UploadTokenIssuer {
    store: Arc<dyn EphemeralStore>,
    clock: Arc<dyn Clock>,
    ttl: Duration,
}

impl UploadTokenIssuer {
    /// Create an issuer with the configured token lifetime.
    #[must_use]
    pub fn new(
        store: Arc<dyn EphemeralStore>,
        clock: Arc<dyn Clock>,
        config: &CoordinatorConfig,
    ) -> Self {
        Self {
            store,
            clock,
            ttl: config.upload_token_ttl,
        }
    }

    /// Store key for a token: `upload_token:{sha256(token)}`.
    fn key(token: &str) -> String {
        format!("upload_token:{:x}", Sha256::digest(token.as_bytes()))
    }

    /// Mint a token for one proof upload against `booking_id`.
    ///
    /// # Errors
    ///
    /// Returns [`BookingError::StoreUnavailable`] if the store cannot be reached.
    pub async fn issue(&self, booking_id: BookingId, allowed_types: &[&str]) -> Result<String> {
        self.issue_with_ttl(booking_id, allowed_types, self.ttl).await
    }

    /// Mint a token with an explicit lifetime.
    ///
    /// # Errors
    ///
    /// - [`BookingError::InvalidConfig`] when `ttl` does not fit a timestamp.
    /// - [`BookingError::StoreUnavailable`] if the store cannot be reached.
    pub async fn issue_with_ttl(
        &self,
        booking_id: BookingId,
        allowed_types: &[&str],
        ttl: Duration,
    ) -> Result<String> {
        let issued_at = self.clock.now();
        let lifetime = chrono::Duration::from_std(ttl)
            .map_err(|e| BookingError::InvalidConfig(format!("token ttl: {e}")))?;
        let expires_at = issued_at
            .checked_add_signed(lifetime)
            .ok_or_else(|| BookingError::InvalidConfig(format!("token ttl out of range: {ttl:?}")))?;
        let token = random_token();

        let grant = UploadGrant {
            booking_id,
            allowed_types: allowed_types.iter().map(ToString::to_string).collect(),
            issued_at,
            expires_at,
        };

        self.store.set(&Self::key(&token), encode(&grant)?, ttl).await?;

        tracing::info!(
            booking_id = %booking_id,
            expires_at = %expires_at,
            "Issued upload token"
        );
        Ok(token)
    }

    /// Redeem a token. Returns its grant at most once.
    ///
    /// # Errors
    ///
    /// Returns [`BookingError::StoreUnavailable`] if the store cannot be
    /// reached. An unknown, expired or spent token is `Ok(None)`.
    pub async fn verify_and_consume(&self, token: &str) -> Result<Option<UploadGrant>> {
        let Some(bytes) = self.store.take(&Self::key(token)).await? else {
            tracing::debug!("Upload token not found or already consumed");
            return Ok(None);
        };

        let grant: UploadGrant = decode(&bytes)?;

        if grant.expires_at <= self.clock.now() {
            tracing::warn!(
                booking_id = %grant.booking_id,
                expires_at = %grant.expires_at,
                "Upload token expired"
            );
            return Ok(None);
        }

        metrics::counter!("upload_tokens_consumed_total").increment(1);
        tracing::info!(booking_id = %grant.booking_id, "Upload token consumed");
        Ok(Some(grant))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)] // Test code
mod tests {
    use super::*;
    use crate::mocks::{ManualClock, UnavailableStore};
    use crate::stores::MemoryStore;

    fn issuer() -> (UploadTokenIssuer, Arc<ManualClock>, MemoryStore) {
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let store = MemoryStore::with_clock(clock.clone());
        (
            UploadTokenIssuer::new(
                Arc::new(store.clone()),
                clock.clone(),
                &CoordinatorConfig::default(),
            ),
            clock,
            store,
        )
    }

    #[tokio::test]
    async fn test_token_is_single_use() {
        let (issuer, _, _) = issuer();
        let token = issuer.issue(BookingId(12), &DEFAULT_ALLOWED_TYPES).await.unwrap();

        let grant = issuer.verify_and_consume(&token).await.unwrap().unwrap();
        assert_eq!(grant.booking_id, BookingId(12));
        assert_eq!(grant.allowed_types.len(), 3);

        assert!(issuer.verify_and_consume(&token).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_tokens_are_random_and_not_stored_in_clear() {
        let (issuer, _, store) = issuer();
        let a = issuer.issue(BookingId(1), &DEFAULT_ALLOWED_TYPES).await.unwrap();
        let b = issuer.issue(BookingId(1), &DEFAULT_ALLOWED_TYPES).await.unwrap();

        assert_ne!(a, b);
        assert_eq!(a.len(), 43);
        assert!(store.get(&format!("upload_token:{a}")).await.unwrap().is_none());
        assert!(store.get(&UploadTokenIssuer::key(&a)).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_expired_token_is_absent() {
        let (issuer, clock, _) = issuer();
        let token = issuer.issue(BookingId(3), &DEFAULT_ALLOWED_TYPES).await.unwrap();

        clock.advance(chrono::Duration::hours(1));
        assert!(issuer.verify_and_consume(&token).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_unknown_token_is_absent() {
        let (issuer, _, _) = issuer();
        assert!(issuer.verify_and_consume("not-a-token").await.unwrap().is_none());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_consumers_have_one_winner() {
        let (issuer, _, _) = issuer();
        let token = issuer.issue(BookingId(5), &DEFAULT_ALLOWED_TYPES).await.unwrap();

        let (a, b) = tokio::join!(
            issuer.verify_and_consume(&token),
            issuer.verify_and_consume(&token)
        );
        assert_eq!(
            usize::from(a.unwrap().is_some()) + usize::from(b.unwrap().is_some()),
            1
        );

        let token = issuer.issue(BookingId(6), &DEFAULT_ALLOWED_TYPES).await.unwrap();
        let handles: Vec<_> = (0..16)
            .map(|_| {
                let issuer = issuer.clone();
                let token = token.clone();
                tokio::spawn(async move { issuer.verify_and_consume(&token).await.unwrap() })
            })
            .collect();

        let mut winners = 0;
        for handle in handles {
            if handle.await.unwrap().is_some() {
                winners += 1;
            }
        }
        assert_eq!(winners, 1);
    }

    #[tokio::test]
    async fn test_oversized_ttl_is_invalid_config() {
        let (issuer, _, store) = issuer();
        for ttl in [Duration::from_secs(u64::MAX), Duration::from_secs(1 << 50)] {
            assert!(matches!(
                issuer
                    .issue_with_ttl(BookingId(8), &DEFAULT_ALLOWED_TYPES, ttl)
                    .await,
                Err(BookingError::InvalidConfig(_))
            ));
        }
        assert!(store.is_empty().unwrap());
    }

    #[tokio::test]
    async fn test_unavailable_store_is_an_error_not_absent() {
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let issuer = UploadTokenIssuer::new(
            Arc::new(UnavailableStore),
            clock,
            &CoordinatorConfig::default(),
        );
        assert!(matches!(
            issuer.verify_and_consume("anything").await,
            Err(BookingError::StoreUnavailable(_))
        ));
    }

    #[test]
    fn test_check_file() {
        let now = Utc::now();
        let grant = UploadGrant {
            booking_id: BookingId(1),
            allowed_types: DEFAULT_ALLOWED_TYPES.iter().map(ToString::to_string).collect(),
            issued_at: now,
            expires_at: now,
        };

        assert!(grant.check_file("image/png", 1024).is_ok());
        assert!(grant.check_file("image/png", MAX_UPLOAD_BYTES).is_ok());

        let Err(BookingError::ValidationFailed(errors)) = grant.check_file("application/pdf", 10)
        else {
            unreachable!("pdf must be refused");
        };
        assert_eq!(
            errors.get("file"),
            Some("File type application/pdf not allowed. Allowed types: image/jpeg, image/png, image/webp")
        );

        let Err(BookingError::ValidationFailed(errors)) =
            grant.check_file("image/jpeg", 8 * 1024 * 1024)
        else {
            unreachable!("8MB must be refused");
        };
        assert_eq!(errors.get("file"), Some("File size 8MB exceeds maximum 5MB"));
    }
}
