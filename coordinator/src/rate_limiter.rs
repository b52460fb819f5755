//! Fixed-window rate limiter.
//!
//! # Algorithm
//!
//! One record per identifier: `{count, window_start}`.
//!
//! 1. No record, or `now - window_start >= window`: start a fresh window with
//!    `count = 1`, expiring when the window closes.
//! 2. `count >= limit`: reject without writing.
//! 3. Otherwise increment and write.
//!
//! Every write is a compare-and-swap against the bytes that were read, retried
//! on conflict, so two requests landing in the same millisecond cannot both
//! increment from the same count.
//!
//! # Failure policy
//!
//! When the store is unreachable (or the retry budget runs out on a hot key)
//! the limiter follows [`RateLimitFailurePolicy`]. The default fails open: the
//! request is admitted and a warning logged.

use crate::clock::Clock;
use crate::config::{CoordinatorConfig, RateLimitFailurePolicy, RateLimitRule};
use crate::error::{BookingError, Result, StoreError, StoreResult};
use crate::providers::{EphemeralStore, decode, encode};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

/// Outcome of one admission check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RateDecision {
    /// Whether the request may proceed.
    pub allowed: bool,
    /// Requests left in the current window.
    pub remaining: i64,
    /// When the current window closes.
    pub reset_time: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
struct RateWindow {
    count: i64,
    window_start_ms: i64,
}

fn window_end(start_ms: i64, window_ms: i64) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(start_ms.saturating_add(window_ms))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

/// Per-identifier request admission over an [`EphemeralStore`].
#[derive(Clone)]
pub struct RateLimiter {
    store: Arc<dyn EphemeralStore>,
    clock: Arc<dyn Clock>,
    policy: RateLimitFailurePolicy,
    max_attempts: u32,
}

impl RateLimiter {
    /// Create a limiter using the failure policy and retry budget from `config`.
    #[must_use]
    pub fn new(
        store: Arc<dyn EphemeralStore>,
        clock: Arc<dyn Clock>,
        config: &CoordinatorConfig,
    ) -> Self {
        Self {
            store,
            clock,
            policy: config.failure_policy,
            max_attempts: config.cas_retries.max(1),
        }
    }

    /// Configured failure policy.
    #[must_use]
    pub const fn policy(&self) -> RateLimitFailurePolicy {
        self.policy
    }

    fn key(identifier: &str) -> String {
        format!("rate_limit:{identifier}")
    }

    /// Check and count one request for `identifier`.
    ///
    /// # Errors
    ///
    /// Only under [`RateLimitFailurePolicy::FailClosed`]: returns
    /// [`BookingError::StoreUnavailable`] when the store cannot answer.
    pub async fn allow(&self, identifier: &str, rule: &RateLimitRule) -> Result<RateDecision> {
        let now = self.clock.now();

        if rule.limit() <= 0 {
            tracing::warn!(identifier = %identifier, "Rate limit is zero, rejecting");
            return Ok(RateDecision {
                allowed: false,
                remaining: 0,
                reset_time: window_end(now.timestamp_millis(), rule.window_ms()),
            });
        }

        match self.try_allow(&Self::key(identifier), rule).await {
            Ok(decision) => {
                if decision.allowed {
                    tracing::debug!(
                        identifier = %identifier,
                        remaining = decision.remaining,
                        "Rate limit check passed"
                    );
                } else {
                    tracing::warn!(
                        identifier = %identifier,
                        limit = rule.limit(),
                        reset_time = %decision.reset_time,
                        "Rate limit exceeded"
                    );
                }
                Ok(decision)
            }
            Err(err) => match self.policy {
                // Availability over strictness: an unreachable store must not
                // block bookings. This limiter is a courtesy throttle only.
                RateLimitFailurePolicy::FailOpen => {
                    tracing::warn!(
                        identifier = %identifier,
                        error = %err,
                        "Rate limiter store failed, failing open"
                    );
                    Ok(RateDecision {
                        allowed: true,
                        remaining: rule.limit() - 1,
                        reset_time: window_end(now.timestamp_millis(), rule.window_ms()),
                    })
                }
                RateLimitFailurePolicy::FailClosed => {
                    tracing::error!(
                        identifier = %identifier,
                        error = %err,
                        "Rate limiter store failed, failing closed"
                    );
                    Err(err.into())
                }
            },
        }
    }

    /// Like [`allow`](Self::allow), but a rejection becomes an error.
    ///
    /// # Errors
    ///
    /// - [`BookingError::RateLimited`] when the window is exhausted.
    /// - [`BookingError::StoreUnavailable`] under the fail-closed policy.
    pub async fn enforce(&self, identifier: &str, rule: &RateLimitRule) -> Result<RateDecision> {
        let decision = self.allow(identifier, rule).await?;
        if decision.allowed {
            return Ok(decision);
        }

        metrics::counter!("booking_rate_limited_total").increment(1);
        let retry_after = (decision.reset_time - self.clock.now())
            .to_std()
            .unwrap_or(Duration::ZERO);
        Err(BookingError::RateLimited {
            reset_at: decision.reset_time,
            retry_after,
        })
    }

    /// Forget the current window for `identifier`.
    ///
    /// # Errors
    ///
    /// Returns [`BookingError::StoreUnavailable`] if the store cannot be reached.
    pub async fn reset(&self, identifier: &str) -> Result<()> {
        self.store.delete(&Self::key(identifier)).await?;
        tracing::info!(identifier = %identifier, "Rate limit reset");
        Ok(())
    }

    async fn try_allow(&self, key: &str, rule: &RateLimitRule) -> StoreResult<RateDecision> {
        let limit = rule.limit();
        let window_ms = rule.window_ms();

        for attempt in 1..=self.max_attempts {
            let current = self.store.get(key).await?;
            let now_ms = self.clock.now().timestamp_millis();

            let window = current.as_deref().and_then(|bytes| {
                decode::<RateWindow>(bytes)
                    .inspect_err(|e| {
                        tracing::warn!(key = %key, error = %e, "Discarding unreadable rate window");
                    })
                    .ok()
            });

            let next = match window {
                Some(open) if now_ms.saturating_sub(open.window_start_ms) < window_ms => {
                    if open.count >= limit {
                        return Ok(RateDecision {
                            allowed: false,
                            remaining: 0,
                            reset_time: window_end(open.window_start_ms, window_ms),
                        });
                    }
                    RateWindow {
                        count: open.count + 1,
                        ..open
                    }
                }
                _ => RateWindow {
                    count: 1,
                    window_start_ms: now_ms,
                },
            };

            let ttl_ms = next
                .window_start_ms
                .saturating_add(window_ms)
                .saturating_sub(now_ms);
            let ttl = Duration::from_millis(u64::try_from(ttl_ms).unwrap_or(1).max(1));

            if self
                .store
                .compare_and_swap(key, current.as_deref(), encode(&next)?, ttl)
                .await?
            {
                return Ok(RateDecision {
                    allowed: true,
                    remaining: limit - next.count,
                    reset_time: window_end(next.window_start_ms, window_ms),
                });
            }

            tracing::debug!(key = %key, attempt = attempt, "Rate window changed underneath, retrying");
        }

        Err(StoreError::Contention)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)] // Test code
mod tests {
    use super::*;
    use crate::mocks::{ManualClock, UnavailableStore};
    use crate::stores::MemoryStore;
    use chrono::TimeZone;

    fn limiter(config: &CoordinatorConfig) -> (RateLimiter, Arc<ManualClock>, MemoryStore) {
        let clock = Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2026, 6, 1, 8, 0, 0).unwrap(),
        ));
        let store = MemoryStore::with_clock(clock.clone());
        (
            RateLimiter::new(Arc::new(store.clone()), clock.clone(), config),
            clock,
            store,
        )
    }

    fn rule(limit: i64) -> RateLimitRule {
        RateLimitRule::new(limit, 60_000).unwrap()
    }

    #[tokio::test]
    async fn test_three_per_minute() {
        let (limiter, clock, _) = limiter(&CoordinatorConfig::default());
        let start = clock.now();

        for expected in [2, 1, 0] {
            let decision = limiter.allow("ip:1.2.3.4", &rule(3)).await.unwrap();
            assert!(decision.allowed);
            assert_eq!(decision.remaining, expected);
            assert_eq!(decision.reset_time, start + chrono::Duration::seconds(60));
        }

        clock.advance(chrono::Duration::seconds(30));
        let decision = limiter.allow("ip:1.2.3.4", &rule(3)).await.unwrap();
        assert!(!decision.allowed);
        assert_eq!(decision.remaining, 0);
        assert_eq!(decision.reset_time, start + chrono::Duration::seconds(60));
    }

    #[tokio::test]
    async fn test_window_rolls_over() {
        let (limiter, clock, _) = limiter(&CoordinatorConfig::default());
        for _ in 0..3 {
            limiter.allow("ip", &rule(3)).await.unwrap();
        }
        assert!(!limiter.allow("ip", &rule(3)).await.unwrap().allowed);

        clock.advance(chrono::Duration::seconds(60));
        let decision = limiter.allow("ip", &rule(3)).await.unwrap();
        assert!(decision.allowed);
        assert_eq!(decision.remaining, 2);
    }

    #[tokio::test]
    async fn test_corrupt_window_start_opens_fresh_window() {
        let (limiter, clock, store) = limiter(&CoordinatorConfig::default());
        let corrupt = RateWindow {
            count: 3,
            window_start_ms: i64::MIN,
        };
        store
            .set("rate_limit:ip", encode(&corrupt).unwrap(), Duration::from_secs(60))
            .await
            .unwrap();

        let decision = limiter.allow("ip", &rule(3)).await.unwrap();
        assert!(decision.allowed);
        assert_eq!(decision.remaining, 2);
        assert_eq!(decision.reset_time, clock.now() + chrono::Duration::seconds(60));
    }

    #[tokio::test]
    async fn test_identifiers_are_independent() {
        let (limiter, _, _) = limiter(&CoordinatorConfig::default());
        assert!(limiter.allow("a", &rule(1)).await.unwrap().allowed);
        assert!(!limiter.allow("a", &rule(1)).await.unwrap().allowed);
        assert!(limiter.allow("b", &rule(1)).await.unwrap().allowed);
    }

    #[tokio::test]
    async fn test_non_positive_limit_rejects_without_touching_store() {
        let (limiter, _, store) = limiter(&CoordinatorConfig::default());
        for limit in [0, -3] {
            let decision = limiter.allow("ip", &rule(limit)).await.unwrap();
            assert!(!decision.allowed);
            assert_eq!(decision.remaining, 0);
        }
        assert!(store.is_empty().unwrap());
    }

    #[tokio::test]
    async fn test_fails_open_by_default() {
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let limiter = RateLimiter::new(
            Arc::new(UnavailableStore),
            clock,
            &CoordinatorConfig::default(),
        );

        let decision = limiter.allow("ip", &rule(3)).await.unwrap();
        assert!(decision.allowed);
        assert_eq!(decision.remaining, 2);
    }

    #[tokio::test]
    async fn test_fail_closed_surfaces_unavailable() {
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let config =
            CoordinatorConfig::default().with_failure_policy(RateLimitFailurePolicy::FailClosed);
        let limiter = RateLimiter::new(Arc::new(UnavailableStore), clock, &config);

        assert!(matches!(
            limiter.allow("ip", &rule(3)).await,
            Err(BookingError::StoreUnavailable(_))
        ));
    }

    #[tokio::test]
    async fn test_enforce_reports_retry_after() {
        let (limiter, clock, _) = limiter(&CoordinatorConfig::default());
        limiter.enforce("ip", &rule(1)).await.unwrap();

        clock.advance(chrono::Duration::seconds(45));
        let err = limiter.enforce("ip", &rule(1)).await.unwrap_err();
        let BookingError::RateLimited { retry_after, .. } = err else {
            unreachable!("expected RateLimited, got {err:?}");
        };
        assert_eq!(retry_after, Duration::from_secs(15));
    }

    #[tokio::test]
    async fn test_reset_clears_window() {
        let (limiter, _, _) = limiter(&CoordinatorConfig::default());
        limiter.allow("ip", &rule(1)).await.unwrap();
        assert!(!limiter.allow("ip", &rule(1)).await.unwrap().allowed);

        limiter.reset("ip").await.unwrap();
        assert!(limiter.allow("ip", &rule(1)).await.unwrap().allowed);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_requests_never_exceed_limit() {
        let (limiter, _, _) = limiter(
            &CoordinatorConfig::default().with_failure_policy(RateLimitFailurePolicy::FailClosed),
        );

        let handles: Vec<_> = (0..32)
            .map(|_| {
                let limiter = limiter.clone();
                tokio::spawn(async move { limiter.allow("hot", &rule(5)).await.unwrap().allowed })
            })
            .collect();

        let mut admitted = 0;
        for handle in handles {
            if handle.await.unwrap() {
                admitted += 1;
            }
        }
        assert_eq!(admitted, 5);
    }
}
