//! Coordinator configuration.
//!
//! Assembled once at startup and passed by reference. Nothing in this crate
//! reads the environment.

use crate::error::{BookingError, Result};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// What the rate limiter does when the store cannot answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RateLimitFailurePolicy {
    /// Admit the request. The limiter is then a courtesy throttle, not a
    /// security boundary.
    #[default]
    FailOpen,
    /// Reject the request with [`BookingError::StoreUnavailable`].
    FailClosed,
}

impl fmt::Display for RateLimitFailurePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::FailOpen => "open",
            Self::FailClosed => "closed",
        })
    }
}

impl FromStr for RateLimitFailurePolicy {
    type Err = BookingError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "open" | "fail_open" => Ok(Self::FailOpen),
            "closed" | "fail_closed" => Ok(Self::FailClosed),
            other => Err(BookingError::InvalidConfig(format!(
                "unknown rate limit failure policy: {other}"
            ))),
        }
    }
}

/// Request budget for one identifier over a fixed window.
///
/// A non-positive `limit` is legal and rejects every request. A non-positive
/// window is refused at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitRule {
    limit: i64,
    window_ms: i64,
}

impl RateLimitRule {
    /// Create a rule admitting `limit` requests per `window_ms` milliseconds.
    ///
    /// # Errors
    ///
    /// Returns [`BookingError::InvalidConfig`] if `window_ms <= 0`.
    ///
    /// # Examples
    ///
    /// ```
    /// use booking_coordinator::config::RateLimitRule;
    ///
    /// let rule = RateLimitRule::new(3, 60_000).unwrap();
    /// assert_eq!(rule.limit(), 3);
    /// assert!(RateLimitRule::new(3, 0).is_err());
    /// ```
    pub fn new(limit: i64, window_ms: i64) -> Result<Self> {
        if window_ms <= 0 {
            return Err(BookingError::InvalidConfig(format!(
                "rate limit window must be positive, got {window_ms}ms"
            )));
        }
        Ok(Self { limit, window_ms })
    }

    /// Maximum admitted requests per window.
    #[must_use]
    pub const fn limit(&self) -> i64 {
        self.limit
    }

    /// Window length in milliseconds.
    #[must_use]
    pub const fn window_ms(&self) -> i64 {
        self.window_ms
    }

    /// Window length as a duration.
    #[must_use]
    #[allow(clippy::cast_sign_loss)] // window_ms > 0 is checked in `new`
    pub const fn window(&self) -> Duration {
        Duration::from_millis(self.window_ms as u64)
    }
}

impl Default for RateLimitRule {
    /// Booking submissions: 3 per minute.
    fn default() -> Self {
        Self {
            limit: 3,
            window_ms: 60_000,
        }
    }
}

/// Tunables shared by every coordinator mechanism.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoordinatorConfig {
    /// Wizard session lifetime.
    ///
    /// Default: 30 minutes
    pub session_ttl: Duration,

    /// Upload token lifetime.
    ///
    /// Default: 1 hour
    pub upload_token_ttl: Duration,

    /// Availability cache lifetime.
    ///
    /// Default: 5 minutes
    pub availability_ttl: Duration,

    /// Upper bound on any single store call.
    ///
    /// Default: 500 ms
    pub store_timeout: Duration,

    /// Compare-and-swap attempts before the limiter gives up on a hot key.
    ///
    /// Default: 8
    pub cas_retries: u32,

    /// Limiter behavior when the store is unreachable.
    ///
    /// Default: fail open
    pub failure_policy: RateLimitFailurePolicy,

    /// Budget for booking submissions per client address.
    ///
    /// Default: 3 per 60 s
    pub booking_rule: RateLimitRule,
}

impl CoordinatorConfig {
    /// Configuration with default values.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            session_ttl: Duration::from_secs(1800),
            upload_token_ttl: Duration::from_secs(3600),
            availability_ttl: Duration::from_secs(300),
            store_timeout: Duration::from_millis(500),
            cas_retries: 8,
            failure_policy: RateLimitFailurePolicy::FailOpen,
            booking_rule: RateLimitRule {
                limit: 3,
                window_ms: 60_000,
            },
        }
    }

    /// Set session lifetime.
    #[must_use]
    pub const fn with_session_ttl(mut self, ttl: Duration) -> Self {
        self.session_ttl = ttl;
        self
    }

    /// Set upload token lifetime.
    #[must_use]
    pub const fn with_upload_token_ttl(mut self, ttl: Duration) -> Self {
        self.upload_token_ttl = ttl;
        self
    }

    /// Set availability cache lifetime.
    #[must_use]
    pub const fn with_availability_ttl(mut self, ttl: Duration) -> Self {
        self.availability_ttl = ttl;
        self
    }

    /// Set per-call store timeout.
    #[must_use]
    pub const fn with_store_timeout(mut self, timeout: Duration) -> Self {
        self.store_timeout = timeout;
        self
    }

    /// Set compare-and-swap retry budget.
    #[must_use]
    pub const fn with_cas_retries(mut self, retries: u32) -> Self {
        self.cas_retries = retries;
        self
    }

    /// Set limiter failure policy.
    #[must_use]
    pub const fn with_failure_policy(mut self, policy: RateLimitFailurePolicy) -> Self {
        self.failure_policy = policy;
        self
    }

    /// Set the default booking submission budget.
    #[must_use]
    pub const fn with_booking_rule(mut self, rule: RateLimitRule) -> Self {
        self.booking_rule = rule;
        self
    }
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)] // Test code
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = CoordinatorConfig::default();
        assert_eq!(config.session_ttl, Duration::from_secs(1800));
        assert_eq!(config.upload_token_ttl, Duration::from_secs(3600));
        assert_eq!(config.availability_ttl, Duration::from_secs(300));
        assert_eq!(config.failure_policy, RateLimitFailurePolicy::FailOpen);
        assert_eq!(config.booking_rule, RateLimitRule::new(3, 60_000).unwrap());
    }

    #[test]
    fn test_builder() {
        let config = CoordinatorConfig::new()
            .with_store_timeout(Duration::from_millis(50))
            .with_cas_retries(2)
            .with_failure_policy(RateLimitFailurePolicy::FailClosed);
        assert_eq!(config.store_timeout, Duration::from_millis(50));
        assert_eq!(config.cas_retries, 2);
        assert_eq!(config.failure_policy, RateLimitFailurePolicy::FailClosed);
    }

    #[test]
    fn test_rule_rejects_non_positive_window() {
        assert!(matches!(
            RateLimitRule::new(3, 0),
            Err(BookingError::InvalidConfig(_))
        ));
        assert!(RateLimitRule::new(3, -1).is_err());
        assert!(RateLimitRule::new(0, 1000).is_ok());
        assert!(RateLimitRule::new(-5, 1000).is_ok());
    }

    #[test]
    fn test_policy_parse() {
        assert_eq!("open".parse(), Ok(RateLimitFailurePolicy::FailOpen));
        assert_eq!(" Closed ".parse(), Ok(RateLimitFailurePolicy::FailClosed));
        assert!("maybe".parse::<RateLimitFailurePolicy>().is_err());
    }
}
