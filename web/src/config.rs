//! Configuration for the booking server.
//!
//! Loaded once at startup from environment variables (after `.env`, if any,
//! has been applied) and shared behind an `Arc`. Nothing re-reads the
//! environment afterwards.

use booking_coordinator::config::{CoordinatorConfig, RateLimitFailurePolicy, RateLimitRule};
use booking_coordinator::submission::{BankDetails, DEFAULT_BRANDS};
use booking_coordinator::{BookingError, Result};
use std::collections::BTreeMap;
use std::env;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Application configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP server configuration
    pub server: ServerConfig,
    /// Ephemeral store configuration
    pub store: StoreConfig,
    /// Booking rate limit configuration
    pub rate_limit: RateLimitConfig,
    /// Accepted brand slugs
    pub brands: Vec<String>,
    /// Admin credentials
    pub admin: AdminConfig,
    /// Transfer instructions shown after submission
    pub bank: BankDetails,
}

/// HTTP server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Server host
    pub host: String,
    /// Server port
    pub port: u16,
    /// Log level
    pub log_level: String,
}

/// Ephemeral store configuration.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Redis URL; the in-memory store is used when unset
    pub redis_url: Option<String>,
    /// Prefix applied to every Redis key
    pub key_prefix: String,
    /// Upper bound on a single store call
    pub timeout_ms: u64,
}

/// Booking rate limit configuration.
#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    /// Attempts per window for brands without an override
    pub limit: i64,
    /// Window length in milliseconds
    pub window_ms: i64,
    /// Per-brand attempt limits
    pub brand_limits: BTreeMap<String, i64>,
    /// What to do when the store cannot be reached
    pub failure_policy: RateLimitFailurePolicy,
}

/// Admin Basic credentials.
#[derive(Clone)]
pub struct AdminConfig {
    /// Admin username
    pub username: String,
    /// Admin password
    pub password: String,
}

impl fmt::Debug for AdminConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AdminConfig")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

fn parsed<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<T> {
    lookup(key).and_then(|s| s.trim().parse().ok())
}

fn text(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: &str) -> String {
    lookup(key)
        .filter(|s| !s.trim().is_empty())
        .unwrap_or_else(|| default.to_string())
}

/// Name of the per-brand limit variable, e.g. `BOOKING_RATE_LIMIT_PUFFY`.
fn brand_limit_key(brand: &str) -> String {
    format!(
        "BOOKING_RATE_LIMIT_{}",
        brand.to_uppercase().replace('-', "_")
    )
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns [`BookingError::InvalidConfig`] when the rate limit window is
    /// not positive, the failure policy is unknown, or no brand is configured.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through `lookup` instead of the process environment.
    ///
    /// # Errors
    ///
    /// Same as [`from_env`](Self::from_env).
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let brands: Vec<String> = lookup("BRANDS")
            .map(|s| {
                s.split(',')
                    .map(|b| b.trim().to_lowercase())
                    .filter(|b| !b.is_empty())
                    .collect()
            })
            .unwrap_or_else(|| DEFAULT_BRANDS.iter().map(ToString::to_string).collect());
        if brands.is_empty() {
            return Err(BookingError::InvalidConfig(
                "BRANDS must name at least one brand".to_string(),
            ));
        }

        let failure_policy = match lookup("RATE_LIMIT_FAILURE_POLICY") {
            Some(raw) => raw.parse()?,
            None => RateLimitFailurePolicy::default(),
        };

        let brand_limits = brands
            .iter()
            .filter_map(|brand| {
                parsed::<i64>(&lookup, &brand_limit_key(brand)).map(|limit| (brand.clone(), limit))
            })
            .collect();

        let config = Self {
            server: ServerConfig {
                host: text(&lookup, "HOST", "0.0.0.0"),
                port: parsed(&lookup, "PORT").unwrap_or(8080),
                log_level: text(&lookup, "RUST_LOG", "info"),
            },
            store: StoreConfig {
                redis_url: lookup("REDIS_URL").filter(|s| !s.trim().is_empty()),
                key_prefix: text(&lookup, "REDIS_KEY_PREFIX", "booking:"),
                timeout_ms: parsed(&lookup, "STORE_TIMEOUT_MS").unwrap_or(500),
            },
            rate_limit: RateLimitConfig {
                limit: parsed(&lookup, "BOOKING_RATE_LIMIT").unwrap_or(3),
                window_ms: parsed(&lookup, "BOOKING_RATE_WINDOW_MS").unwrap_or(60_000),
                brand_limits,
                failure_policy,
            },
            brands,
            admin: AdminConfig {
                username: text(&lookup, "ADMIN_USERNAME", "admin"),
                password: text(&lookup, "ADMIN_PASSWORD", "admin123"),
            },
            bank: {
                let default = BankDetails::default();
                BankDetails {
                    name: text(&lookup, "BANK_NAME", &default.name),
                    account_name: text(&lookup, "BANK_ACCOUNT_NAME", &default.account_name),
                    account_number: text(&lookup, "BANK_ACCOUNT_NUMBER", &default.account_number),
                }
            },
        };

        // Surface a bad window now rather than on the first submission.
        config.default_rule()?;
        config.brand_rules()?;
        Ok(config)
    }

    /// Rule for brands without an override.
    ///
    /// # Errors
    ///
    /// Returns [`BookingError::InvalidConfig`] when the window is not positive.
    pub fn default_rule(&self) -> Result<RateLimitRule> {
        RateLimitRule::new(self.rate_limit.limit, self.rate_limit.window_ms)
    }

    /// Per-brand overrides, sharing the default window.
    ///
    /// # Errors
    ///
    /// Returns [`BookingError::InvalidConfig`] when the window is not positive.
    pub fn brand_rules(&self) -> Result<Vec<(String, RateLimitRule)>> {
        self.rate_limit
            .brand_limits
            .iter()
            .map(|(brand, limit)| {
                RateLimitRule::new(*limit, self.rate_limit.window_ms).map(|rule| (brand.clone(), rule))
            })
            .collect()
    }

    /// Coordinator settings derived from this configuration.
    ///
    /// # Errors
    ///
    /// Returns [`BookingError::InvalidConfig`] when the window is not positive.
    pub fn coordinator(&self) -> Result<CoordinatorConfig> {
        Ok(CoordinatorConfig::new()
            .with_store_timeout(Duration::from_millis(self.store.timeout_ms))
            .with_failure_policy(self.rate_limit.failure_policy)
            .with_booking_rule(self.default_rule()?))
    }

    /// `host:port` the server binds to.
    #[must_use]
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)] // Test code
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<Config> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = load(&[]).unwrap();

        assert_eq!(config.bind_address(), "0.0.0.0:8080");
        assert_eq!(config.server.log_level, "info");
        assert!(config.store.redis_url.is_none());
        assert_eq!(config.store.timeout_ms, 500);
        assert_eq!(config.brands, vec!["puffy", "lava", "indomie"]);
        assert_eq!(config.admin.username, "admin");
        assert_eq!(config.admin.password, "admin123");
        assert_eq!(config.bank, BankDetails::default());
        assert_eq!(config.rate_limit.failure_policy, RateLimitFailurePolicy::FailOpen);

        let rule = config.default_rule().unwrap();
        assert_eq!(rule.limit(), 3);
        assert_eq!(rule.window_ms(), 60_000);
        assert!(config.brand_rules().unwrap().is_empty());
    }

    #[test]
    fn test_overrides() {
        let config = load(&[
            ("PORT", "3000"),
            ("REDIS_URL", "redis://cache:6379"),
            ("BRANDS", "Puffy, lava ,new-brand"),
            ("BOOKING_RATE_LIMIT", "5"),
            ("BOOKING_RATE_LIMIT_NEW_BRAND", "10"),
            ("RATE_LIMIT_FAILURE_POLICY", "closed"),
            ("BANK_NAME", "Mandiri"),
        ])
        .unwrap();

        assert_eq!(config.server.port, 3000);
        assert_eq!(config.store.redis_url.as_deref(), Some("redis://cache:6379"));
        assert_eq!(config.brands, vec!["puffy", "lava", "new-brand"]);
        assert_eq!(config.default_rule().unwrap().limit(), 5);
        assert_eq!(config.rate_limit.failure_policy, RateLimitFailurePolicy::FailClosed);
        assert_eq!(config.bank.name, "Mandiri");
        assert_eq!(config.bank.account_name, "PT Talazar Group");

        let overrides = config.brand_rules().unwrap();
        assert_eq!(overrides.len(), 1);
        assert_eq!(overrides[0].0, "new-brand");
        assert_eq!(overrides[0].1.limit(), 10);

        let coordinator = config.coordinator().unwrap();
        assert_eq!(coordinator.failure_policy, RateLimitFailurePolicy::FailClosed);
        assert_eq!(coordinator.booking_rule.limit(), 5);
    }

    #[test]
    fn test_invalid_values_fail_fast() {
        assert!(matches!(
            load(&[("BOOKING_RATE_WINDOW_MS", "0")]),
            Err(BookingError::InvalidConfig(_))
        ));
        assert!(matches!(
            load(&[("RATE_LIMIT_FAILURE_POLICY", "sometimes")]),
            Err(BookingError::InvalidConfig(_))
        ));
        assert!(matches!(
            load(&[("BRANDS", " , ")]),
            Err(BookingError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_debug_redacts_password() {
        let config = load(&[("ADMIN_PASSWORD", "hunter2")]).unwrap();
        let debug = format!("{:?}", config.admin);
        assert!(!debug.contains("hunter2"));
    }
}
