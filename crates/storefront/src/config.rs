//! Storefront configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! All variables are optional.
//!
//! - `ATELIER_DATA_DIR` - Directory for the file-backed document store (default: `.atelier`)
//! - `ATELIER_REMOTE_TIMEOUT_MS` - Timeout for a single document store call (default: 10000)
//! - `ATELIER_PERSIST_MAX_ATTEMPTS` - Attempts per document store call, including the first (default: 3)
//! - `ATELIER_RETRY_BASE_DELAY_MS` - First retry delay for document store calls (default: 200)
//! - `ATELIER_RETRY_MAX_DELAY_MS` - Upper bound on any retry delay (default: 5000)
//! - `ATELIER_PROVIDER_READY_ATTEMPTS` - Attempts to attach to the identity provider (default: 20)
//! - `ATELIER_PROVIDER_RETRY_DELAY_MS` - Delay between identity provider attempts (default: 100)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Bounded retry with exponential backoff.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first one. Always at least 1.
    pub max_attempts: u32,
    /// Delay before the second attempt.
    pub base_delay: Duration,
    /// Cap applied to every delay.
    pub max_delay: Duration,
}

impl RetryPolicy {
    /// A policy that never retries.
    pub const NONE: Self = Self {
        max_attempts: 1,
        base_delay: Duration::ZERO,
        max_delay: Duration::ZERO,
    };

    /// A policy that retries at a fixed interval.
    #[must_use]
    pub const fn fixed(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts,
            base_delay: delay,
            max_delay: delay,
        }
    }

    /// Delay to wait after the given failed attempt (1-based).
    #[must_use]
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.base_delay.saturating_mul(factor).min(self.max_delay)
    }

    /// Whether another attempt is allowed after `attempt` failures.
    #[must_use]
    pub const fn allows_retry(&self, attempt: u32) -> bool {
        attempt < self.max_attempts
    }
}

/// Settings for calls into the document store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RemoteConfig {
    /// Timeout applied to each individual call.
    pub timeout: Duration,
    /// Retry policy for transient failures.
    pub retry: RetryPolicy,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(10),
            retry: RetryPolicy {
                max_attempts: 3,
                base_delay: Duration::from_millis(200),
                max_delay: Duration::from_secs(5),
            },
        }
    }
}

/// Storefront application configuration.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Directory for the file-backed document store
    pub data_dir: PathBuf,
    /// Document store call settings
    pub remote: RemoteConfig,
    /// Retry policy while the identity provider is initializing
    pub provider_retry: RetryPolicy,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment (e.g., "production", "staging")
    pub sentry_environment: Option<String>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(".atelier"),
            remote: RemoteConfig::default(),
            provider_retry: RetryPolicy::fixed(20, Duration::from_millis(100)),
            sentry_dsn: None,
            sentry_environment: None,
        }
    }
}

impl StoreConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable is set but cannot be parsed.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a present value cannot be parsed.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let env = Env { lookup };

        let remote = RemoteConfig {
            timeout: env.millis("ATELIER_REMOTE_TIMEOUT_MS", defaults.remote.timeout)?,
            retry: RetryPolicy {
                max_attempts: env
                    .parse("ATELIER_PERSIST_MAX_ATTEMPTS", defaults.remote.retry.max_attempts)?
                    .max(1),
                base_delay: env.millis(
                    "ATELIER_RETRY_BASE_DELAY_MS",
                    defaults.remote.retry.base_delay,
                )?,
                max_delay: env.millis("ATELIER_RETRY_MAX_DELAY_MS", defaults.remote.retry.max_delay)?,
            },
        };

        let provider_delay = env.millis(
            "ATELIER_PROVIDER_RETRY_DELAY_MS",
            defaults.provider_retry.base_delay,
        )?;
        let provider_retry = RetryPolicy::fixed(
            env.parse(
                "ATELIER_PROVIDER_READY_ATTEMPTS",
                defaults.provider_retry.max_attempts,
            )?
            .max(1),
            provider_delay,
        );

        Ok(Self {
            data_dir: env
                .optional("ATELIER_DATA_DIR")
                .map_or(defaults.data_dir, PathBuf::from),
            remote,
            provider_retry,
            sentry_dsn: env.optional("SENTRY_DSN"),
            sentry_environment: env.optional("SENTRY_ENVIRONMENT"),
        })
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

struct Env<F> {
    lookup: F,
}

impl<F> Env<F>
where
    F: Fn(&str) -> Option<String>,
{
    /// Get an optional, non-blank variable.
    fn optional(&self, key: &str) -> Option<String> {
        (self.lookup)(key).filter(|v| !v.trim().is_empty())
    }

    /// Parse a variable, falling back to a default when unset.
    fn parse<T>(&self, key: &str, default: T) -> Result<T, ConfigError>
    where
        T: std::str::FromStr,
        T::Err: std::fmt::Display,
    {
        self.optional(key).map_or(Ok(default), |raw| {
            raw.trim()
                .parse::<T>()
                .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
        })
    }

    /// Parse a millisecond duration.
    fn millis(&self, key: &str, default: Duration) -> Result<Duration, ConfigError> {
        let default_ms = u64::try_from(default.as_millis()).unwrap_or(u64::MAX);
        self.parse(key, default_ms).map(Duration::from_millis)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn config_from(pairs: &[(&str, &str)]) -> Result<StoreConfig, ConfigError> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        StoreConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults_when_unset() {
        let config = config_from(&[]).unwrap();
        assert_eq!(config.data_dir, PathBuf::from(".atelier"));
        assert_eq!(config.remote, RemoteConfig::default());
        assert_eq!(config.provider_retry.max_attempts, 20);
        assert!(config.sentry_dsn.is_none());
    }

    #[test]
    fn test_overrides() {
        let config = config_from(&[
            ("ATELIER_DATA_DIR", "/tmp/shop"),
            ("ATELIER_REMOTE_TIMEOUT_MS", "250"),
            ("ATELIER_PERSIST_MAX_ATTEMPTS", "5"),
            ("ATELIER_PROVIDER_RETRY_DELAY_MS", "40"),
            ("SENTRY_DSN", "https://key@sentry.example/1"),
        ])
        .unwrap();
        assert_eq!(config.data_dir, PathBuf::from("/tmp/shop"));
        assert_eq!(config.remote.timeout, Duration::from_millis(250));
        assert_eq!(config.remote.retry.max_attempts, 5);
        assert_eq!(config.provider_retry.base_delay, Duration::from_millis(40));
        assert_eq!(config.provider_retry.max_delay, Duration::from_millis(40));
        assert_eq!(
            config.sentry_dsn.as_deref(),
            Some("https://key@sentry.example/1")
        );
    }

    #[test]
    fn test_zero_attempts_is_clamped() {
        let config = config_from(&[("ATELIER_PERSIST_MAX_ATTEMPTS", "0")]).unwrap();
        assert_eq!(config.remote.retry.max_attempts, 1);
    }

    #[test]
    fn test_invalid_number() {
        let err = config_from(&[("ATELIER_REMOTE_TIMEOUT_MS", "soon")]).unwrap_err();
        assert!(err.to_string().contains("ATELIER_REMOTE_TIMEOUT_MS"));
    }

    #[test]
    fn test_blank_is_unset() {
        let config = config_from(&[("SENTRY_DSN", "  ")]).unwrap();
        assert!(config.sentry_dsn.is_none());
    }

    #[test]
    fn test_backoff_is_capped() {
        let policy = RetryPolicy {
            max_attempts: 10,
            base_delay: Duration::from_millis(100),
            max_delay: Duration::from_millis(350),
        };
        assert_eq!(policy.delay_after(1), Duration::from_millis(100));
        assert_eq!(policy.delay_after(2), Duration::from_millis(200));
        assert_eq!(policy.delay_after(3), Duration::from_millis(350));
        assert!(policy.allows_retry(9));
        assert!(!policy.allows_retry(10));
        assert!(!RetryPolicy::NONE.allows_retry(1));
    }
}
