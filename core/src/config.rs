//! Client configuration.
//!
//! `ClientConfig` is immutable once handed to `ApiClient`. Values come either
//! from code (`ClientConfig::new` plus the `with_*` setters) or from the
//! process environment via `from_env`.

use std::time::Duration;

use crate::error::ApiError;

pub const DEFAULT_BASE_URL: &str = "http://localhost:5000";
pub const DEFAULT_MAX_RETRIES: u32 = 1;
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_millis(500);
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

pub const ENV_BASE_URL: &str = "CONSOLE_API_BASE_URL";
pub const ENV_MAX_RETRIES: &str = "CONSOLE_API_MAX_RETRIES";
pub const ENV_RETRY_DELAY: &str = "CONSOLE_API_RETRY_DELAY";
pub const ENV_TIMEOUT: &str = "CONSOLE_API_TIMEOUT";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub base_url: String,
    /// Additional attempts allowed after a 401.
    pub max_retries: u32,
    /// Pause before re-acquiring a token and resending after a 401.
    pub retry_delay: Duration,
    /// Upper bound on a single attempt, connect to last body byte.
    pub timeout: Duration,
}

impl ClientConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            max_retries: DEFAULT_MAX_RETRIES,
            retry_delay: DEFAULT_RETRY_DELAY,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn with_retry_delay(mut self, retry_delay: Duration) -> Self {
        self.retry_delay = retry_delay;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Read configuration from `CONSOLE_API_*` environment variables.
    pub fn from_env() -> Result<Self, ApiError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a configuration from an arbitrary key lookup. Missing keys fall
    /// back to the defaults; present but malformed values are errors.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ApiError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::new(lookup(ENV_BASE_URL).unwrap_or_else(|| DEFAULT_BASE_URL.to_string()));

        if let Some(raw) = lookup(ENV_MAX_RETRIES) {
            config.max_retries = raw.trim().parse().map_err(|e| {
                ApiError::Configuration(format!("{ENV_MAX_RETRIES}={raw:?}: {e}"))
            })?;
        }
        if let Some(raw) = lookup(ENV_RETRY_DELAY) {
            config.retry_delay = parse_duration(ENV_RETRY_DELAY, &raw)?;
        }
        if let Some(raw) = lookup(ENV_TIMEOUT) {
            config.timeout = parse_duration(ENV_TIMEOUT, &raw)?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Reject configurations the client cannot work with.
    pub fn validate(&self) -> Result<(), ApiError> {
        if self.base_url.trim().is_empty() {
            return Err(ApiError::Configuration("base URL must not be empty".to_string()));
        }
        if self.timeout.is_zero() {
            return Err(ApiError::Configuration("timeout must be greater than zero".to_string()));
        }
        Ok(())
    }
}

fn parse_duration(key: &str, raw: &str) -> Result<Duration, ApiError> {
    humantime::parse_duration(raw.trim())
        .map_err(|e| ApiError::Configuration(format!("{key}={raw:?}: {e}")))
}
