//! Client configuration.

use std::{fmt::Debug, time::Duration};

use bon::Builder;
use url::Url;

use crate::errors::{ApiError, Result};

pub const DEFAULT_BASE_URL: &str = "https://api.licensechain.app";

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Number of retries after the first attempt.
pub const DEFAULT_RETRY_COUNT: u32 = 3;

pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(1);

/// Immutable settings for an API client.
///
/// Build one with [`Configuration::builder`] and derive variants with the
/// `with_*` methods, which return a new value.
///
/// ```
/// use std::time::Duration;
/// use licensechain::config::Configuration;
///
/// let config = Configuration::builder()
///     .api_key("lc_live_key")
///     .base_url("https://api.example.com/")
///     .build()
///     .with_timeout(Duration::from_secs(5));
///
/// assert!(config.validate().is_ok());
/// assert_eq!(config.base_url(), "https://api.example.com");
/// assert_eq!(config.retry_count, 3);
/// assert!(!format!("{config:?}").contains("lc_live_key"));
/// ```
#[derive(Builder, Clone)]
pub struct Configuration {
    /// Bearer credential sent with every request.
    #[builder(into)]
    pub api_key: String,

    #[builder(into, default = DEFAULT_BASE_URL.to_string())]
    pub base_url: String,

    /// Per-request timeout.
    #[builder(default = DEFAULT_TIMEOUT)]
    pub timeout: Duration,

    /// Retries after the first attempt for retryable failures.
    #[builder(default = DEFAULT_RETRY_COUNT)]
    pub retry_count: u32,

    /// Delay before the first retry; doubled for each following retry.
    #[builder(default = DEFAULT_RETRY_DELAY)]
    pub retry_delay: Duration,
}

impl Configuration {
    /// Configuration with defaults for everything but the key.
    pub fn new(api_key: impl Into<String>) -> Self {
        Configuration::builder().api_key(api_key).build()
    }

    /// Base URL without trailing slashes.
    pub fn base_url(&self) -> &str {
        self.base_url.trim_end_matches('/')
    }

    /// Checks that the key is present and the base URL is an absolute http(s) URL.
    pub fn validate(&self) -> Result<()> {
        if self.api_key.trim().is_empty() {
            return Err(ApiError::validation("API key is required"));
        }

        let parsed = Url::parse(self.base_url())
            .map_err(|e| ApiError::validation(format!("Invalid base URL: {e}")))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(ApiError::validation(format!(
                "Invalid base URL scheme: {}",
                parsed.scheme()
            )));
        }

        if self.timeout.is_zero() {
            return Err(ApiError::validation("Timeout must be positive"));
        }

        Ok(())
    }

    pub fn with_api_key(self, api_key: impl Into<String>) -> Self {
        Configuration {
            api_key: api_key.into(),
            ..self
        }
    }

    pub fn with_base_url(self, base_url: impl Into<String>) -> Self {
        Configuration {
            base_url: base_url.into(),
            ..self
        }
    }

    pub fn with_timeout(self, timeout: Duration) -> Self {
        Configuration { timeout, ..self }
    }

    pub fn with_retry_count(self, retry_count: u32) -> Self {
        Configuration {
            retry_count,
            ..self
        }
    }

    pub fn with_retry_delay(self, retry_delay: Duration) -> Self {
        Configuration {
            retry_delay,
            ..self
        }
    }
}

impl Debug for Configuration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Configuration")
            .field("api_key", &"<redacted>")
            .field("base_url", &self.base_url)
            .field("timeout", &self.timeout)
            .field("retry_count", &self.retry_count)
            .field("retry_delay", &self.retry_delay)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ErrorKind;

    #[test]
    fn test_defaults() {
        let config = Configuration::new("key");
        assert_eq!(config.base_url(), DEFAULT_BASE_URL);
        assert_eq!(config.timeout, Duration::from_secs(30));
        assert_eq!(config.retry_count, 3);
        assert_eq!(config.retry_delay, Duration::from_secs(1));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_missing_key_is_rejected() {
        let err = Configuration::new("  ").validate().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert_eq!(err.message(), "API key is required");
    }

    #[test]
    fn test_invalid_base_url_is_rejected() {
        let config = Configuration::new("key").with_base_url("not a url");
        assert_eq!(config.validate().unwrap_err().kind(), ErrorKind::Validation);

        let config = Configuration::new("key").with_base_url("ftp://example.com");
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_with_setters_return_new_values() {
        let original = Configuration::new("key");
        let changed = original
            .clone()
            .with_retry_count(0)
            .with_retry_delay(Duration::from_millis(10))
            .with_base_url("http://localhost:8080///");

        assert_eq!(original.retry_count, 3);
        assert_eq!(changed.retry_count, 0);
        assert_eq!(changed.retry_delay, Duration::from_millis(10));
        assert_eq!(changed.base_url(), "http://localhost:8080");
    }
}
