//! Storefront configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! All optional:
//! - `YOUSHOP_API_URL` - Backend REST API base URL (default: `http://localhost:3000/api`)
//! - `YOUSHOP_API_TIMEOUT_MS` - Per-request timeout (default: 10000)
//! - `YOUSHOP_RETRY_ATTEMPTS` - Attempts for retryable idempotent calls (default: 3)
//! - `YOUSHOP_RETRY_DELAY_MS` - Base retry delay, multiplied by the attempt number (default: 1000)
//! - `YOUSHOP_CATALOG_CACHE_TTL_SECS` - Product/category cache lifetime (default: 300)
//! - `YOUSHOP_STORAGE_DIR` - Directory for persisted tokens, cart and orders

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;
use url::Url;

/// Default backend base URL.
pub const DEFAULT_API_URL: &str = "http://localhost:3000/api";

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Storefront configuration.
#[derive(Debug, Clone)]
pub struct StorefrontConfig {
    /// Backend API settings
    pub api: ApiConfig,
    /// How long catalog lookups stay cached
    pub catalog_cache_ttl: Duration,
    /// Directory for durable storage; `None` keeps state in memory
    pub storage_dir: Option<PathBuf>,
}

/// Backend REST API settings.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Base URL without a trailing slash; request paths are appended to it
    pub base_url: String,
    /// Per-request timeout
    pub timeout: Duration,
    /// Attempts for the retry wrapper (including the first)
    pub retry_attempts: u32,
    /// Base delay for the retry wrapper
    pub retry_delay: Duration,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_API_URL.to_string(),
            timeout: Duration::from_millis(10_000),
            retry_attempts: 3,
            retry_delay: Duration::from_millis(1_000),
        }
    }
}

impl Default for StorefrontConfig {
    fn default() -> Self {
        Self {
            api: ApiConfig::default(),
            catalog_cache_ttl: Duration::from_secs(300),
            storage_dir: None,
        }
    }
}

impl StorefrontConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidEnvVar` if a variable is set but cannot be
    /// parsed.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        Ok(Self {
            api: ApiConfig::from_env()?,
            catalog_cache_ttl: Duration::from_secs(parse_env_or_default(
                "YOUSHOP_CATALOG_CACHE_TTL_SECS",
                300,
            )?),
            storage_dir: get_optional_env("YOUSHOP_STORAGE_DIR").map(PathBuf::from),
        })
    }

    /// Use the given storage directory.
    #[must_use]
    pub fn with_storage_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.storage_dir = Some(dir.into());
        self
    }
}

impl ApiConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let base_url = parse_base_url(&get_env_or_default("YOUSHOP_API_URL", DEFAULT_API_URL))
            .map_err(|e| ConfigError::InvalidEnvVar("YOUSHOP_API_URL".to_string(), e))?;

        let retry_attempts: u32 = parse_env_or_default("YOUSHOP_RETRY_ATTEMPTS", 3)?;
        if retry_attempts == 0 {
            return Err(ConfigError::InvalidEnvVar(
                "YOUSHOP_RETRY_ATTEMPTS".to_string(),
                "must be at least 1".to_string(),
            ));
        }

        Ok(Self {
            base_url,
            timeout: Duration::from_millis(parse_env_or_default("YOUSHOP_API_TIMEOUT_MS", 10_000)?),
            retry_attempts,
            retry_delay: Duration::from_millis(parse_env_or_default(
                "YOUSHOP_RETRY_DELAY_MS",
                1_000,
            )?),
        })
    }

    /// Settings for the given base URL with default timeouts.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidEnvVar` if the URL is not an absolute
    /// http(s) URL.
    pub fn for_base_url(base_url: &str) -> Result<Self, ConfigError> {
        Ok(Self {
            base_url: parse_base_url(base_url)
                .map_err(|e| ConfigError::InvalidEnvVar("YOUSHOP_API_URL".to_string(), e))?,
            ..Self::default()
        })
    }

    /// Full URL for an API path such as `/orders/42`.
    #[must_use]
    pub fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Parse and check a base URL, returning it without a trailing slash.
fn parse_base_url(raw: &str) -> Result<String, String> {
    let url = Url::parse(raw.trim()).map_err(|e| e.to_string())?;
    match url.scheme() {
        "http" | "https" => Ok(url.as_str().trim_end_matches('/').to_string()),
        other => Err(format!("unsupported scheme '{other}'")),
    }
}

/// Get an optional environment variable.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    get_optional_env(key).unwrap_or_else(|| default.to_string())
}

/// Parse an environment variable, falling back to a default when unset.
fn parse_env_or_default<T>(key: &str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    get_optional_env(key).map_or(Ok(default), |raw| {
        raw.trim()
            .parse()
            .map_err(|e: T::Err| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = StorefrontConfig::default();
        assert_eq!(config.api.base_url, "http://localhost:3000/api");
        assert_eq!(config.api.timeout, Duration::from_secs(10));
        assert_eq!(config.api.retry_attempts, 3);
        assert_eq!(config.catalog_cache_ttl, Duration::from_secs(300));
        assert!(config.storage_dir.is_none());
    }

    #[test]
    fn test_endpoint_joins_slashes() {
        let api = ApiConfig::for_base_url("http://shop.test/api/").unwrap();
        assert_eq!(api.endpoint("/orders"), "http://shop.test/api/orders");
        assert_eq!(api.endpoint("auth/login"), "http://shop.test/api/auth/login");
    }

    #[test]
    fn test_parse_base_url_rejects_other_schemes() {
        assert!(parse_base_url("ftp://shop.test").is_err());
        assert!(parse_base_url("not a url").is_err());
        assert!(parse_base_url("https://shop.test/api").is_ok());
    }

    #[test]
    fn test_for_base_url_invalid() {
        let err = ApiConfig::for_base_url("nope").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnvVar(ref key, _) if key == "YOUSHOP_API_URL"));
    }

    #[test]
    fn test_with_storage_dir() {
        let config = StorefrontConfig::default().with_storage_dir("/tmp/ys");
        assert_eq!(config.storage_dir, Some(PathBuf::from("/tmp/ys")));
    }
}
