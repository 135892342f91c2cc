//! Client configuration
//!
//! `ClientConfig` can be built in code or loaded from a YAML/JSON file:
//!
//! ```yaml
//! base_url: https://play.dhis2.org/40
//! username: admin
//! password: district
//! rate_limit_per_second: 100
//! retry:
//!   max_attempts: 5
//! ```

use crate::auth::Credentials;
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;
use url::Url;

// ============================================================================
// Client Config
// ============================================================================

/// Complete client configuration
#[derive(Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Instance URL; `/api/` is appended when missing
    pub base_url: String,

    /// Basic auth username
    pub username: String,

    /// Basic auth password
    pub password: String,

    /// Requests admitted per one-second window
    #[serde(default = "default_rate_limit")]
    pub rate_limit_per_second: u32,

    /// Default per-request timeout in milliseconds
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// TCP connect timeout in seconds
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,

    /// Idle pooled connections kept per host
    #[serde(default = "default_max_idle_connections")]
    pub max_idle_connections: usize,

    /// User agent string
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Retry settings
    #[serde(default)]
    pub retry: RetryConfig,
}

fn default_rate_limit() -> u32 {
    200
}

fn default_timeout_ms() -> u64 {
    30_000
}

fn default_connect_timeout_secs() -> u64 {
    5
}

fn default_max_idle_connections() -> usize {
    200
}

fn default_user_agent() -> String {
    format!("dhis2-client/{}", env!("CARGO_PKG_VERSION"))
}

impl ClientConfig {
    /// Create a config with default settings for the given instance and credentials
    pub fn new(
        base_url: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            base_url: base_url.into(),
            username: username.into(),
            password: password.into(),
            rate_limit_per_second: default_rate_limit(),
            timeout_ms: default_timeout_ms(),
            connect_timeout_secs: default_connect_timeout_secs(),
            max_idle_connections: default_max_idle_connections(),
            user_agent: default_user_agent(),
            retry: RetryConfig::default(),
        }
    }

    /// Parse a config from YAML
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Parse a config from JSON
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a config file; `.json` files are read as JSON, anything else as YAML
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            Error::config(format!(
                "Failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;

        match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => Self::from_json_str(&content),
            _ => Self::from_yaml_str(&content),
        }
    }

    /// Set the rate limit
    #[must_use]
    pub fn with_rate_limit(mut self, per_second: u32) -> Self {
        self.rate_limit_per_second = per_second;
        self
    }

    /// Set the default request timeout (millisecond precision)
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// Set the retry settings
    #[must_use]
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// Set user agent
    #[must_use]
    pub fn with_user_agent(mut self, agent: impl Into<String>) -> Self {
        self.user_agent = agent.into();
        self
    }

    /// Default per-request timeout
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Connect timeout
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    /// Basic auth credentials
    pub fn credentials(&self) -> Credentials {
        Credentials::new(&self.username, &self.password)
    }

    /// Check every setting, failing before any network activity
    pub fn validate(&self) -> Result<()> {
        if self.rate_limit_per_second == 0 {
            return Err(Error::invalid_value(
                "rate_limit_per_second",
                "must be greater than zero",
            ));
        }
        if self.timeout_ms == 0 {
            return Err(Error::invalid_value("timeout_ms", "must be at least 1ms"));
        }
        if self.username.is_empty() {
            return Err(Error::invalid_value("username", "must not be empty"));
        }
        self.retry.validate()?;
        self.normalized_base_url()?;
        Ok(())
    }

    /// The API root every endpoint is joined onto, always ending in `/api/`
    pub fn normalized_base_url(&self) -> Result<String> {
        normalize_base_url(&self.base_url)
    }
}

impl std::fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientConfig")
            .field("base_url", &self.base_url)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("rate_limit_per_second", &self.rate_limit_per_second)
            .field("timeout_ms", &self.timeout_ms)
            .field("connect_timeout_secs", &self.connect_timeout_secs)
            .field("max_idle_connections", &self.max_idle_connections)
            .field("user_agent", &self.user_agent)
            .field("retry", &self.retry)
            .finish()
    }
}

// ============================================================================
// Retry Config
// ============================================================================

/// Retry and backoff settings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Total attempts per call, including the first
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Delay before the first retry; doubles for every further retry
    #[serde(default = "default_initial_backoff_ms")]
    pub initial_backoff_ms: u64,

    /// Ceiling for any single backoff delay
    #[serde(default = "default_max_backoff_ms")]
    pub max_backoff_ms: u64,
}

fn default_max_attempts() -> u32 {
    3
}

fn default_initial_backoff_ms() -> u64 {
    1000
}

fn default_max_backoff_ms() -> u64 {
    10_000
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_backoff_ms: default_initial_backoff_ms(),
            max_backoff_ms: default_max_backoff_ms(),
        }
    }
}

impl RetryConfig {
    /// Create a retry config
    pub fn new(max_attempts: u32, initial_backoff: Duration, max_backoff: Duration) -> Self {
        Self {
            max_attempts,
            initial_backoff_ms: initial_backoff.as_millis() as u64,
            max_backoff_ms: max_backoff.as_millis() as u64,
        }
    }

    pub fn initial_backoff(&self) -> Duration {
        Duration::from_millis(self.initial_backoff_ms)
    }

    pub fn max_backoff(&self) -> Duration {
        Duration::from_millis(self.max_backoff_ms)
    }

    fn validate(&self) -> Result<()> {
        if self.max_attempts == 0 {
            return Err(Error::invalid_value(
                "retry.max_attempts",
                "must be at least 1",
            ));
        }
        if self.max_backoff_ms < self.initial_backoff_ms {
            return Err(Error::invalid_value(
                "retry.max_backoff_ms",
                "must not be smaller than retry.initial_backoff_ms",
            ));
        }
        Ok(())
    }
}

// ============================================================================
// URL handling
// ============================================================================

/// Normalize an instance URL to its API root.
///
/// `https://host/dhis`, `https://host/dhis/` and `https://host/dhis/api` all
/// become `https://host/dhis/api/`.
pub fn normalize_base_url(raw: &str) -> Result<String> {
    let trimmed = raw.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        return Err(Error::invalid_value("base_url", "must not be empty"));
    }

    let parsed = Url::parse(trimmed)?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(Error::invalid_value(
            "base_url",
            format!("unsupported scheme '{}'", parsed.scheme()),
        ));
    }
    if !parsed.username().is_empty() || parsed.password().is_some() {
        return Err(Error::invalid_value(
            "base_url",
            "credentials belong in username/password, not the URL",
        ));
    }

    if trimmed.ends_with("/api") {
        Ok(format!("{trimmed}/"))
    } else {
        Ok(format!("{trimmed}/api/"))
    }
}
