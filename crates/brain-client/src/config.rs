//! Client configuration.

use std::path::Path;
use std::time::Duration;

use reqwest::Url;
use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, ConfigResult};
use crate::retry::{PollPolicy, RetryPolicy};

/// Default Brain API endpoint.
pub const DEFAULT_BASE_URL: &str = "https://api.worldquantbrain.com/";

/// Client configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BrainConfig {
    /// API base URL
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Per-request timeout in seconds
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Request retry budget
    #[serde(default)]
    pub retry: RetryPolicy,

    /// Completion polling
    #[serde(default)]
    pub poll: PollPolicy,
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_request_timeout_secs() -> u64 {
    30
}

impl Default for BrainConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            request_timeout_secs: default_request_timeout_secs(),
            retry: RetryPolicy::default(),
            poll: PollPolicy::default(),
        }
    }
}

impl BrainConfig {
    /// Load configuration from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml(&content)
    }

    /// Parse and validate configuration from TOML text.
    pub fn from_toml(content: &str) -> ConfigResult<Self> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Checks value ranges.
    pub fn validate(&self) -> ConfigResult<()> {
        self.parsed_base_url()?;
        if self.request_timeout_secs == 0 {
            return Err(ConfigError::validation(
                "request_timeout_secs",
                "must be greater than zero",
            ));
        }
        if self.poll.poll_interval.is_zero() {
            return Err(ConfigError::validation(
                "poll.poll_interval_ms",
                "must be greater than zero",
            ));
        }
        if self.poll.max_wait.is_zero() {
            return Err(ConfigError::validation(
                "poll.max_wait_secs",
                "must be greater than zero",
            ));
        }
        if self.poll.max_consecutive_failures == 0 {
            return Err(ConfigError::validation(
                "poll.max_consecutive_failures",
                "must be at least 1",
            ));
        }
        Ok(())
    }

    /// Base URL with a guaranteed trailing slash, so relative joins append.
    pub fn parsed_base_url(&self) -> ConfigResult<Url> {
        let mut raw = self.base_url.trim().to_string();
        if !raw.ends_with('/') {
            raw.push('/');
        }
        let url = Url::parse(&raw)
            .map_err(|e| ConfigError::validation("base_url", e.to_string()))?;
        if url.cannot_be_a_base() {
            return Err(ConfigError::validation("base_url", "not a base URL"));
        }
        Ok(url)
    }

    /// Per-request timeout.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}
