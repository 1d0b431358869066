//! API configuration loaded from the environment.
//!
//! The base URL is required; building an [`ApiConfig`] is the single point
//! where a missing or malformed value is reported, so no request ever runs
//! against an unset backend.

use reqwest::Url;
use std::time::Duration;
use thiserror::Error;

pub const BASE_URL_VAR: &str = "DEVOTIONAL_API_BASE_URL";
pub const TIMEOUT_SECS_VAR: &str = "DEVOTIONAL_API_TIMEOUT_SECS";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing {0} in your env")]
    Missing(&'static str),
    #[error("{var} is not a valid URL: {value}")]
    InvalidUrl { var: &'static str, value: String },
    #[error("{var} must be a whole number of seconds, got {value}")]
    InvalidTimeout { var: &'static str, value: String },
}

#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Base URL without a trailing slash.
    base_url: String,
    /// Request timeout handed to the transport. `None` leaves it unbounded.
    pub timeout: Option<Duration>,
}

impl ApiConfig {
    /// Load configuration from environment variables, reading a `.env` file
    /// first when one is present.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let base_url = lookup(BASE_URL_VAR)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .ok_or(ConfigError::Missing(BASE_URL_VAR))?;

        let mut config = Self::new(&base_url)?;

        if let Some(raw) = lookup(TIMEOUT_SECS_VAR) {
            let raw = raw.trim();
            if !raw.is_empty() {
                let secs = raw.parse::<u64>().map_err(|_| ConfigError::InvalidTimeout {
                    var: TIMEOUT_SECS_VAR,
                    value: raw.to_string(),
                })?;
                config.timeout = Some(Duration::from_secs(secs));
            }
        }

        Ok(config)
    }

    pub fn new(base_url: &str) -> Result<Self, ConfigError> {
        let trimmed = base_url.trim().trim_end_matches('/');
        if trimmed.is_empty() {
            return Err(ConfigError::Missing(BASE_URL_VAR));
        }
        Url::parse(trimmed).map_err(|_| ConfigError::InvalidUrl {
            var: BASE_URL_VAR,
            value: base_url.to_string(),
        })?;
        Ok(Self {
            base_url: trimmed.to_string(),
            timeout: None,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}
