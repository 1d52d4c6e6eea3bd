//! Client configuration.
//!
//! `ClientConfig` deserializes from any serde format so it can sit inside a
//! caller's own config file, or be read from the environment.

use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

/// Overall per-call timeout applied by the production transport.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

pub const URL_ENV: &str = "RECORDER_URL";
pub const TIMEOUT_ENV: &str = "RECORDER_TIMEOUT_SECS";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} is not set")]
    Missing(&'static str),
    #[error("{name} has invalid value {value:?}")]
    Invalid { name: &'static str, value: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ClientConfig {
    /// Base API URL, e.g. `http://localhost:8083/api/0`.
    pub base_url: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT.as_secs()
}

impl ClientConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            timeout_secs: default_timeout_secs(),
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Reads `RECORDER_URL` and, optionally, `RECORDER_TIMEOUT_SECS`.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let base_url = lookup(URL_ENV)
            .filter(|url| !url.trim().is_empty())
            .ok_or(ConfigError::Missing(URL_ENV))?;

        let timeout_secs = match lookup(TIMEOUT_ENV) {
            Some(raw) => raw
                .trim()
                .parse::<u64>()
                .ok()
                .filter(|secs| *secs > 0)
                .ok_or_else(|| ConfigError::Invalid {
                    name: TIMEOUT_ENV,
                    value: raw.clone(),
                })?,
            None => default_timeout_secs(),
        };

        Ok(Self {
            base_url,
            timeout_secs,
        })
    }
}
