//! Environment configuration of the synchronization worker.

use std::path::PathBuf;
use std::time::Duration;

use crate::processor::DEFAULT_BATCH_SIZE;

pub const API_BASE_URL: &str = "ORDERSYNC_API_BASE_URL";
pub const API_TOKEN: &str = "ORDERSYNC_API_TOKEN";
pub const DATABASE_URL: &str = "ORDERSYNC_DATABASE_URL";
pub const STORE_CONFIG_PATH: &str = "ORDERSYNC_STORE_CONFIG_PATH";
pub const BATCH_SIZE: &str = "ORDERSYNC_BATCH_SIZE";
pub const POLL_INTERVAL_SECS: &str = "ORDERSYNC_POLL_INTERVAL_SECS";
pub const HTTP_TIMEOUT_SECS: &str = "ORDERSYNC_HTTP_TIMEOUT_SECS";

const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(60);
const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    Missing(&'static str),
    #[error("invalid value for {key}: {reason}")]
    Invalid { key: &'static str, reason: String },
}

#[derive(Clone, PartialEq, Eq)]
pub struct SyncConfig {
    pub api_base_url: String,
    pub api_token: String,
    pub database_url: String,
    pub store_config_path: PathBuf,
    pub batch_size: usize,
    pub poll_interval: Duration,
    pub http_timeout: Duration,
}

impl std::fmt::Debug for SyncConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncConfig")
            .field("api_base_url", &self.api_base_url)
            .field("api_token", &"<redacted>")
            .field("database_url", &"<redacted>")
            .field("store_config_path", &self.store_config_path)
            .field("batch_size", &self.batch_size)
            .field("poll_interval", &self.poll_interval)
            .field("http_timeout", &self.http_timeout)
            .finish()
    }
}

impl SyncConfig {
    /// Read the configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read the configuration through `lookup`; blank values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &'static str| non_blank(&lookup, key);
        let required = |key: &'static str| get(key).ok_or(ConfigError::Missing(key));

        let api_base_url = required(API_BASE_URL)?;
        if !(api_base_url.starts_with("http://") || api_base_url.starts_with("https://")) {
            return Err(ConfigError::Invalid {
                key: API_BASE_URL,
                reason: "expected an http(s) URL".to_string(),
            });
        }

        let batch_size = match get(BATCH_SIZE) {
            Some(raw) => parse_positive(BATCH_SIZE, &raw)? as usize,
            None => DEFAULT_BATCH_SIZE,
        };
        let poll_interval = match get(POLL_INTERVAL_SECS) {
            Some(raw) => Duration::from_secs(parse_positive(POLL_INTERVAL_SECS, &raw)?),
            None => DEFAULT_POLL_INTERVAL,
        };
        let http_timeout = match get(HTTP_TIMEOUT_SECS) {
            Some(raw) => Duration::from_secs(parse_positive(HTTP_TIMEOUT_SECS, &raw)?),
            None => DEFAULT_HTTP_TIMEOUT,
        };

        Ok(Self {
            api_base_url,
            api_token: required(API_TOKEN)?,
            database_url: database_url_from_lookup(&lookup)?,
            store_config_path: PathBuf::from(required(STORE_CONFIG_PATH)?),
            batch_size,
            poll_interval,
            http_timeout,
        })
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    pub fn with_http_timeout(mut self, http_timeout: Duration) -> Self {
        self.http_timeout = http_timeout;
        self
    }
}

/// Only the queue database URL, for commands that never talk to the API.
pub fn database_url_from_env() -> Result<String, ConfigError> {
    database_url_from_lookup(|key| std::env::var(key).ok())
}

pub fn database_url_from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<String, ConfigError> {
    non_blank(&lookup, DATABASE_URL).ok_or(ConfigError::Missing(DATABASE_URL))
}

fn non_blank(lookup: impl Fn(&str) -> Option<String>, key: &str) -> Option<String> {
    lookup(key)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_positive(key: &'static str, raw: &str) -> Result<u64, ConfigError> {
    match raw.parse::<u64>() {
        Ok(0) => Err(ConfigError::Invalid {
            key,
            reason: "must be greater than zero".to_string(),
        }),
        Ok(n) => Ok(n),
        Err(e) => Err(ConfigError::Invalid {
            key,
            reason: e.to_string(),
        }),
    }
}
