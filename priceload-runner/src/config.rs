//! Pipeline configuration, loaded from TOML.
//!
//! Every field has a default, so an empty file (or no file) yields the
//! production settings. A retry section, when present, must give both fields.
//!
//! ```toml
//! [store]
//! root = "data"
//! bucket = "mh-guess-data"
//! namespace = "tiingo/json"
//! tickers_key = "adhoc/tickers.txt"
//!
//! [api]
//! base_url = "https://api.tiingo.com/tiingo"
//! token_env = "TIINGO_API_TOKEN"
//! timeout_secs = 30
//!
//! [fetch_retry]
//! max_attempts = 3
//! backoff_secs = 10
//!
//! [store_retry]
//! max_attempts = 2
//! backoff_secs = 5
//!
//! [scheduler]
//! workers = 1
//!
//! [daily]
//! lookback_days = 30
//! ```

use priceload_core::data::tiingo::DEFAULT_BASE_URL;
use priceload_core::data::DEFAULT_TICKERS_KEY;
use priceload_core::{KeyBuilder, RetryPolicy};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PipelineConfig {
    pub store: StoreConfig,
    pub api: ApiConfig,
    pub fetch_retry: RetryConfig,
    pub store_retry: RetryConfig,
    pub scheduler: SchedulerConfig,
    pub daily: DailyConfig,
}

/// Where the ticker list is read from and outputs are written to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StoreConfig {
    /// Local directory holding buckets.
    pub root: PathBuf,
    pub bucket: String,
    /// Key prefix for all outputs.
    pub namespace: String,
    pub tickers_key: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ApiConfig {
    pub base_url: String,
    /// Environment variable holding the API token.
    pub token_env: String,
    /// Per-request HTTP timeout.
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub backoff_secs: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SchedulerConfig {
    /// Work items in flight at once. 1 = sequential.
    pub workers: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DailyConfig {
    /// Days of history fetched before the run date.
    pub lookback_days: u32,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            store: StoreConfig::default(),
            api: ApiConfig::default(),
            fetch_retry: RetryConfig::from(RetryPolicy::FETCH),
            store_retry: RetryConfig::from(RetryPolicy::STORE),
            scheduler: SchedulerConfig::default(),
            daily: DailyConfig::default(),
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("data"),
            bucket: "mh-guess-data".into(),
            namespace: "tiingo/json".into(),
            tickers_key: DEFAULT_TICKERS_KEY.into(),
        }
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.into(),
            token_env: "TIINGO_API_TOKEN".into(),
            timeout_secs: 30,
        }
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self { workers: 1 }
    }
}

impl Default for DailyConfig {
    fn default() -> Self {
        Self { lookback_days: 30 }
    }
}

impl From<RetryPolicy> for RetryConfig {
    fn from(policy: RetryPolicy) -> Self {
        Self {
            max_attempts: policy.max_attempts,
            backoff_secs: policy.backoff.as_secs(),
        }
    }
}

impl RetryConfig {
    pub fn policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.max_attempts, Duration::from_secs(self.backoff_secs))
    }
}

impl PipelineConfig {
    /// Load and validate a config file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    /// Parse and validate a TOML string.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |msg: &str| Err(ConfigError::Invalid(msg.to_string()));

        if self.store.bucket.trim().is_empty() {
            return invalid("store.bucket must not be empty");
        }
        if self.store.namespace.trim_matches('/').trim().is_empty() {
            return invalid("store.namespace must not be empty");
        }
        if self.store.tickers_key.trim().is_empty() {
            return invalid("store.tickers_key must not be empty");
        }
        if self.api.base_url.trim().is_empty() {
            return invalid("api.base_url must not be empty");
        }
        if self.api.timeout_secs == 0 {
            return invalid("api.timeout_secs must be at least 1");
        }
        if self.fetch_retry.max_attempts == 0 {
            return invalid("fetch_retry.max_attempts must be at least 1");
        }
        if self.store_retry.max_attempts == 0 {
            return invalid("store_retry.max_attempts must be at least 1");
        }
        if self.scheduler.workers == 0 {
            return invalid("scheduler.workers must be at least 1");
        }
        Ok(())
    }

    pub fn key_builder(&self) -> KeyBuilder {
        KeyBuilder::new(&self.store.namespace)
    }

    pub fn fetch_policy(&self) -> RetryPolicy {
        self.fetch_retry.policy()
    }

    pub fn store_policy(&self) -> RetryPolicy {
        self.store_retry.policy()
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.api.timeout_secs)
    }

    /// Serialize back to TOML (for `--print-config`).
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::Invalid(e.to_string()))
    }
}
