// src/models/config.rs

//! Application configuration structures.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

/// Root application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// HTTP client behavior
    #[serde(default)]
    pub http: HttpConfig,

    /// Batch pipeline sizing
    #[serde(default)]
    pub batch: BatchConfig,

    /// Scheduling loop settings
    #[serde(default)]
    pub scheduler: SchedulerConfig,

    /// Persistence location
    #[serde(default)]
    pub storage: StorageConfig,

    /// Downstream publishing target
    #[serde(default)]
    pub sink: SinkConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Load configuration or return default if loading fails.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        Self::load(&path).unwrap_or_else(|e| {
            log::warn!(
                "Config load failed from {:?}: {}. Using defaults.",
                path.as_ref(),
                e
            );
            Self::default()
        })
    }

    /// Serialize to TOML, e.g. for writing a starter file.
    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Validate configuration values for basic sanity.
    pub fn validate(&self) -> Result<()> {
        if self.http.user_agent.trim().is_empty() {
            return Err(AppError::validation("http.user_agent is empty"));
        }
        if self.http.timeout_secs == 0 {
            return Err(AppError::validation("http.timeout_secs must be > 0"));
        }
        if self.batch.batch_size == 0 {
            return Err(AppError::validation("batch.batch_size must be > 0"));
        }
        if self.batch.max_concurrent == 0 {
            return Err(AppError::validation("batch.max_concurrent must be > 0"));
        }
        if self.scheduler.poll_interval_secs == 0 {
            return Err(AppError::validation(
                "scheduler.poll_interval_secs must be > 0",
            ));
        }
        if self.scheduler.max_concurrent_configs == 0 {
            return Err(AppError::validation(
                "scheduler.max_concurrent_configs must be > 0",
            ));
        }
        match self.sink.kind {
            SinkKind::Webhook if self.sink.endpoint.is_none() => {
                return Err(AppError::validation("sink.endpoint is required for webhook"));
            }
            SinkKind::File if self.sink.dir.is_none() => {
                return Err(AppError::validation("sink.dir is required for file"));
            }
            _ => {}
        }
        Ok(())
    }
}

/// HTTP client settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    /// User-Agent header for HTTP requests
    #[serde(default = "defaults::user_agent")]
    pub user_agent: String,

    /// Request timeout in seconds
    #[serde(default = "defaults::timeout")]
    pub timeout_secs: u64,

    /// Extra attempts for timeouts, transport errors, 429 and 5xx
    #[serde(default = "defaults::max_retries")]
    pub max_retries: u32,

    /// Base delay between attempts, multiplied by the attempt number
    #[serde(default = "defaults::retry_backoff")]
    pub retry_backoff_ms: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            user_agent: defaults::user_agent(),
            timeout_secs: defaults::timeout(),
            max_retries: defaults::max_retries(),
            retry_backoff_ms: defaults::retry_backoff(),
        }
    }
}

/// Batch pipeline settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchConfig {
    /// URLs per sequential chunk
    #[serde(default = "defaults::batch_size")]
    pub batch_size: usize,

    /// Maximum in-flight fetches within a chunk
    #[serde(default = "defaults::max_concurrent")]
    pub max_concurrent: usize,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            batch_size: defaults::batch_size(),
            max_concurrent: defaults::max_concurrent(),
        }
    }
}

/// Scheduling loop settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Seconds between ticks
    #[serde(default = "defaults::poll_interval")]
    pub poll_interval_secs: u64,

    /// Maximum config passes running at once
    #[serde(default = "defaults::max_concurrent_configs")]
    pub max_concurrent_configs: usize,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: defaults::poll_interval(),
            max_concurrent_configs: defaults::max_concurrent_configs(),
        }
    }
}

/// Persistence settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// JSON state file
    #[serde(default = "defaults::storage_path")]
    pub path: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            path: defaults::storage_path(),
        }
    }
}

/// Which sink implementation receives changed content.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SinkKind {
    #[default]
    Log,
    File,
    Webhook,
}

/// Sink settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SinkConfig {
    #[serde(default)]
    pub kind: SinkKind,

    /// Output directory for the file sink
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dir: Option<PathBuf>,

    /// Endpoint for the webhook sink
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,

    /// Webhook request timeout in seconds
    #[serde(default = "defaults::timeout")]
    pub timeout_secs: u64,
}

impl Default for SinkConfig {
    fn default() -> Self {
        Self {
            kind: SinkKind::default(),
            dir: None,
            endpoint: None,
            timeout_secs: defaults::timeout(),
        }
    }
}

mod defaults {
    use std::path::PathBuf;

    pub fn user_agent() -> String {
        "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) \
         Chrome/120.0.0.0 Safari/537.36"
            .into()
    }
    pub fn timeout() -> u64 {
        30
    }
    pub fn max_retries() -> u32 {
        1
    }
    pub fn retry_backoff() -> u64 {
        500
    }

    pub fn batch_size() -> usize {
        10
    }
    pub fn max_concurrent() -> usize {
        5
    }

    pub fn poll_interval() -> u64 {
        60
    }
    pub fn max_concurrent_configs() -> usize {
        4
    }

    pub fn storage_path() -> PathBuf {
        PathBuf::from("storage/state.json")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validate_default_config_ok() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn validate_rejects_empty_user_agent() {
        let mut config = Config::default();
        config.http.user_agent = "  ".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_zero_concurrency() {
        let mut config = Config::default();
        config.batch.max_concurrent = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_requires_webhook_endpoint() {
        let mut config = Config::default();
        config.sink.kind = SinkKind::Webhook;
        assert!(config.validate().is_err());
        config.sink.endpoint = Some("https://hooks.example/sync".into());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn partial_toml_fills_defaults() {
        let config: Config = toml::from_str(
            r#"
            [batch]
            batch_size = 3

            [sink]
            kind = "file"
            dir = "out"
            "#,
        )
        .unwrap();

        assert_eq!(config.batch.batch_size, 3);
        assert_eq!(config.batch.max_concurrent, 5);
        assert_eq!(config.http.timeout_secs, 30);
        assert_eq!(config.scheduler.poll_interval_secs, 60);
        assert_eq!(config.sink.kind, SinkKind::File);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn load_or_default_falls_back() {
        let config = Config::load_or_default("/nonexistent/pagesync.toml");
        assert_eq!(config.batch.batch_size, 10);
    }

    #[test]
    fn default_config_round_trips_through_toml() {
        let text = Config::default().to_toml().unwrap();
        let parsed: Config = toml::from_str(&text).unwrap();
        assert_eq!(parsed.scheduler.max_concurrent_configs, 4);
    }
}
