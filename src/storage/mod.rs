// src/storage/mod.rs

//! Persistence of sync configs, tracked URLs, and sync history.
//!
//! Content itself is never stored, only its fingerprint.
//!
//! ## State Layout
//!
//! ```text
//! StoreState
//! ├── next_id               # Last issued config id
//! ├── configs               # id -> SyncConfig
//! ├── tracked               # id -> [TrackedUrl], unique per URL
//! └── history               # Append-only SyncHistoryRecord log
//! ```

pub mod local;
pub mod memory;

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::{AppError, Result};
use crate::models::{
    ConfigId, ConfigUpdate, NewSyncConfig, SyncConfig, SyncHistoryRecord, SyncStatusReport,
    TrackedUrl,
};
use crate::utils::parse_target_url;

// Re-export for convenience
pub use local::LocalStore;
pub use memory::MemoryStore;

/// SHA-256 hex digest of extracted text.
pub fn fingerprint(text: &str) -> String {
    hex::encode(Sha256::digest(text.as_bytes()))
}

/// Trait for sync persistence backends.
#[async_trait]
pub trait SyncStore: Send + Sync {
    /// Validate and persist a new config. It starts active and never synced.
    async fn create_config(&self, new: NewSyncConfig) -> Result<SyncConfig>;

    async fn get_config(&self, id: ConfigId) -> Result<SyncConfig>;

    async fn list_configs(&self) -> Result<Vec<SyncConfig>>;

    /// Apply an administrative update (active flag, interval).
    async fn update_config(&self, id: ConfigId, update: ConfigUpdate) -> Result<SyncConfig>;

    /// Track URLs for a config, skipping pairs that already exist.
    ///
    /// Returns the number of newly tracked URLs.
    async fn add_urls(&self, id: ConfigId, urls: &[String]) -> Result<usize>;

    async fn tracked_urls(&self, id: ConfigId) -> Result<Vec<TrackedUrl>>;

    /// Store a new fingerprint and its timestamp as one update.
    async fn record_result(
        &self,
        id: ConfigId,
        url: &str,
        digest: &str,
        at: DateTime<Utc>,
    ) -> Result<()>;

    /// Set `last_sync` after a completed pass.
    async fn mark_synced(&self, id: ConfigId, at: DateTime<Utc>) -> Result<()>;

    async fn append_history(&self, record: SyncHistoryRecord) -> Result<()>;

    /// History of a config, oldest first.
    async fn history(&self, id: ConfigId) -> Result<Vec<SyncHistoryRecord>>;

    /// Active configs whose interval has elapsed at `now`.
    async fn due_configs(&self, now: DateTime<Utc>) -> Result<Vec<SyncConfig>> {
        Ok(self
            .list_configs()
            .await?
            .into_iter()
            .filter(|config| config.is_due(now))
            .collect())
    }

    async fn status(&self, id: ConfigId) -> Result<SyncStatusReport> {
        let config = self.get_config(id).await?;
        let last_history = self.history(id).await?.pop();
        let tracked_urls = self.tracked_urls(id).await?;
        Ok(SyncStatusReport {
            config,
            last_history,
            tracked_urls,
        })
    }
}

/// Whole persisted state, shared by every backend.
///
/// Every mutation validates before touching the state, so a failed call
/// leaves it unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreState {
    #[serde(default)]
    next_id: ConfigId,
    #[serde(default)]
    configs: BTreeMap<ConfigId, SyncConfig>,
    #[serde(default)]
    tracked: BTreeMap<ConfigId, Vec<TrackedUrl>>,
    #[serde(default)]
    history: Vec<SyncHistoryRecord>,
}

impl StoreState {
    pub fn create_config(&mut self, new: NewSyncConfig, now: DateTime<Utc>) -> Result<SyncConfig> {
        new.validate()?;
        self.next_id += 1;
        let config = new.into_config(self.next_id, now);
        self.configs.insert(config.id, config.clone());
        self.tracked.entry(config.id).or_default();
        Ok(config)
    }

    pub fn config(&self, id: ConfigId) -> Result<&SyncConfig> {
        self.configs
            .get(&id)
            .ok_or_else(|| AppError::not_found(format!("sync config {id}")))
    }

    fn config_mut(&mut self, id: ConfigId) -> Result<&mut SyncConfig> {
        self.configs
            .get_mut(&id)
            .ok_or_else(|| AppError::not_found(format!("sync config {id}")))
    }

    pub fn configs(&self) -> Vec<SyncConfig> {
        self.configs.values().cloned().collect()
    }

    pub fn update_config(&mut self, id: ConfigId, update: ConfigUpdate) -> Result<SyncConfig> {
        update.validate()?;
        let config = self.config_mut(id)?;
        update.apply(config);
        Ok(config.clone())
    }

    pub fn add_urls(&mut self, id: ConfigId, urls: &[String]) -> Result<usize> {
        self.config(id)?;
        let mut accepted = Vec::with_capacity(urls.len());
        for url in urls {
            let url = url.trim();
            if parse_target_url(url).is_none() {
                return Err(AppError::validation(format!(
                    "invalid URL '{url}': scheme and host are required"
                )));
            }
            accepted.push(url.to_string());
        }

        let tracked = self.tracked.entry(id).or_default();
        let mut added = 0;
        for url in accepted {
            if !tracked.iter().any(|t| t.url == url) {
                tracked.push(TrackedUrl::new(id, url));
                added += 1;
            }
        }
        Ok(added)
    }

    pub fn tracked_urls(&self, id: ConfigId) -> Result<Vec<TrackedUrl>> {
        self.config(id)?;
        Ok(self.tracked.get(&id).cloned().unwrap_or_default())
    }

    pub fn record_result(
        &mut self,
        id: ConfigId,
        url: &str,
        digest: &str,
        at: DateTime<Utc>,
    ) -> Result<()> {
        let tracked = self
            .tracked
            .get_mut(&id)
            .and_then(|urls| urls.iter_mut().find(|t| t.url == url))
            .ok_or_else(|| AppError::not_found(format!("tracked URL {url} of config {id}")))?;
        tracked.last_content_hash = Some(digest.to_string());
        tracked.last_sync = Some(at);
        Ok(())
    }

    pub fn mark_synced(&mut self, id: ConfigId, at: DateTime<Utc>) -> Result<()> {
        self.config_mut(id)?.last_sync = Some(at);
        Ok(())
    }

    pub fn append_history(&mut self, record: SyncHistoryRecord) -> Result<()> {
        self.config(record.config_id)?;
        self.history.push(record);
        Ok(())
    }

    pub fn history(&self, id: ConfigId) -> Vec<SyncHistoryRecord> {
        self.history
            .iter()
            .filter(|record| record.config_id == id)
            .cloned()
            .collect()
    }
}
