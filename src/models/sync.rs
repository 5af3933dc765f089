// src/models/sync.rs

//! Sync configurations, tracked URLs, and sync history records.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};
use crate::models::ExtractionRules;
use crate::services::validate_selector;

/// Identifier of a sync configuration.
pub type ConfigId = u64;

/// A scheduled re-extraction of a URL set that publishes changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncConfig {
    pub id: ConfigId,

    /// Publishing target the sink writes into
    pub doc_id: String,

    /// Title prefix of published pages
    pub base_page_name: String,

    /// Minutes between passes
    pub sync_interval: u32,

    #[serde(default)]
    pub content_selector: Option<String>,

    #[serde(default)]
    pub code_selector: Option<String>,

    #[serde(default)]
    pub exclude_selector: Option<String>,

    pub active: bool,

    /// Tick time of the last completed pass
    #[serde(default)]
    pub last_sync: Option<DateTime<Utc>>,

    pub created_at: DateTime<Utc>,
}

impl SyncConfig {
    /// Whether the config should be picked up by a tick at `now`.
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        if !self.active {
            return false;
        }
        match self.last_sync {
            None => true,
            Some(last) => now - last > Duration::minutes(i64::from(self.sync_interval)),
        }
    }

    /// Extraction rules derived from the config's selectors.
    pub fn extraction_rules(&self) -> ExtractionRules {
        let mut rules = ExtractionRules::new();
        if let Some(selector) = &self.content_selector {
            rules = rules.with_content_selector(selector.as_str());
        }
        if let Some(selector) = &self.code_selector {
            rules = rules.with_code_selector(selector.as_str());
        }
        if let Some(selector) = &self.exclude_selector {
            rules = rules.with_exclude_selector(selector.as_str());
        }
        rules
    }

    /// Title for a page published at `at`.
    pub fn page_title(&self, at: DateTime<Utc>) -> String {
        format!("{} - {}", self.base_page_name, at.format("%Y-%m-%d %H:%M"))
    }
}

/// Input for creating a sync configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewSyncConfig {
    pub doc_id: String,
    pub base_page_name: String,
    pub sync_interval: u32,
    #[serde(default)]
    pub content_selector: Option<String>,
    #[serde(default)]
    pub code_selector: Option<String>,
    #[serde(default)]
    pub exclude_selector: Option<String>,
}

impl NewSyncConfig {
    pub fn new(
        doc_id: impl Into<String>,
        base_page_name: impl Into<String>,
        sync_interval: u32,
    ) -> Self {
        Self {
            doc_id: doc_id.into(),
            base_page_name: base_page_name.into(),
            sync_interval,
            ..Self::default()
        }
    }

    /// Check required fields and selector syntax.
    pub fn validate(&self) -> Result<()> {
        if self.doc_id.trim().is_empty() {
            return Err(AppError::validation("doc_id is empty"));
        }
        if self.base_page_name.trim().is_empty() {
            return Err(AppError::validation("base_page_name is empty"));
        }
        if self.sync_interval == 0 {
            return Err(AppError::validation("sync_interval must be > 0"));
        }
        for selector in [
            &self.content_selector,
            &self.code_selector,
            &self.exclude_selector,
        ]
        .into_iter()
        .flatten()
        {
            validate_selector(selector)?;
        }
        Ok(())
    }

    pub(crate) fn into_config(self, id: ConfigId, now: DateTime<Utc>) -> SyncConfig {
        SyncConfig {
            id,
            doc_id: self.doc_id,
            base_page_name: self.base_page_name,
            sync_interval: self.sync_interval,
            content_selector: self.content_selector,
            code_selector: self.code_selector,
            exclude_selector: self.exclude_selector,
            active: true,
            last_sync: None,
            created_at: now,
        }
    }
}

/// Administrative change to an existing config.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct ConfigUpdate {
    pub active: Option<bool>,
    pub sync_interval: Option<u32>,
}

impl ConfigUpdate {
    pub fn validate(&self) -> Result<()> {
        if self.sync_interval == Some(0) {
            return Err(AppError::validation("sync_interval must be > 0"));
        }
        Ok(())
    }

    pub(crate) fn apply(&self, config: &mut SyncConfig) {
        if let Some(active) = self.active {
            config.active = active;
        }
        if let Some(interval) = self.sync_interval {
            config.sync_interval = interval;
        }
    }
}

/// A URL attached to a config, with its last observed fingerprint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackedUrl {
    pub config_id: ConfigId,
    pub url: String,
    #[serde(default)]
    pub last_content_hash: Option<String>,
    #[serde(default)]
    pub last_sync: Option<DateTime<Utc>>,
}

impl TrackedUrl {
    pub fn new(config_id: ConfigId, url: impl Into<String>) -> Self {
        Self {
            config_id,
            url: url.into(),
            last_content_hash: None,
            last_sync: None,
        }
    }

    /// A URL with no stored fingerprint always counts as changed.
    pub fn has_changed(&self, digest: &str) -> bool {
        self.last_content_hash.as_deref() != Some(digest)
    }
}

/// Final status of a scheduler pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncStatus {
    Completed,
    Error,
}

/// Append-only audit entry, one per pass per config.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncHistoryRecord {
    pub config_id: ConfigId,
    pub status: SyncStatus,
    pub message: String,
    pub urls_processed: usize,
    pub urls_failed: usize,
    pub timestamp: DateTime<Utc>,
}

impl SyncHistoryRecord {
    pub fn completed(
        config_id: ConfigId,
        processed: usize,
        changed: usize,
        failed: usize,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            config_id,
            status: SyncStatus::Completed,
            message: format!("Processed {processed} URLs: {changed} changed, {failed} failed"),
            urls_processed: processed,
            urls_failed: failed,
            timestamp,
        }
    }

    pub fn error(config_id: ConfigId, message: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Self {
            config_id,
            status: SyncStatus::Error,
            message: message.into(),
            urls_processed: 0,
            urls_failed: 0,
            timestamp,
        }
    }
}

/// Read-only status view for a config.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncStatusReport {
    pub config: SyncConfig,
    pub last_history: Option<SyncHistoryRecord>,
    pub tracked_urls: Vec<TrackedUrl>,
}
