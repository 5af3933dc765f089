// src/storage/memory.rs

//! In-memory store for tests and one-shot runs.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use crate::error::Result;
use crate::models::{
    ConfigId, ConfigUpdate, NewSyncConfig, SyncConfig, SyncHistoryRecord, TrackedUrl,
};
use crate::storage::{StoreState, SyncStore};

/// Store keeping all state behind a lock; nothing survives the process.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: RwLock<StoreState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SyncStore for MemoryStore {
    async fn create_config(&self, new: NewSyncConfig) -> Result<SyncConfig> {
        self.state.write().await.create_config(new, Utc::now())
    }

    async fn get_config(&self, id: ConfigId) -> Result<SyncConfig> {
        self.state.read().await.config(id).cloned()
    }

    async fn list_configs(&self) -> Result<Vec<SyncConfig>> {
        Ok(self.state.read().await.configs())
    }

    async fn update_config(&self, id: ConfigId, update: ConfigUpdate) -> Result<SyncConfig> {
        self.state.write().await.update_config(id, update)
    }

    async fn add_urls(&self, id: ConfigId, urls: &[String]) -> Result<usize> {
        self.state.write().await.add_urls(id, urls)
    }

    async fn tracked_urls(&self, id: ConfigId) -> Result<Vec<TrackedUrl>> {
        self.state.read().await.tracked_urls(id)
    }

    async fn record_result(
        &self,
        id: ConfigId,
        url: &str,
        digest: &str,
        at: DateTime<Utc>,
    ) -> Result<()> {
        self.state.write().await.record_result(id, url, digest, at)
    }

    async fn mark_synced(&self, id: ConfigId, at: DateTime<Utc>) -> Result<()> {
        self.state.write().await.mark_synced(id, at)
    }

    async fn append_history(&self, record: SyncHistoryRecord) -> Result<()> {
        self.state.write().await.append_history(record)
    }

    async fn history(&self, id: ConfigId) -> Result<Vec<SyncHistoryRecord>> {
        Ok(self.state.read().await.history(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[tokio::test]
    async fn test_due_configs_and_status() {
        let store = MemoryStore::new();
        let synced = store
            .create_config(NewSyncConfig::new("doc-1", "Docs", 30))
            .await
            .unwrap();
        let fresh = store
            .create_config(NewSyncConfig::new("doc-2", "Guides", 30))
            .await
            .unwrap();

        let now = Utc::now();
        store
            .mark_synced(synced.id, now - Duration::minutes(5))
            .await
            .unwrap();

        let due = store.due_configs(now).await.unwrap();
        assert_eq!(due.len(), 1);
        assert_eq!(due[0].id, fresh.id);

        store
            .append_history(SyncHistoryRecord::completed(synced.id, 0, 0, 0, now))
            .await
            .unwrap();
        store
            .append_history(SyncHistoryRecord::error(synced.id, "later", now))
            .await
            .unwrap();

        let report = store.status(synced.id).await.unwrap();
        assert_eq!(report.last_history.unwrap().message, "later");
        assert!(report.tracked_urls.is_empty());
    }

    #[tokio::test]
    async fn test_deactivated_config_is_not_due() {
        let store = MemoryStore::new();
        let config = store
            .create_config(NewSyncConfig::new("doc", "Docs", 15))
            .await
            .unwrap();
        store
            .update_config(
                config.id,
                ConfigUpdate {
                    active: Some(false),
                    sync_interval: None,
                },
            )
            .await
            .unwrap();

        assert!(store.due_configs(Utc::now()).await.unwrap().is_empty());
    }
}
