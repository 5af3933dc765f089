// src/storage/local.rs

//! Local filesystem store.
//!
//! The whole [`StoreState`] lives in one JSON file. Every mutation runs
//! under a mutex and rewrites the file atomically, so a reader never sees a
//! fingerprint without its timestamp.
//!
//! ## Storage Layout
//!
//! ```text
//! {path}        # StoreState as pretty JSON
//! {path}.tmp    # Write buffer, renamed over {path}
//! ```

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

use crate::error::{AppError, Result};
use crate::models::{
    ConfigId, ConfigUpdate, NewSyncConfig, SyncConfig, SyncHistoryRecord, TrackedUrl,
};
use crate::storage::{StoreState, SyncStore};

/// JSON-file storage backend.
#[derive(Debug)]
pub struct LocalStore {
    path: PathBuf,
    state: Mutex<StoreState>,
}

impl LocalStore {
    /// Open the store at `path`, starting empty if the file does not exist.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let state = match read_bytes(&path).await? {
            Some(bytes) => serde_json::from_slice(&bytes)
                .map_err(|e| AppError::store(format!("{}: {e}", path.display())))?,
            None => {
                log::info!("No state file at {}, starting empty", path.display());
                StoreState::default()
            }
        };
        Ok(Self {
            path,
            state: Mutex::new(state),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Apply `change` to a copy of the state, persist it, then commit.
    ///
    /// A failed write leaves both the file and the in-memory state as they
    /// were.
    async fn mutate<T: Send>(
        &self,
        change: impl FnOnce(&mut StoreState) -> Result<T> + Send,
    ) -> Result<T> {
        let mut state = self.state.lock().await;
        let mut next = state.clone();
        let value = change(&mut next)?;

        let bytes = serde_json::to_vec_pretty(&next)?;
        write_bytes(&self.path, &bytes)
            .await
            .map_err(|e| AppError::store(format!("{}: {e}", self.path.display())))?;

        *state = next;
        Ok(value)
    }

    async fn read<T>(&self, view: impl FnOnce(&StoreState) -> T + Send) -> T {
        view(&*self.state.lock().await)
    }
}

/// Write bytes atomically (write to temp, then rename).
async fn write_bytes(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }

    let tmp = path.with_extension("tmp");
    let mut file = tokio::fs::File::create(&tmp).await?;
    file.write_all(bytes).await?;
    file.flush().await?;
    drop(file);

    tokio::fs::rename(&tmp, path).await
}

/// Read bytes, returning None if file doesn't exist.
async fn read_bytes(path: &Path) -> Result<Option<Vec<u8>>> {
    match tokio::fs::read(path).await {
        Ok(bytes) => Ok(Some(bytes)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(AppError::store(format!("{}: {e}", path.display()))),
    }
}

#[async_trait]
impl SyncStore for LocalStore {
    async fn create_config(&self, new: NewSyncConfig) -> Result<SyncConfig> {
        let now = Utc::now();
        self.mutate(|state| state.create_config(new, now)).await
    }

    async fn get_config(&self, id: ConfigId) -> Result<SyncConfig> {
        self.read(|state| state.config(id).cloned()).await
    }

    async fn list_configs(&self) -> Result<Vec<SyncConfig>> {
        Ok(self.read(StoreState::configs).await)
    }

    async fn update_config(&self, id: ConfigId, update: ConfigUpdate) -> Result<SyncConfig> {
        self.mutate(|state| state.update_config(id, update)).await
    }

    async fn add_urls(&self, id: ConfigId, urls: &[String]) -> Result<usize> {
        self.mutate(|state| state.add_urls(id, urls)).await
    }

    async fn tracked_urls(&self, id: ConfigId) -> Result<Vec<TrackedUrl>> {
        self.read(|state| state.tracked_urls(id)).await
    }

    async fn record_result(
        &self,
        id: ConfigId,
        url: &str,
        digest: &str,
        at: DateTime<Utc>,
    ) -> Result<()> {
        self.mutate(|state| state.record_result(id, url, digest, at))
            .await
    }

    async fn mark_synced(&self, id: ConfigId, at: DateTime<Utc>) -> Result<()> {
        self.mutate(|state| state.mark_synced(id, at)).await
    }

    async fn append_history(&self, record: SyncHistoryRecord) -> Result<()> {
        self.mutate(|state| state.append_history(record)).await
    }

    async fn history(&self, id: ConfigId) -> Result<Vec<SyncHistoryRecord>> {
        Ok(self.read(|state| state.history(id)).await)
    }
}
