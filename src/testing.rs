// src/testing.rs

//! Test doubles shared by the unit tests. Nothing here touches the network.

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::{AppError, Result};
use crate::models::{
    ConfigId, ConfigUpdate, NewSyncConfig, SyncConfig, SyncHistoryRecord, TrackedUrl,
};
use crate::services::{FetchFailure, FetchedPage, Fetcher, Sink};
use crate::storage::{MemoryStore, SyncStore};

type Response = std::result::Result<FetchedPage, FetchFailure>;

/// Fetcher serving canned responses per URL.
///
/// Queued responses are served in order; the last one repeats.
#[derive(Default)]
pub struct StubFetcher {
    routes: Mutex<HashMap<String, VecDeque<Response>>>,
    calls: Mutex<Vec<String>>,
}

impl StubFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `html` with status 200, replacing earlier responses.
    pub fn page(self, url: &str, html: &str) -> Self {
        self.set_page(url, html);
        self
    }

    pub fn status(self, url: &str, status: u16) -> Self {
        self.respond(url, vec![Ok(FetchedPage::status(status))]);
        self
    }

    pub fn failure(self, url: &str, failure: FetchFailure) -> Self {
        self.respond(url, vec![Err(failure)]);
        self
    }

    pub fn sequence(self, url: &str, responses: Vec<Response>) -> Self {
        self.respond(url, responses);
        self
    }

    pub fn set_page(&self, url: &str, html: &str) {
        self.respond(url, vec![Ok(FetchedPage::ok(html))]);
    }

    fn respond(&self, url: &str, responses: Vec<Response>) {
        self.routes
            .lock()
            .unwrap()
            .insert(url.to_string(), responses.into());
    }

    /// Number of fetches issued for `url`.
    pub fn calls(&self, url: &str) -> usize {
        self.calls.lock().unwrap().iter().filter(|u| *u == url).count()
    }

    pub fn total_calls(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl Fetcher for StubFetcher {
    async fn fetch(&self, url: &str) -> Response {
        self.calls.lock().unwrap().push(url.to_string());
        let mut routes = self.routes.lock().unwrap();
        match routes.get_mut(url) {
            Some(queue) if queue.len() > 1 => queue.pop_front().unwrap(),
            Some(queue) => queue
                .front()
                .cloned()
                .unwrap_or_else(|| Err(FetchFailure::Network("empty route".into()))),
            None => Err(FetchFailure::Network(format!("no route for {url}"))),
        }
    }
}

/// One recorded `publish` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Publication {
    pub target_id: String,
    pub title: String,
    pub contents: BTreeMap<String, String>,
}

/// Sink that remembers every publication.
#[derive(Default)]
pub struct RecordingSink {
    published: Mutex<Vec<Publication>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn publications(&self) -> Vec<Publication> {
        self.published.lock().unwrap().clone()
    }
}

#[async_trait]
impl Sink for RecordingSink {
    async fn publish(
        &self,
        target_id: &str,
        title: &str,
        contents: &BTreeMap<String, String>,
    ) -> Result<String> {
        let mut published = self.published.lock().unwrap();
        published.push(Publication {
            target_id: target_id.to_string(),
            title: title.to_string(),
            contents: contents.clone(),
        });
        Ok(format!("memory://{target_id}/{}", published.len()))
    }
}

/// Sink that rejects every publication.
#[derive(Default)]
pub struct FailingSink;

#[async_trait]
impl Sink for FailingSink {
    async fn publish(
        &self,
        target_id: &str,
        _title: &str,
        _contents: &BTreeMap<String, String>,
    ) -> Result<String> {
        Err(AppError::sink(target_id, "HTTP 502"))
    }
}

/// Memory store whose tracked-URL reads or result writes can be switched off.
#[derive(Default)]
pub struct FailingStore {
    inner: MemoryStore,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
}

impl FailingStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    fn check(flag: &AtomicBool) -> Result<()> {
        if flag.load(Ordering::SeqCst) {
            Err(AppError::store("store unavailable"))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl SyncStore for FailingStore {
    async fn create_config(&self, new: NewSyncConfig) -> Result<SyncConfig> {
        self.inner.create_config(new).await
    }

    async fn get_config(&self, id: ConfigId) -> Result<SyncConfig> {
        self.inner.get_config(id).await
    }

    async fn list_configs(&self) -> Result<Vec<SyncConfig>> {
        self.inner.list_configs().await
    }

    async fn update_config(&self, id: ConfigId, update: ConfigUpdate) -> Result<SyncConfig> {
        self.inner.update_config(id, update).await
    }

    async fn add_urls(&self, id: ConfigId, urls: &[String]) -> Result<usize> {
        self.inner.add_urls(id, urls).await
    }

    async fn tracked_urls(&self, id: ConfigId) -> Result<Vec<TrackedUrl>> {
        Self::check(&self.fail_reads)?;
        self.inner.tracked_urls(id).await
    }

    async fn record_result(
        &self,
        id: ConfigId,
        url: &str,
        digest: &str,
        at: DateTime<Utc>,
    ) -> Result<()> {
        Self::check(&self.fail_writes)?;
        self.inner.record_result(id, url, digest, at).await
    }

    async fn mark_synced(&self, id: ConfigId, at: DateTime<Utc>) -> Result<()> {
        self.inner.mark_synced(id, at).await
    }

    async fn append_history(&self, record: SyncHistoryRecord) -> Result<()> {
        self.inner.append_history(record).await
    }

    async fn history(&self, id: ConfigId) -> Result<Vec<SyncHistoryRecord>> {
        self.inner.history(id).await
    }
}
