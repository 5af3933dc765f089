// src/pipeline/scheduler.rs

//! Change-detection scheduler.
//!
//! Each tick selects the due configs, claims them, and runs one pass per
//! config: batch run over its tracked URLs, fingerprint comparison, publish
//! of changed content, and a history record.
//!
//! Claims live in process memory, so a single scheduler instance per store
//! is assumed.

use std::collections::{BTreeMap, HashSet};
use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures::future::join_all;
use serde::Serialize;
use tokio::sync::Semaphore;
use tokio::task::{JoinError, JoinSet};
use tokio::time::MissedTickBehavior;

use crate::error::Result;
use crate::models::{ConfigId, SchedulerConfig, SyncConfig, SyncHistoryRecord, SyncStatus};
use crate::pipeline::BatchPipeline;
use crate::pipeline::diff::detect_changes;
use crate::services::Sink;
use crate::storage::SyncStore;

/// Where a config currently is in its pass cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfigPhase {
    /// Not due, or inactive
    Idle,
    /// Interval elapsed, waiting for the next tick
    Due,
    /// Claimed by an in-flight pass
    Running,
}

/// Counts from one config pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PassSummary {
    pub config_id: ConfigId,
    pub status: SyncStatus,
    pub processed: usize,
    pub changed: usize,
    pub unchanged: usize,
    pub filtered: usize,
    pub failed: usize,
    pub published: usize,
    pub sink_failures: usize,
}

impl PassSummary {
    fn failed(config_id: ConfigId) -> Self {
        Self {
            config_id,
            status: SyncStatus::Error,
            processed: 0,
            changed: 0,
            unchanged: 0,
            filtered: 0,
            failed: 0,
            published: 0,
            sink_failures: 0,
        }
    }
}

type ClaimSet = Arc<Mutex<HashSet<ConfigId>>>;

/// Exclusive right to run a pass for one config. Released on drop.
struct Claim {
    claims: ClaimSet,
    config_id: ConfigId,
}

impl Drop for Claim {
    fn drop(&mut self) {
        self.claims
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.config_id);
    }
}

/// Polls the store for due configs and runs their passes.
#[derive(Clone)]
pub struct Scheduler {
    store: Arc<dyn SyncStore>,
    sink: Arc<dyn Sink>,
    pipeline: Arc<BatchPipeline>,
    config: SchedulerConfig,
    claims: ClaimSet,
    permits: Arc<Semaphore>,
}

impl Scheduler {
    pub fn new(
        store: Arc<dyn SyncStore>,
        sink: Arc<dyn Sink>,
        pipeline: BatchPipeline,
        config: SchedulerConfig,
    ) -> Self {
        let permits = Arc::new(Semaphore::new(config.max_concurrent_configs.max(1)));
        Self {
            store,
            sink,
            pipeline: Arc::new(pipeline),
            config,
            claims: Arc::default(),
            permits,
        }
    }

    fn try_claim(&self, config_id: ConfigId) -> Option<Claim> {
        let mut claims = self
            .claims
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        claims.insert(config_id).then(|| Claim {
            claims: Arc::clone(&self.claims),
            config_id,
        })
    }

    fn is_claimed(&self, config_id: ConfigId) -> bool {
        self.claims
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(&config_id)
    }

    /// Current phase of a config.
    pub async fn phase(&self, config_id: ConfigId, now: DateTime<Utc>) -> Result<ConfigPhase> {
        if self.is_claimed(config_id) {
            return Ok(ConfigPhase::Running);
        }
        let config = self.store.get_config(config_id).await?;
        Ok(if config.is_due(now) {
            ConfigPhase::Due
        } else {
            ConfigPhase::Idle
        })
    }

    /// Due configs that are not already running, each with its claim.
    async fn claim_due(&self, now: DateTime<Utc>) -> Result<Vec<(SyncConfig, Claim)>> {
        let due = self.store.due_configs(now).await?;
        let mut claimed = Vec::with_capacity(due.len());
        for config in due {
            match self.try_claim(config.id) {
                Some(claim) => claimed.push((config, claim)),
                None => log::debug!("Config {} still running, skipping", config.id),
            }
        }
        Ok(claimed)
    }

    /// Run one tick and wait for every pass it started.
    pub async fn run_once(&self, now: DateTime<Utc>) -> Result<Vec<PassSummary>> {
        let claimed = self.claim_due(now).await?;
        if claimed.is_empty() {
            log::debug!("No due configs");
            return Ok(Vec::new());
        }
        log::info!("Starting {} sync passes", claimed.len());

        let passes = claimed
            .into_iter()
            .map(|(config, claim)| self.run_pass(config, claim, now));
        Ok(join_all(passes).await)
    }

    /// Tick until `shutdown` resolves, then wait for in-flight passes.
    ///
    /// Passes run as spawned tasks, so a slow config never delays the
    /// selection of others. Pass failures and panics are logged and the loop
    /// keeps ticking.
    pub async fn run(&self, shutdown: impl Future<Output = ()>) -> Result<()> {
        let mut ticker = tokio::time::interval(Duration::from_secs(
            self.config.poll_interval_secs.max(1),
        ));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut passes: JoinSet<PassSummary> = JoinSet::new();
        tokio::pin!(shutdown);

        log::info!(
            "Scheduler started (poll every {}s, up to {} concurrent configs)",
            self.config.poll_interval_secs,
            self.config.max_concurrent_configs
        );

        loop {
            tokio::select! {
                _ = &mut shutdown => break,
                _ = ticker.tick() => {
                    let now = Utc::now();
                    match self.claim_due(now).await {
                        Ok(claimed) => {
                            for (config, claim) in claimed {
                                let scheduler = self.clone();
                                passes.spawn(async move {
                                    scheduler.run_pass(config, claim, now).await
                                });
                            }
                        }
                        Err(e) => log::error!("Failed to select due configs: {}", e),
                    }
                }
                Some(joined) = passes.join_next(), if !passes.is_empty() => log_joined(joined),
            }
        }

        if !passes.is_empty() {
            log::info!("Shutdown requested, waiting for {} passes", passes.len());
        }
        while let Some(joined) = passes.join_next().await {
            log_joined(joined);
        }
        log::info!("Scheduler stopped");
        Ok(())
    }

    /// Run a claimed pass; the claim is released when this returns.
    async fn run_pass(&self, config: SyncConfig, claim: Claim, now: DateTime<Utc>) -> PassSummary {
        let _claim = claim;
        let _permit = self.permits.acquire().await.ok();

        match self.sync_config(&config, now).await {
            Ok(summary) => {
                log::info!(
                    "Config {} synced: {} processed, {} changed, {} unchanged, {} filtered, {} failed",
                    summary.config_id,
                    summary.processed,
                    summary.changed,
                    summary.unchanged,
                    summary.filtered,
                    summary.failed
                );
                summary
            }
            Err(e) => {
                log::error!("Sync pass for config {} failed: {}", config.id, e);
                let record = SyncHistoryRecord::error(config.id, e.to_string(), now);
                if let Err(history_err) = self.store.append_history(record).await {
                    log::error!(
                        "Could not record failure of config {}: {}",
                        config.id,
                        history_err
                    );
                }
                PassSummary::failed(config.id)
            }
        }
    }

    async fn sync_config(&self, config: &SyncConfig, now: DateTime<Utc>) -> Result<PassSummary> {
        let tracked = self.store.tracked_urls(config.id).await?;
        let urls: Vec<String> = tracked.iter().map(|t| t.url.clone()).collect();
        log::debug!("Config {}: {} tracked URLs", config.id, urls.len());

        let report = self.pipeline.run(&urls, &config.extraction_rules()).await?;
        let changes = detect_changes(&tracked, &report.results);

        let title = config.page_title(now);
        let mut published = 0;
        let mut sink_failures = 0;
        for change in &changes.changed {
            self.store
                .record_result(config.id, &change.url, &change.digest, now)
                .await?;

            let contents = BTreeMap::from([(change.url.clone(), change.text.clone())]);
            match self.sink.publish(&config.doc_id, &title, &contents).await {
                Ok(location) => {
                    published += 1;
                    log::info!("Published {} to {}", change.url, location);
                }
                Err(e) => {
                    sink_failures += 1;
                    log::warn!("Publishing {} failed: {}", change.url, e);
                }
            }
        }

        self.store.mark_synced(config.id, now).await?;
        self.store
            .append_history(SyncHistoryRecord::completed(
                config.id,
                report.progress.processed_urls,
                changes.changed.len(),
                report.progress.failed_urls,
                now,
            ))
            .await?;

        Ok(PassSummary {
            config_id: config.id,
            status: SyncStatus::Completed,
            processed: report.progress.processed_urls,
            changed: changes.changed.len(),
            unchanged: changes.unchanged.len(),
            filtered: changes.filtered.len(),
            failed: report.progress.failed_urls,
            published,
            sink_failures,
        })
    }
}

fn log_joined(joined: std::result::Result<PassSummary, JoinError>) {
    match joined {
        Ok(summary) if summary.status == SyncStatus::Error => {
            log::warn!("Config {} will be retried next tick", summary.config_id);
        }
        Ok(_) => {}
        Err(e) if e.is_panic() => log::error!("Sync pass panicked: {}", e),
        Err(e) => log::error!("Sync pass aborted: {}", e),
    }
}
