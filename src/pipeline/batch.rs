// src/pipeline/batch.rs

//! Batch fetch/extract pipeline.
//!
//! URLs are split into sequential chunks; inside a chunk fetches run
//! concurrently, capped at `max_concurrent`. Per-URL failures become
//! [`ExtractionResult::Error`] values and never abort the run.

use std::any::Any;
use std::collections::{HashMap, HashSet};
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures::{FutureExt, StreamExt, stream};

use crate::error::Result;
use crate::models::{
    BatchConfig, BatchProgress, Config, ErrorKind, ExtractionRequest, ExtractionResult,
    ExtractionRules, FilterReason, HttpConfig,
};
use crate::services::{
    ContentFilter, Extractor, FetchFailure, FetchedPage, Fetcher, HtmlExtractor, HttpFetcher,
    SelectorRules, matches_query,
};
use crate::utils::parse_target_url;

/// Retry settings for transient fetch failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Extra attempts after the first one
    pub max_retries: u32,
    /// Delay unit; attempt `n` waits `n * backoff`
    pub backoff: Duration,
}

impl RetryPolicy {
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            backoff: Duration::ZERO,
        }
    }

    pub fn from_http(config: &HttpConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            backoff: Duration::from_millis(config.retry_backoff_ms),
        }
    }
}

/// Outcome of one pipeline run.
#[derive(Debug, Clone, Default)]
pub struct BatchReport {
    /// Exactly one entry per distinct input URL
    pub results: HashMap<String, ExtractionResult>,
    pub progress: BatchProgress,
}

/// Settings compiled once per run, before any network call.
struct RunContext {
    selectors: SelectorRules,
    filter: ContentFilter,
}

/// Fetches, extracts, and filters URL sets.
#[derive(Clone)]
pub struct BatchPipeline {
    fetcher: Arc<dyn Fetcher>,
    extractor: Arc<dyn Extractor>,
    batch_size: usize,
    max_concurrent: usize,
    retry: RetryPolicy,
}

impl BatchPipeline {
    pub fn new(
        fetcher: Arc<dyn Fetcher>,
        extractor: Arc<dyn Extractor>,
        batch: &BatchConfig,
    ) -> Self {
        Self {
            fetcher,
            extractor,
            batch_size: batch.batch_size.max(1),
            max_concurrent: batch.max_concurrent.max(1),
            retry: RetryPolicy::none(),
        }
    }

    /// Pipeline over HTTP with the HTML extractor, as configured.
    pub fn from_config(config: &Config) -> Result<Self> {
        let fetcher = Arc::new(HttpFetcher::new(&config.http)?);
        Ok(Self::new(fetcher, Arc::new(HtmlExtractor::new()), &config.batch)
            .with_retry(RetryPolicy::from_http(&config.http)))
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Process `urls` under `rules`.
    ///
    /// Fails only when the rules themselves are malformed; that check runs
    /// before anything is fetched. Duplicate URLs are processed once.
    pub async fn run(&self, urls: &[String], rules: &ExtractionRules) -> Result<BatchReport> {
        let context = RunContext {
            selectors: SelectorRules::compile(rules)?,
            filter: ContentFilter::from_map(&rules.filters)?,
        };
        let rules = Arc::new(rules.clone());

        let urls: Vec<String> = {
            let mut seen = HashSet::new();
            urls.iter()
                .filter(|url| seen.insert(url.as_str()))
                .cloned()
                .collect()
        };

        let mut progress = BatchProgress::new(urls.len(), self.batch_size);
        let mut results = HashMap::with_capacity(urls.len());

        for (index, chunk) in urls.chunks(self.batch_size).enumerate() {
            progress.current_batch = index + 1;
            log::debug!(
                "Batch {}/{}: {} URLs",
                progress.current_batch,
                progress.total_batches,
                chunk.len()
            );

            let context = &context;
            let requests: Vec<ExtractionRequest> = chunk
                .iter()
                .map(|url| rules.request_for(url.clone()))
                .collect();
            let mut outcomes = stream::iter(requests)
                .map(|request| async move {
                    let result = self.process_guarded(&request, context).await;
                    (request.url, result)
                })
                .buffer_unordered(self.max_concurrent);

            while let Some((url, result)) = outcomes.next().await {
                progress.record(&result);
                match &result {
                    ExtractionResult::Error { .. } => log::warn!("{}: {}", url, result),
                    _ => log::debug!("{}: {}", url, result),
                }
                results.insert(url, result);
            }
        }

        log::info!(
            "Batch run finished: {} URLs, {} failed, {} filtered",
            progress.processed_urls,
            progress.failed_urls,
            progress.filtered_urls
        );
        Ok(BatchReport { results, progress })
    }

    /// Process one URL, turning a panic into an extraction error.
    async fn process_guarded(
        &self,
        request: &ExtractionRequest,
        context: &RunContext,
    ) -> ExtractionResult {
        match AssertUnwindSafe(self.process(request, context))
            .catch_unwind()
            .await
        {
            Ok(result) => result,
            Err(panic) => ExtractionResult::error(ErrorKind::Extraction, panic_message(&*panic)),
        }
    }

    async fn process(&self, request: &ExtractionRequest, context: &RunContext) -> ExtractionResult {
        let url = request.url.trim();
        if parse_target_url(url).is_none() {
            return ExtractionResult::error(
                ErrorKind::InvalidUrl,
                format!("'{url}' needs a scheme and a host"),
            );
        }

        let page = match self.fetch_with_retry(url).await {
            Ok(page) => page,
            Err(error) => return error,
        };
        match page.status {
            200 => {}
            401 | 403 => {
                return ExtractionResult::error(
                    ErrorKind::Forbidden,
                    format!("HTTP {}", page.status),
                );
            }
            status => {
                return ExtractionResult::error(
                    ErrorKind::HttpStatus(status),
                    format!("HTTP {status}"),
                );
            }
        }

        let text = match self.extractor.extract(&page.body, &context.selectors) {
            Some(text) if !text.trim().is_empty() => text,
            _ => return ExtractionResult::error(ErrorKind::NoContent, "no content extracted"),
        };

        if let Some(query) = &request.rules.search_query {
            if !matches_query(&text, query) {
                return ExtractionResult::filtered(FilterReason::QueryMismatch);
            }
        }
        if let Some(reason) = context.filter.evaluate(&text) {
            return ExtractionResult::filtered(reason);
        }

        ExtractionResult::success(text)
    }

    /// Fetch, retrying timeouts, transport errors, 429 and 5xx.
    async fn fetch_with_retry(
        &self,
        url: &str,
    ) -> std::result::Result<FetchedPage, ExtractionResult> {
        let mut attempt = 0;
        loop {
            let outcome = self.fetcher.fetch(url).await;
            let transient = match &outcome {
                Ok(page) => page.status == 429 || (500..600).contains(&page.status),
                Err(_) => true,
            };
            if !transient || attempt >= self.retry.max_retries {
                return outcome.map_err(|failure| match failure {
                    FetchFailure::Timeout(message) => {
                        ExtractionResult::error(ErrorKind::Timeout, message)
                    }
                    FetchFailure::Network(message) => {
                        ExtractionResult::error(ErrorKind::Network, message)
                    }
                });
            }

            attempt += 1;
            log::debug!(
                "Retrying {} (attempt {}/{})",
                url,
                attempt,
                self.retry.max_retries
            );
            tokio::time::sleep(self.retry.backoff * attempt).await;
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        format!("extractor panicked: {message}")
    } else if let Some(message) = panic.downcast_ref::<String>() {
        format!("extractor panicked: {message}")
    } else {
        "extractor panicked".to_string()
    }
}
