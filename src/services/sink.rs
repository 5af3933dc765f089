// src/services/sink.rs

//! Downstream publishing of changed content.
//!
//! Delivery is best-effort: callers log a failed `publish` and move on.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use tokio::io::AsyncWriteExt;

use crate::error::{AppError, Result};
use crate::models::{SinkConfig, SinkKind};
use crate::storage::fingerprint;
use crate::utils::slugify;

const TITLE_SLUG_MAX: usize = 80;

/// Receiver of changed content, keyed by URL.
#[async_trait]
pub trait Sink: Send + Sync {
    /// Publish a page and return where it landed.
    async fn publish(
        &self,
        target_id: &str,
        title: &str,
        contents: &BTreeMap<String, String>,
    ) -> Result<String>;
}

/// Build the sink selected in configuration.
pub fn build_sink(config: &SinkConfig) -> Result<Arc<dyn Sink>> {
    let sink: Arc<dyn Sink> = match config.kind {
        SinkKind::Log => Arc::new(LogSink),
        SinkKind::File => {
            let dir = config
                .dir
                .clone()
                .ok_or_else(|| AppError::config("sink.dir is required for file"))?;
            Arc::new(FileSink::new(dir))
        }
        SinkKind::Webhook => {
            let endpoint = config
                .endpoint
                .clone()
                .ok_or_else(|| AppError::config("sink.endpoint is required for webhook"))?;
            Arc::new(WebhookSink::new(endpoint, config.timeout_secs)?)
        }
    };
    Ok(sink)
}

/// Logs publications without delivering them anywhere.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogSink;

#[async_trait]
impl Sink for LogSink {
    async fn publish(
        &self,
        target_id: &str,
        title: &str,
        contents: &BTreeMap<String, String>,
    ) -> Result<String> {
        for (url, text) in contents {
            log::info!(
                "[{}] {}: {} ({} chars)",
                target_id,
                title,
                url,
                text.chars().count()
            );
        }
        Ok(format!("log://{target_id}"))
    }
}

/// Writes each publication as a Markdown file under `<dir>/<target>/`.
#[derive(Debug, Clone)]
pub struct FileSink {
    root_dir: PathBuf,
}

impl FileSink {
    pub fn new(root_dir: impl Into<PathBuf>) -> Self {
        Self {
            root_dir: root_dir.into(),
        }
    }

    /// Title slug plus a digest of the published URLs, unique per URL set.
    fn file_stem(title: &str, contents: &BTreeMap<String, String>) -> String {
        let mut slug = slugify(title);
        slug.truncate(TITLE_SLUG_MAX);
        let urls: Vec<&str> = contents.keys().map(String::as_str).collect();
        let digest = fingerprint(&urls.join("\n"));
        format!("{}-{}", slug.trim_end_matches('-'), &digest[..12])
    }

    fn render(title: &str, contents: &BTreeMap<String, String>) -> String {
        let mut page = format!("# {title}\n\n");
        for (url, text) in contents {
            page.push_str(&format!("## {url}\n\n{text}\n\n---\n\n"));
        }
        page
    }
}

#[async_trait]
impl Sink for FileSink {
    async fn publish(
        &self,
        target_id: &str,
        title: &str,
        contents: &BTreeMap<String, String>,
    ) -> Result<String> {
        let dir = self.root_dir.join(slugify(target_id));
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|e| AppError::sink(target_id, e))?;

        let path = dir.join(format!("{}.md", Self::file_stem(title, contents)));

        let tmp = path.with_extension("tmp");
        let write = async {
            let mut file = tokio::fs::File::create(&tmp).await?;
            file.write_all(Self::render(title, contents).as_bytes())
                .await?;
            file.flush().await?;
            drop(file);
            tokio::fs::rename(&tmp, &path).await
        };
        write.await.map_err(|e| AppError::sink(target_id, e))?;

        Ok(path.display().to_string())
    }
}

#[derive(Serialize)]
struct WebhookPayload<'a> {
    target_id: &'a str,
    title: &'a str,
    contents: &'a BTreeMap<String, String>,
}

/// POSTs publications as JSON to an HTTP endpoint.
#[derive(Debug, Clone)]
pub struct WebhookSink {
    client: Client,
    endpoint: String,
}

impl WebhookSink {
    pub fn new(endpoint: impl Into<String>, timeout_secs: u64) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
        })
    }
}

#[async_trait]
impl Sink for WebhookSink {
    async fn publish(
        &self,
        target_id: &str,
        title: &str,
        contents: &BTreeMap<String, String>,
    ) -> Result<String> {
        let payload = WebhookPayload {
            target_id,
            title,
            contents,
        };
        let response = self
            .client
            .post(&self.endpoint)
            .json(&payload)
            .send()
            .await
            .map_err(|e| AppError::sink(target_id, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::sink(target_id, format!("HTTP {status}")));
        }

        // A reply without a usable `location` still counts as delivered
        let location = response
            .json::<serde_json::Value>()
            .await
            .ok()
            .and_then(|body| body.get("location")?.as_str().map(String::from))
            .unwrap_or_else(|| self.endpoint.clone());
        Ok(location)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn contents() -> BTreeMap<String, String> {
        [(
            "https://a.example/docs".to_string(),
            "Install the toolchain.".to_string(),
        )]
        .into_iter()
        .collect()
    }

    #[tokio::test]
    async fn test_log_sink_location() {
        let location = LogSink.publish("doc-1", "Docs", &contents()).await.unwrap();
        assert_eq!(location, "log://doc-1");
    }

    #[tokio::test]
    async fn test_file_sink_writes_markdown() {
        let tmp = TempDir::new().unwrap();
        let sink = FileSink::new(tmp.path());

        let location = sink
            .publish("Doc 1", "Docs - 2026-01-02 10:30", &contents())
            .await
            .unwrap();

        let written = std::fs::read_to_string(&location).unwrap();
        assert!(location.contains("doc-1"));
        assert!(written.starts_with("# Docs - 2026-01-02 10:30"));
        assert!(written.contains("## https://a.example/docs"));
        assert!(written.contains("Install the toolchain."));
    }

    #[tokio::test]
    async fn test_file_sink_keeps_urls_with_shared_prefix_apart() {
        let tmp = TempDir::new().unwrap();
        let sink = FileSink::new(tmp.path());
        let prefix = format!("https://a.example/{}", "reference/".repeat(20));

        let mut locations = Vec::new();
        for section in ["alpha", "beta"] {
            let page: BTreeMap<String, String> =
                [(format!("{prefix}{section}"), format!("{section} body"))]
                    .into_iter()
                    .collect();
            locations.push(sink.publish("doc", "Docs", &page).await.unwrap());
        }

        assert_ne!(locations[0], locations[1]);
        assert!(std::fs::read_to_string(&locations[0]).unwrap().contains("alpha body"));
        assert!(std::fs::read_to_string(&locations[1]).unwrap().contains("beta body"));
    }

    #[test]
    fn test_build_sink_requires_settings() {
        let config = SinkConfig {
            kind: SinkKind::Webhook,
            ..SinkConfig::default()
        };
        assert!(build_sink(&config).is_err());
        assert!(build_sink(&SinkConfig::default()).is_ok());
    }
}
