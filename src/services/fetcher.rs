// src/services/fetcher.rs

//! Document fetching.

use async_trait::async_trait;
use reqwest::Client;

use crate::error::Result;
use crate::models::HttpConfig;
use crate::utils::http::create_async_client;

/// Raw response of a fetch. The body is only read for status 200.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedPage {
    pub status: u16,
    pub body: String,
}

impl FetchedPage {
    pub fn ok(body: impl Into<String>) -> Self {
        Self {
            status: 200,
            body: body.into(),
        }
    }

    pub fn status(status: u16) -> Self {
        Self {
            status,
            body: String::new(),
        }
    }
}

/// Transport-level failure; HTTP statuses are not failures here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchFailure {
    Timeout(String),
    Network(String),
}

/// Source of raw documents for the batch pipeline.
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> std::result::Result<FetchedPage, FetchFailure>;
}

/// Fetcher over a single pooled `reqwest` client.
#[derive(Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(config: &HttpConfig) -> Result<Self> {
        Ok(Self {
            client: create_async_client(config)?,
        })
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> std::result::Result<FetchedPage, FetchFailure> {
        let response = self.client.get(url).send().await.map_err(classify)?;
        let status = response.status().as_u16();
        if status != 200 {
            return Ok(FetchedPage::status(status));
        }
        let body = response.text().await.map_err(classify)?;
        Ok(FetchedPage { status, body })
    }
}

fn classify(error: reqwest::Error) -> FetchFailure {
    if error.is_timeout() {
        FetchFailure::Timeout(error.to_string())
    } else {
        FetchFailure::Network(error.to_string())
    }
}
