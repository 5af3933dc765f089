// src/models/result.rs

//! Per-URL extraction outcomes and batch progress counters.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Category of a per-URL failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// URL lacks a scheme or host
    InvalidUrl,
    /// HTTP 401 or 403
    Forbidden,
    /// Any other non-200 status
    HttpStatus(u16),
    /// Request exceeded the client timeout
    Timeout,
    /// Transport failure other than a timeout
    Network,
    /// Extraction produced empty or whitespace-only text
    NoContent,
    /// Extractor failed on the fetched document
    Extraction,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidUrl => f.write_str("invalid URL"),
            Self::Forbidden => f.write_str("forbidden"),
            Self::HttpStatus(code) => write!(f, "HTTP {code}"),
            Self::Timeout => f.write_str("timeout"),
            Self::Network => f.write_str("network error"),
            Self::NoContent => f.write_str("no content"),
            Self::Extraction => f.write_str("extraction error"),
        }
    }
}

/// Why a successfully extracted text was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "filter", rename_all = "snake_case")]
pub enum FilterReason {
    QueryMismatch,
    TooShort { min: usize, actual: usize },
    TooLong { max: usize, actual: usize },
    MissingText { text: String },
    ExcludedText { text: String },
}

impl FilterReason {
    /// Stable short code for the rejecting rule.
    pub fn code(&self) -> &'static str {
        match self {
            Self::QueryMismatch => "query-mismatch",
            Self::TooShort { .. } => "min_length",
            Self::TooLong { .. } => "max_length",
            Self::MissingText { .. } => "contains",
            Self::ExcludedText { .. } => "excludes",
        }
    }
}

impl fmt::Display for FilterReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::QueryMismatch => f.write_str("query-mismatch"),
            Self::TooShort { min, actual } => write!(f, "too short ({actual} < min {min})"),
            Self::TooLong { max, actual } => write!(f, "too long ({actual} > max {max})"),
            Self::MissingText { text } => write!(f, "does not contain '{text}'"),
            Self::ExcludedText { text } => write!(f, "contains excluded text '{text}'"),
        }
    }
}

/// Outcome of extracting one URL. Exactly one per URL per run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ExtractionResult {
    Success { text: String },
    Filtered { reason: FilterReason },
    Error { kind: ErrorKind, message: String },
}

impl ExtractionResult {
    pub fn success(text: impl Into<String>) -> Self {
        Self::Success { text: text.into() }
    }

    pub fn filtered(reason: FilterReason) -> Self {
        Self::Filtered { reason }
    }

    pub fn error(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self::Error {
            kind,
            message: message.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error { .. })
    }

    pub fn is_filtered(&self) -> bool {
        matches!(self, Self::Filtered { .. })
    }

    /// Extracted text, if the URL succeeded.
    pub fn text(&self) -> Option<&str> {
        match self {
            Self::Success { text } => Some(text),
            _ => None,
        }
    }
}

impl fmt::Display for ExtractionResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Success { text } => write!(f, "ok ({} chars)", text.chars().count()),
            Self::Filtered { reason } => write!(f, "filtered: {reason}"),
            Self::Error { kind, message } => write!(f, "error: {kind}: {message}"),
        }
    }
}

/// Counters for one in-flight batch run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchProgress {
    pub total_urls: usize,
    pub processed_urls: usize,
    pub failed_urls: usize,
    pub filtered_urls: usize,
    pub current_batch: usize,
    pub total_batches: usize,
}

impl BatchProgress {
    pub fn new(total_urls: usize, batch_size: usize) -> Self {
        Self {
            total_urls,
            total_batches: total_urls.div_ceil(batch_size.max(1)),
            ..Self::default()
        }
    }

    /// Record one finished URL.
    pub fn record(&mut self, result: &ExtractionResult) {
        self.processed_urls += 1;
        match result {
            ExtractionResult::Error { .. } => self.failed_urls += 1,
            ExtractionResult::Filtered { .. } => self.filtered_urls += 1,
            ExtractionResult::Success { .. } => {}
        }
    }

    pub fn is_complete(&self) -> bool {
        self.processed_urls == self.total_urls
    }
}
