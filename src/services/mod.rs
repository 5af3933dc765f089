// src/services/mod.rs

//! Service layer for the sync engine.
//!
//! This module contains the leaf capabilities the pipeline is built from:
//! - Selector validation (`validate_selector`, `compile_selector`)
//! - Text extraction (`Extractor`, `HtmlExtractor`)
//! - Document fetching (`Fetcher`, `HttpFetcher`)
//! - Content filtering (`ContentFilter`)
//! - Downstream publishing (`Sink` and its backends)
//! - Result export (`render`)

mod export;
mod extractor;
mod fetcher;
mod filter;
mod selectors;
mod sink;

pub use export::{OutputFormat, render};
pub use extractor::{Extractor, HtmlExtractor, SelectorRules};
pub use fetcher::{FetchFailure, FetchedPage, Fetcher, HttpFetcher};
pub use filter::{ContentFilter, matches_query};
pub use selectors::{SelectorError, SelectorErrorReason, compile_selector, validate_selector};
pub use sink::{FileSink, LogSink, Sink, WebhookSink, build_sink};
