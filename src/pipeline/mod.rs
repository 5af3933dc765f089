// src/pipeline/mod.rs

//! Pipeline entry points for the sync engine.
//!
//! - `BatchPipeline`: Fetch, extract, and filter a URL set
//! - `detect_changes`: Compare results against stored fingerprints
//! - `Scheduler`: Run due sync configs on a timer

pub mod batch;
pub mod diff;
pub mod scheduler;

pub use batch::{BatchPipeline, BatchReport, RetryPolicy};
pub use diff::{ChangeSet, ChangedUrl, detect_changes};
pub use scheduler::{ConfigPhase, PassSummary, Scheduler};
