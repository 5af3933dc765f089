// src/models/mod.rs

//! Domain models for the sync engine.
//!
//! This module contains all data structures used throughout the application,
//! organized by their primary purpose.

mod config;
mod request;
mod result;
mod sync;

// Re-export all public types
pub use config::{
    BatchConfig, Config, HttpConfig, SchedulerConfig, SinkConfig, SinkKind, StorageConfig,
};
pub use request::{
    ExtractionRequest, ExtractionRules, FILTER_CONTAINS, FILTER_EXCLUDES, FILTER_MAX_LENGTH,
    FILTER_MIN_LENGTH,
};
pub use result::{BatchProgress, ErrorKind, ExtractionResult, FilterReason};
pub use sync::{
    ConfigId, ConfigUpdate, NewSyncConfig, SyncConfig, SyncHistoryRecord, SyncStatus,
    SyncStatusReport, TrackedUrl,
};
