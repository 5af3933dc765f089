// src/error.rs

//! Unified error handling for the sync engine.
//!
//! Per-URL failures are never raised through this type; they travel as
//! [`ExtractionResult::Error`](crate::models::ExtractionResult) values.

use std::fmt;

use thiserror::Error;

use crate::services::SelectorError;

/// Result type alias for engine operations.
pub type Result<T> = std::result::Result<T, AppError>;

/// Unified application error type.
#[derive(Error, Debug)]
pub enum AppError {
    /// I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP client failed outside of a per-URL fetch
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parsing failed
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// TOML serialization failed
    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    /// URL parsing failed
    #[error("URL parse error: {0}")]
    Url(#[from] url::ParseError),

    /// Selector failed grammar validation or compilation
    #[error(transparent)]
    Selector(#[from] SelectorError),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Data validation error
    #[error("Validation error: {0}")]
    Validation(String),

    /// Persistence layer failed
    #[error("Store error: {0}")]
    Store(String),

    /// Downstream publishing failed
    #[error("Sink error for {target}: {message}")]
    Sink { target: String, message: String },

    /// Requested record does not exist
    #[error("Not found: {0}")]
    NotFound(String),
}

impl AppError {
    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Create a persistence error.
    pub fn store(message: impl fmt::Display) -> Self {
        Self::Store(message.to_string())
    }

    /// Create a sink error with the publishing target as context.
    pub fn sink(target: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::Sink {
            target: target.into(),
            message: message.to_string(),
        }
    }

    /// Create a not-found error.
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }

    /// Whether this error came from the persistence layer.
    pub fn is_store(&self) -> bool {
        matches!(self, Self::Store(_) | Self::Io(_) | Self::Json(_))
    }
}
