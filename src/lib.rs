// src/lib.rs

//! pagesync Library
//!
//! Extracts text from explicit URL sets and re-syncs them on a schedule,
//! publishing content whose fingerprint changed.

pub mod error;
pub mod models;
pub mod pipeline;
pub mod services;
pub mod storage;
pub mod utils;

#[cfg(test)]
pub(crate) mod testing;
