// src/services/filter.rs

//! Content filters applied to extracted text.

use std::collections::BTreeMap;

use crate::error::{AppError, Result};
use crate::models::{
    FILTER_CONTAINS, FILTER_EXCLUDES, FILTER_MAX_LENGTH, FILTER_MIN_LENGTH, FilterReason,
};

/// Parsed filter set, evaluated as min_length, max_length, contains, excludes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContentFilter {
    min_length: Option<usize>,
    max_length: Option<usize>,
    contains: Option<String>,
    excludes: Option<String>,
}

impl ContentFilter {
    /// Parse a kind-to-value map. Unknown kinds are ignored; non-numeric
    /// length values are a configuration error.
    pub fn from_map(filters: &BTreeMap<String, String>) -> Result<Self> {
        let mut filter = Self::default();
        for (kind, value) in filters {
            match kind.as_str() {
                FILTER_MIN_LENGTH => filter.min_length = Some(parse_length(kind, value)?),
                FILTER_MAX_LENGTH => filter.max_length = Some(parse_length(kind, value)?),
                FILTER_CONTAINS => filter.contains = non_empty(value),
                FILTER_EXCLUDES => filter.excludes = non_empty(value),
                other => log::debug!("Ignoring unknown filter kind '{}'", other),
            }
        }
        Ok(filter)
    }

    /// Return the first failing rule, or `None` when the text passes.
    pub fn evaluate(&self, text: &str) -> Option<FilterReason> {
        let length = text.chars().count();

        if let Some(min) = self.min_length {
            if length < min {
                return Some(FilterReason::TooShort {
                    min,
                    actual: length,
                });
            }
        }
        if let Some(max) = self.max_length {
            if length > max {
                return Some(FilterReason::TooLong {
                    max,
                    actual: length,
                });
            }
        }

        let lowered = text.to_lowercase();
        if let Some(required) = &self.contains {
            if !lowered.contains(&required.to_lowercase()) {
                return Some(FilterReason::MissingText {
                    text: required.clone(),
                });
            }
        }
        if let Some(excluded) = &self.excludes {
            if lowered.contains(&excluded.to_lowercase()) {
                return Some(FilterReason::ExcludedText {
                    text: excluded.clone(),
                });
            }
        }
        None
    }
}

/// Case-insensitive search-query check.
pub fn matches_query(text: &str, query: &str) -> bool {
    text.to_lowercase().contains(&query.to_lowercase())
}

fn parse_length(kind: &str, value: &str) -> Result<usize> {
    value.trim().parse().map_err(|_| {
        AppError::validation(format!(
            "filter {kind} expects a non-negative integer, got '{value}'"
        ))
    })
}

fn non_empty(value: &str) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filter(pairs: &[(&str, &str)]) -> ContentFilter {
        let map = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ContentFilter::from_map(&map).unwrap()
    }

    #[test]
    fn test_min_length_reported_before_contains() {
        let f = filter(&[("min_length", "10"), ("contains", "x")]);
        assert_eq!(
            f.evaluate("hello"),
            Some(FilterReason::TooShort { min: 10, actual: 5 })
        );
    }

    #[test]
    fn test_max_length() {
        let f = filter(&[("max_length", "3")]);
        assert_eq!(
            f.evaluate("hello"),
            Some(FilterReason::TooLong { max: 3, actual: 5 })
        );
        assert_eq!(f.evaluate("hey"), None);
    }

    #[test]
    fn test_length_counts_characters() {
        let f = filter(&[("max_length", "4")]);
        assert_eq!(f.evaluate("장학금안"), None);
    }

    #[test]
    fn test_contains_is_case_insensitive() {
        let f = filter(&[("contains", "RUST")]);
        assert_eq!(f.evaluate("written in rust"), None);
        assert_eq!(
            f.evaluate("written in go"),
            Some(FilterReason::MissingText {
                text: "RUST".into()
            })
        );
    }

    #[test]
    fn test_excludes_is_case_insensitive() {
        let f = filter(&[("excludes", "Sponsored")]);
        assert!(f.evaluate("a SPONSORED post").is_some());
        assert!(f.evaluate("an article").is_none());
    }

    #[test]
    fn test_contains_checked_before_excludes() {
        let f = filter(&[("excludes", "ad"), ("contains", "zzz")]);
        assert_eq!(f.evaluate("an ad").unwrap().code(), "contains");
    }

    #[test]
    fn test_unknown_kinds_ignored() {
        let f = filter(&[("language", "en")]);
        assert_eq!(f, ContentFilter::default());
        assert_eq!(f.evaluate("anything"), None);
    }

    #[test]
    fn test_non_numeric_length_rejected() {
        let map = [("min_length".to_string(), "ten".to_string())]
            .into_iter()
            .collect();
        assert!(matches!(
            ContentFilter::from_map(&map),
            Err(AppError::Validation(_))
        ));
    }

    #[test]
    fn test_matches_query() {
        assert!(matches_query("Async Rust Book", "rust"));
        assert!(!matches_query("Async Rust Book", "python"));
    }
}
