// src/models/request.rs

//! Extraction request shapes.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// Filter kind: reject text shorter than the value (characters).
pub const FILTER_MIN_LENGTH: &str = "min_length";
/// Filter kind: reject text longer than the value (characters).
pub const FILTER_MAX_LENGTH: &str = "max_length";
/// Filter kind: reject text that does not contain the value.
pub const FILTER_CONTAINS: &str = "contains";
/// Filter kind: reject text that contains the value.
pub const FILTER_EXCLUDES: &str = "excludes";

/// Extraction settings shared by every URL of one batch run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionRules {
    /// Content selectors, applied in order
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub content_selectors: Vec<String>,

    /// Selector for code blocks
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code_selector: Option<String>,

    /// Selector for elements whose text is dropped
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exclude_selector: Option<String>,

    /// Case-insensitive text the extracted content must contain
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search_query: Option<String>,

    /// Filter kind to value; unknown kinds are ignored
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub filters: BTreeMap<String, String>,
}

impl ExtractionRules {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_content_selector(mut self, selector: impl Into<String>) -> Self {
        let selector = selector.into();
        if !selector.trim().is_empty() && !self.content_selectors.contains(&selector) {
            self.content_selectors.push(selector);
        }
        self
    }

    pub fn with_code_selector(mut self, selector: impl Into<String>) -> Self {
        self.code_selector = non_blank(selector.into());
        self
    }

    pub fn with_exclude_selector(mut self, selector: impl Into<String>) -> Self {
        self.exclude_selector = non_blank(selector.into());
        self
    }

    pub fn with_search_query(mut self, query: impl Into<String>) -> Self {
        self.search_query = non_blank(query.into());
        self
    }

    pub fn with_filter(mut self, kind: impl Into<String>, value: impl Into<String>) -> Self {
        self.filters.insert(kind.into(), value.into());
        self
    }

    /// Build the request for a single URL.
    pub fn request_for(self: &Arc<Self>, url: impl Into<String>) -> ExtractionRequest {
        ExtractionRequest {
            url: url.into(),
            rules: Arc::clone(self),
        }
    }
}

/// A single URL paired with the rules it is extracted under.
#[derive(Debug, Clone)]
pub struct ExtractionRequest {
    pub url: String,
    pub rules: Arc<ExtractionRules>,
}

fn non_blank(value: String) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_values_are_dropped() {
        let rules = ExtractionRules::new()
            .with_content_selector("  ")
            .with_code_selector("")
            .with_search_query("   ");
        assert!(rules.content_selectors.is_empty());
        assert!(rules.code_selector.is_none());
        assert!(rules.search_query.is_none());
    }

    #[test]
    fn test_content_selectors_keep_order_without_duplicates() {
        let rules = ExtractionRules::new()
            .with_content_selector("article")
            .with_content_selector("p")
            .with_content_selector("article");
        assert_eq!(rules.content_selectors, vec!["article", "p"]);
    }

    #[test]
    fn test_request_shares_rules() {
        let rules = Arc::new(ExtractionRules::new().with_code_selector("pre"));
        let a = rules.request_for("https://a.example");
        let b = rules.request_for("https://b.example");
        assert!(Arc::ptr_eq(&a.rules, &b.rules));
        assert_eq!(b.url, "https://b.example");
    }
}
