// src/pipeline/diff.rs

//! Change detection for a sync pass.
//!
//! Compares the fingerprint of every successful extraction against the
//! tracked URL's stored fingerprint. Only changed URLs are persisted and
//! published; filtered and failed URLs keep their previous fingerprint.

use std::collections::HashMap;

use crate::models::{ExtractionResult, TrackedUrl};
use crate::storage::fingerprint;

/// A URL whose content differs from the stored fingerprint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangedUrl {
    pub url: String,
    pub text: String,
    pub digest: String,
}

/// Classification of every tracked URL after a batch run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeSet {
    pub changed: Vec<ChangedUrl>,
    pub unchanged: Vec<String>,
    pub filtered: Vec<String>,
    pub failed: Vec<String>,
}

impl ChangeSet {
    /// Check if there are any changes.
    pub fn has_changes(&self) -> bool {
        !self.changed.is_empty()
    }
}

/// Classify `tracked` URLs using the results of a run over them.
///
/// A URL missing from `results` counts as failed.
pub fn detect_changes(
    tracked: &[TrackedUrl],
    results: &HashMap<String, ExtractionResult>,
) -> ChangeSet {
    let mut changes = ChangeSet::default();

    for entry in tracked {
        match results.get(&entry.url) {
            Some(ExtractionResult::Success { text }) => {
                let digest = fingerprint(text);
                if entry.has_changed(&digest) {
                    changes.changed.push(ChangedUrl {
                        url: entry.url.clone(),
                        text: text.clone(),
                        digest,
                    });
                } else {
                    changes.unchanged.push(entry.url.clone());
                }
            }
            Some(ExtractionResult::Filtered { .. }) => changes.filtered.push(entry.url.clone()),
            Some(ExtractionResult::Error { .. }) | None => changes.failed.push(entry.url.clone()),
        }
    }

    changes
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ErrorKind, FilterReason};

    fn tracked(url: &str, content: Option<&str>) -> TrackedUrl {
        let mut tracked = TrackedUrl::new(1, url);
        tracked.last_content_hash = content.map(fingerprint);
        tracked
    }

    #[test]
    fn test_first_success_is_a_change() {
        let tracked = vec![tracked("https://a.example", None)];
        let results = HashMap::from([(
            "https://a.example".to_string(),
            ExtractionResult::success("hello"),
        )]);

        let changes = detect_changes(&tracked, &results);
        assert!(changes.has_changes());
        assert_eq!(changes.changed[0].digest, fingerprint("hello"));
        assert_eq!(changes.changed[0].text, "hello");
    }

    #[test]
    fn test_identical_text_is_unchanged() {
        let tracked = vec![
            tracked("https://a.example", Some("hello")),
            tracked("https://b.example", Some("old")),
        ];
        let results = HashMap::from([
            ("https://a.example".to_string(), ExtractionResult::success("hello")),
            ("https://b.example".to_string(), ExtractionResult::success("new")),
        ]);

        let changes = detect_changes(&tracked, &results);
        assert_eq!(changes.unchanged, vec!["https://a.example"]);
        assert_eq!(changes.changed.len(), 1);
        assert_eq!(changes.changed[0].url, "https://b.example");
    }

    #[test]
    fn test_filtered_and_failed_are_not_changes() {
        let tracked = vec![
            tracked("https://a.example", Some("hello")),
            tracked("https://b.example", None),
            tracked("https://c.example", None),
        ];
        let results = HashMap::from([
            (
                "https://a.example".to_string(),
                ExtractionResult::filtered(FilterReason::QueryMismatch),
            ),
            (
                "https://b.example".to_string(),
                ExtractionResult::error(ErrorKind::Timeout, "timed out"),
            ),
        ]);

        let changes = detect_changes(&tracked, &results);
        assert!(!changes.has_changes());
        assert_eq!(changes.filtered, vec!["https://a.example"]);
        assert_eq!(changes.failed, vec!["https://b.example", "https://c.example"]);
    }
}
