// src/utils/mod.rs

//! Utility functions and helpers.

pub mod http;

use url::Url;

/// Parse `url`, requiring both a scheme and a host.
pub fn parse_target_url(url: &str) -> Option<Url> {
    let parsed = Url::parse(url.trim()).ok()?;
    if parsed.scheme().is_empty() || parsed.host_str().is_none_or(str::is_empty) {
        return None;
    }
    Some(parsed)
}

/// Lowercase ASCII slug for file names.
pub fn slugify(text: &str) -> String {
    let mut slug = String::with_capacity(text.len());
    for c in text.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
        } else if !slug.ends_with('-') && !slug.is_empty() {
            slug.push('-');
        }
    }
    let slug = slug.trim_end_matches('-').to_string();
    if slug.is_empty() { "page".to_string() } else { slug }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_urls() {
        assert!(parse_target_url("https://a.example").is_some());
        assert!(parse_target_url("http://sub.example.com:8080/path?q=1").is_some());
        assert!(parse_target_url("  https://a.example/  ").is_some());
    }

    #[test]
    fn test_invalid_urls() {
        assert!(parse_target_url("a.example").is_none());
        assert!(parse_target_url("/relative/path").is_none());
        assert!(parse_target_url("mailto:someone@example.com").is_none());
        assert!(parse_target_url("file:///etc/hosts").is_none());
        assert!(parse_target_url("").is_none());
    }

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("Docs Sync - 2026-01-02 10:30"), "docs-sync-2026-01-02-10-30");
        assert_eq!(slugify("***"), "page");
    }
}
