// src/services/extractor.rs

//! Text extraction from fetched documents.
//!
//! The pipeline only depends on the [`Extractor`] trait; [`HtmlExtractor`]
//! is the default strategy built on `scraper`.

use scraper::{ElementRef, Html, Selector};

use crate::error::Result;
use crate::models::ExtractionRules;
use crate::services::selectors::compile_selector;

/// Regions tried, in order, when no content selector is configured.
const MAIN_REGION_SELECTORS: &[&str] = &[
    "main",
    "article",
    "[role='main']",
    "#content",
    "#main",
    ".content",
    ".post-content",
    ".entry-content",
    "body",
];

/// Elements whose text never belongs to the generic extraction.
const BOILERPLATE_SELECTOR: &str =
    "nav, header, footer, aside, script, style, noscript, iframe, template";

/// Compiled selectors for one batch run.
#[derive(Debug, Clone, Default)]
pub struct SelectorRules {
    pub content: Vec<Selector>,
    pub code: Option<Selector>,
    pub exclude: Option<Selector>,
}

impl SelectorRules {
    /// Validate and compile every selector in `rules`.
    pub fn compile(rules: &ExtractionRules) -> Result<Self> {
        let content = rules
            .content_selectors
            .iter()
            .map(|s| compile_selector(s))
            .collect::<std::result::Result<Vec<_>, _>>()?;
        let code = rules
            .code_selector
            .as_deref()
            .map(compile_selector)
            .transpose()?;
        let exclude = rules
            .exclude_selector
            .as_deref()
            .map(compile_selector)
            .transpose()?;
        Ok(Self {
            content,
            code,
            exclude,
        })
    }

    /// Whether content or code selectors narrow the scope.
    pub fn is_scoped(&self) -> bool {
        !self.content.is_empty() || self.code.is_some()
    }
}

/// Turns a raw document into text.
///
/// Implementations must be pure and return `None` when nothing matched.
pub trait Extractor: Send + Sync {
    fn extract(&self, document: &str, rules: &SelectorRules) -> Option<String>;
}

/// HTML extractor driven by CSS selectors.
#[derive(Debug, Clone)]
pub struct HtmlExtractor {
    main_regions: Vec<Selector>,
    boilerplate: Option<Selector>,
}

impl HtmlExtractor {
    pub fn new() -> Self {
        Self {
            main_regions: MAIN_REGION_SELECTORS
                .iter()
                .filter_map(|s| Selector::parse(s).ok())
                .collect(),
            boilerplate: Selector::parse(BOILERPLATE_SELECTOR).ok(),
        }
    }

    fn scoped(&self, document: &Html, rules: &SelectorRules) -> Option<String> {
        let excluded = excluded_nodes(document, rules.exclude.iter());
        let mut pieces = Vec::new();

        for selector in &rules.content {
            for element in document.select(selector) {
                let text = element_text(element, &excluded, " ");
                if !text.is_empty() {
                    pieces.push(text);
                }
            }
        }

        if let Some(selector) = &rules.code {
            for element in document.select(selector) {
                let text = element_text(element, &excluded, "\n");
                if !text.is_empty() {
                    pieces.push(text);
                }
            }
        }

        join_pieces(pieces)
    }

    fn generic(&self, document: &Html, rules: &SelectorRules) -> Option<String> {
        let excluded = excluded_nodes(
            document,
            rules.exclude.iter().chain(self.boilerplate.iter()),
        );

        // Empty placeholders matching a main-region selector are skipped
        let text = self
            .main_regions
            .iter()
            .flat_map(|selector| document.select(selector))
            .map(|region| element_text(region, &excluded, " "))
            .find(|text| !text.is_empty())
            .unwrap_or_else(|| element_text(document.root_element(), &excluded, " "));

        join_pieces(vec![text])
    }
}

impl Default for HtmlExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl Extractor for HtmlExtractor {
    fn extract(&self, document: &str, rules: &SelectorRules) -> Option<String> {
        let html = Html::parse_document(document);
        if rules.is_scoped() {
            self.scoped(&html, rules)
        } else {
            self.generic(&html, rules)
        }
    }
}

/// Every element matched by `selectors`.
fn excluded_nodes<'a, 'b>(
    document: &'a Html,
    selectors: impl Iterator<Item = &'b Selector>,
) -> Vec<ElementRef<'a>> {
    selectors
        .flat_map(|selector| document.select(selector))
        .collect()
}

/// Whitespace-normalized text of `element`, skipping excluded subtrees.
fn element_text(element: ElementRef<'_>, excluded: &[ElementRef<'_>], separator: &str) -> String {
    let keep_lines = separator == "\n";
    let mut parts = Vec::new();
    for node in element.descendants() {
        let Some(text) = node.value().as_text() else {
            continue;
        };
        let hidden = !excluded.is_empty()
            && node
                .ancestors()
                .filter_map(ElementRef::wrap)
                .any(|ancestor| excluded.contains(&ancestor));
        if hidden {
            continue;
        }

        if keep_lines {
            parts.extend(text.lines().map(collapse_whitespace).filter(|l| !l.is_empty()));
        } else {
            let normalized = collapse_whitespace(text);
            if !normalized.is_empty() {
                parts.push(normalized);
            }
        }
    }
    parts.join(separator)
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn join_pieces(pieces: Vec<String>) -> Option<String> {
    let joined = pieces
        .into_iter()
        .map(|p| p.trim().to_string())
        .filter(|p| !p.is_empty())
        .collect::<Vec<_>>()
        .join("\n\n");
    if joined.is_empty() { None } else { Some(joined) }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"
        <html>
          <head><title>Guide</title><style>body { color: red; }</style></head>
          <body>
            <nav>Home | Docs | Blog</nav>
            <main>
              <h1>Getting started</h1>
              <p>Install the   toolchain first.</p>
              <div class="ad">Buy now</div>
              <pre><code>cargo new demo
cd demo</code></pre>
            </main>
            <footer>Copyright</footer>
          </body>
        </html>
    "#;

    fn rules(build: impl FnOnce(ExtractionRules) -> ExtractionRules) -> SelectorRules {
        SelectorRules::compile(&build(ExtractionRules::new())).unwrap()
    }

    #[test]
    fn test_generic_extraction_uses_main_region() {
        let text = HtmlExtractor::new()
            .extract(PAGE, &SelectorRules::default())
            .unwrap();
        assert!(text.starts_with("Getting started"));
        assert!(text.contains("Install the toolchain first."));
        assert!(!text.contains("Home | Docs"));
        assert!(!text.contains("Copyright"));
    }

    #[test]
    fn test_generic_extraction_honors_exclusions() {
        let text = HtmlExtractor::new()
            .extract(PAGE, &rules(|r| r.with_exclude_selector(".ad")))
            .unwrap();
        assert!(!text.contains("Buy now"));
        assert!(text.contains("Getting started"));
    }

    #[test]
    fn test_generic_extraction_falls_back_to_body() {
        let text = HtmlExtractor::new()
            .extract(
                "<html><body><div>Plain page</div><script>x()</script></body></html>",
                &SelectorRules::default(),
            )
            .unwrap();
        assert_eq!(text, "Plain page");
    }

    #[test]
    fn test_generic_extraction_skips_empty_regions() {
        let html = r#"<html><body>
            <main><nav>Home | Docs</nav></main>
            <div class="content"></div>
            <div><p>Real article text about Rust</p></div>
        </body></html>"#;
        let text = HtmlExtractor::new()
            .extract(html, &SelectorRules::default())
            .unwrap();
        assert_eq!(text, "Real article text about Rust");
    }

    #[test]
    fn test_content_and_code_selectors() {
        let text = HtmlExtractor::new()
            .extract(
                PAGE,
                &rules(|r| r.with_content_selector("h1").with_code_selector("pre")),
            )
            .unwrap();
        assert_eq!(text, "Getting started\n\ncargo new demo\ncd demo");
    }

    #[test]
    fn test_code_selector_joins_lines() {
        let html = "<div><pre><span>let a = 1;</span><span>let b = 2;</span></pre></div>";
        let text = HtmlExtractor::new()
            .extract(html, &rules(|r| r.with_code_selector("pre")))
            .unwrap();
        assert_eq!(text, "let a = 1;\nlet b = 2;");
    }

    #[test]
    fn test_exclusions_apply_inside_scope() {
        let text = HtmlExtractor::new()
            .extract(
                PAGE,
                &rules(|r| r.with_content_selector("main").with_exclude_selector("pre, .ad")),
            )
            .unwrap();
        assert_eq!(text, "Getting started Install the toolchain first.");
    }

    #[test]
    fn test_no_match_returns_none() {
        let extracted =
            HtmlExtractor::new().extract(PAGE, &rules(|r| r.with_content_selector("table")));
        assert!(extracted.is_none());
    }

    #[test]
    fn test_invalid_selector_fails_compile() {
        let result = SelectorRules::compile(&ExtractionRules::new().with_content_selector("div["));
        assert!(result.is_err());
    }
}
