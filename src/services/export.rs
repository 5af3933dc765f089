// src/services/export.rs

//! Rendering of one-shot extraction results into downloadable formats.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::str::FromStr;

use html_escape::encode_text;
use serde::Serialize;

use crate::error::{AppError, Result};
use crate::models::ExtractionResult;

/// Output format for `extract`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Json,
    Jsonl,
    Txt,
    Md,
    Html,
}

impl OutputFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Jsonl => "jsonl",
            Self::Txt => "txt",
            Self::Md => "md",
            Self::Html => "html",
        }
    }
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "jsonl" => Ok(Self::Jsonl),
            "txt" => Ok(Self::Txt),
            "md" => Ok(Self::Md),
            "html" => Ok(Self::Html),
            other => Err(format!(
                "unknown output format '{other}' (json|jsonl|txt|md|html)"
            )),
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

#[derive(Serialize)]
struct BlockLine<'a> {
    url: &'a str,
    code_blocks: Vec<&'a str>,
    total_blocks: usize,
}

/// Render the successful results, ordered by URL.
///
/// Fails when nothing succeeded, since there is nothing to export.
pub fn render(results: &HashMap<String, ExtractionResult>, format: OutputFormat) -> Result<String> {
    let valid: BTreeMap<&str, &str> = results
        .iter()
        .filter_map(|(url, result)| Some((url.as_str(), result.text()?)))
        .collect();
    if valid.is_empty() {
        return Err(AppError::validation(
            "no content was extracted or all content was filtered out",
        ));
    }

    let rendered = match format {
        OutputFormat::Json => serde_json::to_string_pretty(&valid)?,
        OutputFormat::Jsonl => {
            let mut out = String::new();
            for (url, text) in &valid {
                let code_blocks: Vec<&str> = text
                    .split("\n\n")
                    .filter(|block| !block.trim().is_empty())
                    .collect();
                let line = BlockLine {
                    url,
                    total_blocks: code_blocks.len(),
                    code_blocks,
                };
                out.push_str(&serde_json::to_string(&line)?);
                out.push('\n');
            }
            out
        }
        OutputFormat::Txt => valid
            .iter()
            .map(|(url, text)| format!("URL: {url}\n\n{text}\n\n{}\n\n", "-".repeat(50)))
            .collect(),
        OutputFormat::Md => valid
            .iter()
            .map(|(url, text)| format!("# {url}\n\n{text}\n\n---\n\n"))
            .collect(),
        OutputFormat::Html => {
            let mut out = String::from("<html><body>");
            for (url, text) in &valid {
                out.push_str(&format!(
                    "<h1>{}</h1><p>{}</p><hr>",
                    encode_text(url),
                    encode_text(text)
                ));
            }
            out.push_str("</body></html>");
            out
        }
    };
    Ok(rendered)
}
