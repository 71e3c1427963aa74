//! Web page loader: HTTP fetch plus visible-text extraction.
//!
//! This module is only available when the `web` feature is enabled.

use std::time::Duration;

use reqwest::header::CONTENT_TYPE;
use scraper::{Html, Node, Selector};
use tracing::debug;

use crate::document::{Document, FILE_TYPE_KEY, TITLE_KEY};
use crate::error::{RagError, Result};
use crate::http;
use crate::retry::RetryPolicy;

/// Elements whose text is never part of the page content.
const SKIPPED_ELEMENTS: [&str; 6] = ["script", "style", "noscript", "template", "head", "svg"];

/// Loads a URL into a single [`Document`] with `source` set to the URL and
/// `title` set to the page title when there is one.
pub struct WebLoader {
    client: reqwest::Client,
    retry: RetryPolicy,
}

impl WebLoader {
    /// Create a loader with the default timeout and retry policy.
    pub fn new() -> Result<Self> {
        Ok(Self { client: build_client(http::DEFAULT_TIMEOUT)?, retry: RetryPolicy::default() })
    }

    /// Set the per-request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Result<Self> {
        self.client = build_client(timeout)?;
        Ok(self)
    }

    /// Set the retry policy for transient failures.
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Fetch `url` and extract its text.
    pub async fn load(&self, url: &str) -> Result<Document> {
        let response = http::send(&self.retry, "web.fetch", || self.client.get(url))
            .await
            .map_err(|e| RagError::ingestion(url, e.message))?;

        let is_html = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_none_or(|ct| ct.contains("html"));
        let body = response
            .text()
            .await
            .map_err(|e| RagError::ingestion(url, format!("failed to read body: {e}")))?;

        let document = if is_html {
            let page = extract_page(&body);
            let document = Document::new(url, page.text).with_metadata(FILE_TYPE_KEY, "html");
            match page.title {
                Some(title) => document.with_metadata(TITLE_KEY, title),
                None => document,
            }
        } else {
            Document::new(url, body).with_metadata(FILE_TYPE_KEY, "txt")
        };

        debug!(url, chars = document.text.chars().count(), "loaded web page");
        Ok(document)
    }
}

fn build_client(timeout: Duration) -> Result<reqwest::Client> {
    http::client(timeout)
        .map_err(|e| RagError::ConfigError(format!("failed to build HTTP client: {e}")))
}

/// Text content of an HTML page.
#[derive(Debug, Default, PartialEq)]
pub struct ExtractedPage {
    /// The `<title>`, whitespace-normalized.
    pub title: Option<String>,
    /// Visible text, one line per text run.
    pub text: String,
}

/// Extract the title and visible text of an HTML document.
///
/// Text inside `script`, `style`, `noscript`, `template`, `head`, and `svg`
/// elements is dropped. Each remaining text run is whitespace-normalized
/// and placed on its own line.
pub fn extract_page(html: &str) -> ExtractedPage {
    let document = Html::parse_document(html);

    let title = Selector::parse("title")
        .ok()
        .and_then(|selector| document.select(&selector).next())
        .map(|title| clean_text(&title.text().collect::<String>()))
        .filter(|title| !title.is_empty());

    let lines: Vec<String> = document
        .root_element()
        .descendants()
        .filter_map(|node| match node.value() {
            Node::Text(text) => {
                let skipped = node.ancestors().any(|ancestor| {
                    ancestor
                        .value()
                        .as_element()
                        .is_some_and(|e| SKIPPED_ELEMENTS.contains(&e.name()))
                });
                if skipped { None } else { Some(clean_text(text)) }
            }
            _ => None,
        })
        .filter(|line| !line.is_empty())
        .collect();

    ExtractedPage { title, text: lines.join("\n") }
}

/// Collapse runs of whitespace into single spaces.
fn clean_text(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
        <!DOCTYPE html>
        <html>
        <head><title>  Agents
            Overview </title><style>body { color: red; }</style></head>
        <body>
            <script>var tracking = "should not appear";</script>
            <h1>LLM Powered Agents</h1>
            <p>Planning is a   key component.</p>
            <noscript>Enable JavaScript</noscript>
        </body>
        </html>
    "#;

    #[test]
    fn extracts_title_and_visible_text() {
        let page = extract_page(SAMPLE);
        assert_eq!(page.title.as_deref(), Some("Agents Overview"));
        assert_eq!(page.text, "LLM Powered Agents\nPlanning is a key component.");
    }

    #[test]
    fn page_without_title() {
        let page = extract_page("<html><body><p>Only text</p></body></html>");
        assert_eq!(page.title, None);
        assert_eq!(page.text, "Only text");
    }
}
