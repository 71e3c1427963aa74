//! Plain-text rendering of answers, sources, and ingestion reports.

use std::fmt::Write;

use docqa_rag::document::{PAGE_END_KEY, PAGE_KEY, TITLE_KEY};
use docqa_rag::{Answer, IngestReport, SearchResult};

/// Characters of chunk text shown per source.
pub const PREVIEW_CHARS: usize = 150;

const RULE: &str = "==================================================";

/// Render an answer, followed by its sources when `show_sources` is set.
pub fn answer(answer: &Answer, show_sources: bool) -> String {
    let mut out = format!("{RULE}\nANSWER:\n{RULE}\n{}\n", answer.text);
    if show_sources && !answer.sources.is_empty() {
        let _ = write!(out, "\n{RULE}\nSOURCES:\n{RULE}\n");
        for (i, result) in answer.sources.iter().enumerate() {
            out.push_str(&source(i + 1, result));
        }
    }
    out
}

/// One numbered source line with location, page, and a text preview.
pub fn source(number: usize, result: &SearchResult) -> String {
    let chunk = &result.chunk;
    let mut label = chunk.source().to_string();
    if let Some(title) = chunk.metadata.get(TITLE_KEY) {
        let _ = write!(label, " ({title})");
    }
    match (chunk.metadata.get(PAGE_KEY), chunk.metadata.get(PAGE_END_KEY)) {
        (Some(first), Some(last)) => {
            let _ = write!(label, ", pages {first}-{last}");
        }
        (Some(page), None) => {
            let _ = write!(label, ", page {page}");
        }
        _ => {}
    }
    format!("\n{number}. {label}\n   Preview: {}...\n", preview(&chunk.text))
}

/// The first [`PREVIEW_CHARS`] characters of `text` on one line.
pub fn preview(text: &str) -> String {
    let flat = text.split_whitespace().collect::<Vec<_>>().join(" ");
    flat.chars().take(PREVIEW_CHARS).collect()
}

/// Summarize an ingestion run.
pub fn report(report: &IngestReport) -> String {
    let mut out = format!(
        "Loaded {} documents, stored {} chunks.\n",
        report.documents, report.chunks_inserted
    );
    if !report.failures.is_empty() {
        let _ = writeln!(out, "{} sources failed:", report.failures.len());
        for failure in &report.failures {
            let _ = writeln!(
                out,
                "  - {} [{}]: {}",
                failure.location,
                failure.error.kind(),
                failure.error
            );
        }
    }
    out
}
