//! Data types for documents, chunks, search results, and answers.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{RagError, Result};

/// Metadata key holding the file path or URL a document was loaded from.
pub const SOURCE_KEY: &str = "source";
/// Metadata key holding the loader-assigned format (`txt`, `md`, `pdf`, `html`).
pub const FILE_TYPE_KEY: &str = "file_type";
/// Metadata key holding the 1-based PDF page number.
pub const PAGE_KEY: &str = "page";
/// Metadata key holding the last page of merged continuation pages.
pub const PAGE_END_KEY: &str = "page_end";
/// Metadata key holding a web page title.
pub const TITLE_KEY: &str = "title";
/// Metadata key added by chunkers: position of the chunk within its document.
pub const CHUNK_INDEX_KEY: &str = "chunk_index";
/// Metadata key added by chunkers: character offset of the chunk in its document.
pub const START_INDEX_KEY: &str = "start_index";

const RESERVED_KEYS: [&str; 2] = [CHUNK_INDEX_KEY, START_INDEX_KEY];

/// A source document containing text content and metadata.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Document {
    /// Unique identifier for the document.
    pub id: String,
    /// The text content of the document.
    pub text: String,
    /// Key-value metadata associated with the document.
    pub metadata: HashMap<String, String>,
    /// Optional URI pointing to the original source.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_uri: Option<String>,
}

impl Document {
    /// Create a document loaded from `source` (a path or URL).
    ///
    /// The id is derived from the source, so loading the same source twice
    /// yields the same id.
    pub fn new(source: impl Into<String>, text: impl Into<String>) -> Self {
        let source = source.into();
        let mut metadata = HashMap::new();
        metadata.insert(SOURCE_KEY.to_string(), source.clone());
        Self { id: stable_id(&source), text: text.into(), metadata, source_uri: Some(source) }
    }

    /// Mark this document as one page of a paged source. Re-derives the id
    /// from the source and page number.
    pub fn with_page(mut self, page: u32) -> Self {
        self.metadata.insert(PAGE_KEY.to_string(), page.to_string());
        self.id = stable_id(&format!("{}#{page}", self.source()));
        self
    }

    /// Add a metadata entry.
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// The `source` metadata value, or an empty string if unset.
    pub fn source(&self) -> &str {
        self.metadata.get(SOURCE_KEY).map(String::as_str).unwrap_or_default()
    }

    /// The `page` metadata value, if present and numeric.
    pub fn page(&self) -> Option<u32> {
        self.metadata.get(PAGE_KEY).and_then(|p| p.parse().ok())
    }

    /// Check the document against the metadata schema.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::IngestionError`] if `source` is missing or empty,
    /// `page`/`page_end` are not numbers, a key is empty, or a key reserved
    /// for chunk metadata is present.
    pub fn validate(&self) -> Result<()> {
        let location = self.source_uri.clone().unwrap_or_else(|| self.id.clone());
        if self.source().is_empty() {
            return Err(RagError::ingestion(location, "metadata is missing 'source'"));
        }
        for (key, value) in &self.metadata {
            if key.is_empty() {
                return Err(RagError::ingestion(location, "metadata contains an empty key"));
            }
            if RESERVED_KEYS.contains(&key.as_str()) {
                return Err(RagError::ingestion(
                    location,
                    format!("metadata key '{key}' is reserved for chunks"),
                ));
            }
            if (key == PAGE_KEY || key == PAGE_END_KEY) && value.parse::<u32>().is_err() {
                return Err(RagError::ingestion(
                    location,
                    format!("metadata '{key}' must be a page number, got '{value}'"),
                ));
            }
        }
        Ok(())
    }
}

/// Derive a deterministic UUID string from a key.
pub(crate) fn stable_id(key: &str) -> String {
    Uuid::new_v5(&Uuid::NAMESPACE_URL, key.as_bytes()).to_string()
}

/// A segment of a [`Document`] with its vector embedding.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Chunk {
    /// Unique identifier for the chunk.
    pub id: String,
    /// The text content of the chunk.
    pub text: String,
    /// The vector embedding for this chunk's text.
    pub embedding: Vec<f32>,
    /// Key-value metadata inherited from the parent document plus chunk-specific fields.
    pub metadata: HashMap<String, String>,
    /// The ID of the parent [`Document`].
    pub document_id: String,
}

impl Chunk {
    /// Character offset of this chunk within its parent document.
    pub fn start_index(&self) -> Option<usize> {
        self.metadata.get(START_INDEX_KEY).and_then(|s| s.parse().ok())
    }

    /// The `source` metadata value, or `"Unknown"`.
    pub fn source(&self) -> &str {
        self.metadata.get(SOURCE_KEY).map(String::as_str).unwrap_or("Unknown")
    }
}

/// A retrieved [`Chunk`] paired with a relevance score.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResult {
    /// The retrieved chunk.
    pub chunk: Chunk,
    /// The similarity score (higher is more relevant).
    pub score: f32,
}

/// A generated answer with the chunks that supported it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Answer {
    /// The raw text returned by the language model.
    pub text: String,
    /// The top retrieved chunks, in descending relevance.
    pub sources: Vec<SearchResult>,
}

/// A source that could not be ingested.
#[derive(Debug)]
pub struct SourceFailure {
    /// The file path or URL.
    pub location: String,
    /// Why it failed.
    pub error: RagError,
}

/// Outcome of an ingestion run.
#[derive(Debug, Default)]
pub struct IngestReport {
    /// Documents loaded across all successful sources.
    pub documents: usize,
    /// Index entries written.
    pub chunks_inserted: usize,
    /// Sources that failed. Other sources were still ingested.
    pub failures: Vec<SourceFailure>,
}

impl IngestReport {
    /// Whether every attempted source failed.
    pub fn all_failed(&self) -> bool {
        self.documents == 0 && !self.failures.is_empty()
    }
}
