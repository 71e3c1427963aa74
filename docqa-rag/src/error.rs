//! Error types for the `docqa-rag` crate.

use thiserror::Error;

/// Errors that can occur in RAG operations.
///
/// Each variant names the stage that failed so callers can tell an
/// unreadable source from an unavailable model or an empty index.
#[derive(Debug, Error)]
pub enum RagError {
    /// A source could not be read, parsed, or validated.
    #[error("Ingestion error ({location}): {message}")]
    IngestionError {
        /// The file path or URL that failed.
        location: String,
        /// A description of the failure.
        message: String,
    },

    /// An error occurred during embedding generation.
    #[error("Embedding error ({provider}): {message}")]
    EmbeddingError {
        /// The embedding provider that produced the error.
        provider: String,
        /// A description of the failure.
        message: String,
    },

    /// An embedding did not have the dimensionality the index expects.
    #[error("Embedding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// The dimensionality declared by the provider or collection.
        expected: usize,
        /// The dimensionality actually observed.
        actual: usize,
    },

    /// An error occurred in the vector store backend.
    #[error("Vector store error ({backend}): {message}")]
    VectorStoreError {
        /// The vector store backend that produced the error.
        backend: String,
        /// A description of the failure.
        message: String,
    },

    /// The language model could not produce a response.
    #[error("Generation error ({provider}): {message}")]
    GenerationError {
        /// The chat model provider that produced the error.
        provider: String,
        /// A description of the failure.
        message: String,
    },

    /// A query was issued against a collection with no entries.
    #[error("Collection '{collection}' has no entries")]
    EmptyIndex {
        /// The collection that was queried.
        collection: String,
    },

    /// Retrieval found entries, but none scored above the similarity
    /// threshold, so there is no context to answer from.
    #[error("No chunk in collection '{collection}' passed the similarity threshold")]
    NoRelevantContext {
        /// The collection that was queried.
        collection: String,
    },

    /// A configuration validation error.
    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl RagError {
    /// Short, stable name of the error kind, used in logs and reports.
    pub fn kind(&self) -> &'static str {
        match self {
            RagError::IngestionError { .. } => "ingestion",
            RagError::EmbeddingError { .. } => "embedding",
            RagError::DimensionMismatch { .. } => "dimension_mismatch",
            RagError::VectorStoreError { .. } => "vector_store",
            RagError::GenerationError { .. } => "generation",
            RagError::EmptyIndex { .. } => "empty_index",
            RagError::NoRelevantContext { .. } => "no_relevant_context",
            RagError::ConfigError(_) => "config",
        }
    }

    pub(crate) fn ingestion(location: impl Into<String>, message: impl Into<String>) -> Self {
        RagError::IngestionError { location: location.into(), message: message.into() }
    }
}

/// A convenience result type for RAG operations.
pub type Result<T> = std::result::Result<T, RagError>;
