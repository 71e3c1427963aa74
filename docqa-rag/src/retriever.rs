//! Similarity retrieval over a vector store collection.

use std::sync::Arc;

use tracing::{debug, error};

use crate::document::SearchResult;
use crate::embedding::{EmbeddingProvider, prepare};
use crate::error::{RagError, Result};
use crate::vectorstore::VectorStore;

/// Finds the chunks most similar to a question.
///
/// A retrieval fails with [`RagError::EmptyIndex`] before any embedding
/// call when the collection holds no entries, and with
/// [`RagError::DimensionMismatch`] when the provider returns a vector of the
/// wrong size. Results scoring below an optional similarity threshold are
/// dropped.
#[derive(Clone)]
pub struct Retriever {
    embedding_provider: Arc<dyn EmbeddingProvider>,
    vector_store: Arc<dyn VectorStore>,
    similarity_threshold: Option<f32>,
}

impl Retriever {
    /// Create a retriever that keeps every result the store returns.
    pub fn new(
        embedding_provider: Arc<dyn EmbeddingProvider>,
        vector_store: Arc<dyn VectorStore>,
    ) -> Self {
        Self { embedding_provider, vector_store, similarity_threshold: None }
    }

    /// Drop results scoring below `threshold`.
    pub fn with_similarity_threshold(mut self, threshold: f32) -> Self {
        self.similarity_threshold = Some(threshold);
        self
    }

    /// Return up to `top_k` chunks of `collection` ordered by non-increasing
    /// similarity to `question`.
    pub async fn retrieve(
        &self,
        collection: &str,
        question: &str,
        top_k: usize,
    ) -> Result<Vec<SearchResult>> {
        if top_k == 0 {
            return Err(RagError::ConfigError("top_k must be greater than zero".to_string()));
        }

        let entries = self.vector_store.count(collection).await?;
        if entries == 0 {
            debug!(collection, "retrieval against empty collection");
            return Err(RagError::EmptyIndex { collection: collection.to_string() });
        }

        let embedding = self.embedding_provider.embed(question).await.map_err(|e| {
            error!(error = %e, "embedding failed during query");
            e
        })?;
        let embedding = prepare(embedding, self.embedding_provider.dimensions())?;

        let mut results =
            self.vector_store.search(collection, &embedding, top_k).await.map_err(|e| {
                error!(collection, error = %e, "vector store search failed");
                e
            })?;

        if let Some(threshold) = self.similarity_threshold {
            results.retain(|r| r.score >= threshold);
        }
        results.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        results.truncate(top_k);

        debug!(collection, top_k, result_count = results.len(), "retrieval completed");
        Ok(results)
    }
}
