//! RAG pipeline orchestrator.
//!
//! The [`RagPipeline`] coordinates the ingest and question-answering
//! workflows by composing a [`DocumentLoader`], a [`Chunker`], an
//! [`EmbeddingProvider`], a [`VectorStore`], and optionally a [`ChatModel`].
//!
//! # Example
//!
//! ```rust,ignore
//! use docqa_rag::{InMemoryVectorStore, RagConfig, RagPipeline, SourceLocation};
//!
//! let pipeline = RagPipeline::builder()
//!     .config(RagConfig::default())
//!     .embedding_provider(Arc::new(my_embedder))
//!     .vector_store(Arc::new(InMemoryVectorStore::new()))
//!     .chat_model(Arc::new(my_model))
//!     .build()?;
//!
//! pipeline.create_collection("docs").await?;
//! let report = pipeline.ingest_sources("docs", &[SourceLocation::text_dir("data")]).await?;
//! let answer = pipeline.ask("docs", "What is an embedding?", 3).await?;
//! ```

use std::sync::Arc;

use tracing::{debug, error, info, warn};

use crate::chunking::{Chunker, RecursiveChunker};
use crate::config::RagConfig;
use crate::document::{Answer, Chunk, Document, IngestReport, SearchResult, SourceFailure};
use crate::embedding::{EmbeddingProvider, prepare};
use crate::error::{RagError, Result};
use crate::generator::AnswerGenerator;
use crate::llm::ChatModel;
use crate::loader::{DocumentLoader, SourceLoader, SourceLocation};
use crate::retriever::Retriever;
use crate::vectorstore::VectorStore;

/// The RAG pipeline orchestrator.
///
/// Coordinates document ingestion (load → chunk → embed → store) and
/// question answering (retrieve → generate). Construct one via
/// [`RagPipeline::builder()`]. The pipeline holds no per-query state, so a
/// shared `Arc<RagPipeline>` can serve concurrent queries.
pub struct RagPipeline {
    config: RagConfig,
    embedding_provider: Arc<dyn EmbeddingProvider>,
    vector_store: Arc<dyn VectorStore>,
    chunker: Arc<dyn Chunker>,
    loader: Arc<dyn DocumentLoader>,
    retriever: Retriever,
    generator: Option<AnswerGenerator>,
}

impl RagPipeline {
    /// Create a new [`RagPipelineBuilder`].
    pub fn builder() -> RagPipelineBuilder {
        RagPipelineBuilder::default()
    }

    /// Return a reference to the pipeline configuration.
    pub fn config(&self) -> &RagConfig {
        &self.config
    }

    /// Return a reference to the embedding provider.
    pub fn embedding_provider(&self) -> &Arc<dyn EmbeddingProvider> {
        &self.embedding_provider
    }

    /// Return a reference to the vector store.
    pub fn vector_store(&self) -> &Arc<dyn VectorStore> {
        &self.vector_store
    }

    /// Create a named collection in the vector store.
    ///
    /// The collection is created with the dimensionality reported by the
    /// configured [`EmbeddingProvider`]. Creating an existing collection is a
    /// no-op unless its dimensionality differs.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::DimensionMismatch`] if the collection exists with
    /// another dimensionality, or the store's error otherwise.
    pub async fn create_collection(&self, name: &str) -> Result<()> {
        let dimensions = self.embedding_provider.dimensions();
        self.vector_store.create_collection(name, dimensions).await.map_err(|e| {
            error!(collection = name, error = %e, "failed to create collection");
            e
        })
    }

    /// Delete a named collection from the vector store.
    pub async fn delete_collection(&self, name: &str) -> Result<()> {
        self.vector_store.delete_collection(name).await.map_err(|e| {
            error!(collection = name, error = %e, "failed to delete collection");
            e
        })?;
        info!(collection = name, "deleted collection");
        Ok(())
    }

    /// Ingest a single document: validate → chunk → embed → store.
    ///
    /// Returns the chunks that were stored (with embeddings attached).
    /// Chunk ids are deterministic, so ingesting the same document again
    /// replaces its entries instead of duplicating them.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::IngestionError`] for invalid metadata, or the
    /// embedding or store error that stopped the ingestion.
    pub async fn ingest(&self, collection: &str, document: &Document) -> Result<Vec<Chunk>> {
        document.validate()?;
        let chunks = self.chunker.chunk(document);
        if chunks.is_empty() {
            info!(document.id = %document.id, chunk_count = 0, "ingested document (empty)");
            return Ok(chunks);
        }
        let chunks = self.embed_and_store(collection, chunks).await?;
        info!(document.id = %document.id, chunk_count = chunks.len(), "ingested document");
        Ok(chunks)
    }

    /// Ingest an ordered sequence of documents.
    ///
    /// Consecutive PDF pages where a sentence runs across the page break are
    /// merged before chunking. Returns all stored chunks.
    pub async fn ingest_batch(
        &self,
        collection: &str,
        documents: &[Document],
    ) -> Result<Vec<Chunk>> {
        for document in documents {
            document.validate()?;
        }
        let chunks = self.chunker.chunk_documents(documents);
        if chunks.is_empty() {
            return Ok(chunks);
        }
        let chunks = self.embed_and_store(collection, chunks).await?;
        info!(document_count = documents.len(), chunk_count = chunks.len(), "ingested documents");
        Ok(chunks)
    }

    /// Load, chunk, embed, and store every source.
    ///
    /// The collection is created first. Directories are expanded and each
    /// file is ingested on its own; a file or URL that fails is recorded in
    /// the report and the remaining sources are still ingested.
    ///
    /// # Errors
    ///
    /// Only collection creation errors abort the run.
    pub async fn ingest_sources(
        &self,
        collection: &str,
        sources: &[SourceLocation],
    ) -> Result<IngestReport> {
        self.create_collection(collection).await?;

        let mut report = IngestReport::default();
        for source in sources {
            let expanded = match self.loader.expand(source) {
                Ok(expanded) => expanded,
                Err(e) => {
                    record_failure(&mut report, source.to_string(), e);
                    continue;
                }
            };
            if expanded.is_empty() {
                warn!(source = %source, "source contains no supported files");
            }

            for item in expanded {
                let location = item.to_string();
                let documents = match self.loader.load(&item).await {
                    Ok(documents) => documents,
                    Err(e) => {
                        record_failure(&mut report, location, e);
                        continue;
                    }
                };
                match self.ingest_batch(collection, &documents).await {
                    Ok(chunks) => {
                        report.documents += documents.len();
                        report.chunks_inserted += chunks.len();
                    }
                    Err(e) => record_failure(&mut report, location, e),
                }
            }
        }

        info!(
            collection,
            documents = report.documents,
            chunks_inserted = report.chunks_inserted,
            failures = report.failures.len(),
            "ingestion completed"
        );
        Ok(report)
    }

    /// Retrieve the configured `top_k` chunks most similar to `question`.
    ///
    /// Results below the configured `similarity_threshold`, if any, are
    /// filtered out.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::EmptyIndex`] if the collection has no entries.
    pub async fn query(&self, collection: &str, question: &str) -> Result<Vec<SearchResult>> {
        self.retriever.retrieve(collection, question, self.config.top_k).await
    }

    /// Answer `question` from the `k` chunks most similar to it.
    ///
    /// The returned [`Answer`] carries the model's text and up to
    /// `max_sources` supporting chunks. When retrieval fails the model is not
    /// called.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::ConfigError`] if no chat model was configured,
    /// the retrieval error, [`RagError::NoRelevantContext`] when the
    /// similarity threshold removed every result, or
    /// [`RagError::GenerationError`].
    pub async fn ask(&self, collection: &str, question: &str, k: usize) -> Result<Answer> {
        let generator = self.generator.as_ref().ok_or_else(|| {
            RagError::ConfigError("a chat model is required to answer questions".to_string())
        })?;

        let mut sources = self.retriever.retrieve(collection, question, k).await?;
        if sources.is_empty() {
            debug!(collection, "no chunk passed the similarity threshold");
            return Err(RagError::NoRelevantContext { collection: collection.to_string() });
        }
        let text = generator.generate(question, &sources).await?;
        sources.truncate(self.config.max_sources);

        info!(
            collection,
            k,
            source_count = sources.len(),
            answer_len = text.len(),
            "answered question"
        );
        Ok(Answer { text, sources })
    }

    /// Embed chunk texts in batches, attach the validated embeddings, and
    /// upsert the chunks.
    async fn embed_and_store(
        &self,
        collection: &str,
        mut chunks: Vec<Chunk>,
    ) -> Result<Vec<Chunk>> {
        let dimensions = self.embedding_provider.dimensions();

        for batch in chunks.chunks_mut(self.config.embed_batch_size) {
            let texts: Vec<&str> = batch.iter().map(|c| c.text.as_str()).collect();
            let embeddings = self.embedding_provider.embed_batch(&texts).await.map_err(|e| {
                error!(error = %e, "embedding failed during ingestion");
                e
            })?;
            if embeddings.len() != batch.len() {
                return Err(RagError::EmbeddingError {
                    provider: "pipeline".to_string(),
                    message: format!(
                        "provider returned {} embeddings for {} chunks",
                        embeddings.len(),
                        batch.len()
                    ),
                });
            }
            for (chunk, embedding) in batch.iter_mut().zip(embeddings) {
                chunk.embedding = prepare(embedding, dimensions)?;
            }
        }

        let written = self.vector_store.upsert(collection, &chunks).await.map_err(|e| {
            error!(collection, error = %e, "vector store upsert failed");
            e
        })?;
        if written != chunks.len() {
            warn!(
                collection,
                expected = chunks.len(),
                written,
                "store wrote fewer entries than sent"
            );
        }

        Ok(chunks)
    }
}

fn record_failure(report: &mut IngestReport, location: String, error: RagError) {
    error!(source = %location, kind = error.kind(), error = %error, "failed to ingest source");
    report.failures.push(SourceFailure { location, error });
}

/// Builder for constructing a [`RagPipeline`].
///
/// `config`, `embedding_provider`, and `vector_store` are required. The
/// chunker defaults to a [`RecursiveChunker`] sized from the config, and the
/// loader to [`SourceLoader`]. Without a `chat_model` the pipeline can
/// ingest and retrieve but not answer.
///
/// # Example
///
/// ```rust,ignore
/// let pipeline = RagPipeline::builder()
///     .config(RagConfig::default())
///     .embedding_provider(Arc::new(embedder))
///     .vector_store(Arc::new(store))
///     .chunker(Arc::new(FixedSizeChunker::new(512, 100)))  // optional
///     .chat_model(Arc::new(model))                          // optional
///     .build()?;
/// ```
#[derive(Default)]
pub struct RagPipelineBuilder {
    config: Option<RagConfig>,
    embedding_provider: Option<Arc<dyn EmbeddingProvider>>,
    vector_store: Option<Arc<dyn VectorStore>>,
    chunker: Option<Arc<dyn Chunker>>,
    loader: Option<Arc<dyn DocumentLoader>>,
    chat_model: Option<Arc<dyn ChatModel>>,
}

impl RagPipelineBuilder {
    /// Set the pipeline configuration.
    pub fn config(mut self, config: RagConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Set the embedding provider.
    pub fn embedding_provider(mut self, provider: Arc<dyn EmbeddingProvider>) -> Self {
        self.embedding_provider = Some(provider);
        self
    }

    /// Set the vector store backend.
    pub fn vector_store(mut self, store: Arc<dyn VectorStore>) -> Self {
        self.vector_store = Some(store);
        self
    }

    /// Set the document chunker.
    pub fn chunker(mut self, chunker: Arc<dyn Chunker>) -> Self {
        self.chunker = Some(chunker);
        self
    }

    /// Set the document loader used by [`RagPipeline::ingest_sources`].
    pub fn loader(mut self, loader: Arc<dyn DocumentLoader>) -> Self {
        self.loader = Some(loader);
        self
    }

    /// Set the chat model used by [`RagPipeline::ask`].
    pub fn chat_model(mut self, model: Arc<dyn ChatModel>) -> Self {
        self.chat_model = Some(model);
        self
    }

    /// Build the [`RagPipeline`], validating the configuration and that all
    /// required fields are set.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::ConfigError`] if any required field is missing or
    /// the configuration is invalid.
    pub fn build(self) -> Result<RagPipeline> {
        let config =
            self.config.ok_or_else(|| RagError::ConfigError("config is required".to_string()))?;
        config.validate()?;
        let embedding_provider = self
            .embedding_provider
            .ok_or_else(|| RagError::ConfigError("embedding_provider is required".to_string()))?;
        let vector_store = self
            .vector_store
            .ok_or_else(|| RagError::ConfigError("vector_store is required".to_string()))?;
        let chunker = self.chunker.unwrap_or_else(|| {
            Arc::new(RecursiveChunker::new(config.chunk_size, config.chunk_overlap))
        });
        let loader = match self.loader {
            Some(loader) => loader,
            None => Arc::new(SourceLoader::new()?),
        };

        let mut retriever = Retriever::new(embedding_provider.clone(), vector_store.clone());
        if let Some(threshold) = config.similarity_threshold {
            retriever = retriever.with_similarity_threshold(threshold);
        }
        let generator =
            self.chat_model.map(|model| AnswerGenerator::new(model, config.temperature));

        Ok(RagPipeline {
            config,
            embedding_provider,
            vector_store,
            chunker,
            loader,
            retriever,
            generator,
        })
    }
}
