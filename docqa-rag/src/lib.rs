//! # docqa-rag
//!
//! Retrieval-augmented question answering over document collections.
//!
//! ## Overview
//!
//! Ingestion loads files, directories, and web pages into [`Document`]s,
//! splits them into overlapping [`Chunk`]s, embeds them with an
//! [`EmbeddingProvider`], and upserts them into a [`VectorStore`].
//! Answering retrieves the chunks most similar to a question and asks a
//! [`ChatModel`] to answer from those chunks only.
//!
//! - [`RagPipeline`] sequences both workflows
//! - [`Session`] keeps the collection and history of one conversation
//! - [`RecursiveChunker`] and [`FixedSizeChunker`] split on characters
//! - [`InMemoryVectorStore`] is always available; other backends are features
//!
//! ## Features
//!
//! | feature | adds |
//! |---------|------|
//! | `openai` | [`openai::OpenAIEmbeddingProvider`], [`chat::ChatCompletionsModel`] |
//! | `ollama` | [`ollama::OllamaEmbeddingProvider`] |
//! | `astra` | [`astra::AstraVectorStore`] (Astra DB Data API) |
//! | `qdrant` | [`qdrant::QdrantVectorStore`] |
//! | `pdf` | PDF loading, one document per page |
//! | `web` | [`web::WebLoader`] for HTTP(S) sources |
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use docqa_rag::{InMemoryVectorStore, RagConfig, RagPipeline, Session, SourceLocation};
//!
//! let pipeline = Arc::new(
//!     RagPipeline::builder()
//!         .config(RagConfig::default())
//!         .embedding_provider(Arc::new(embedder))
//!         .vector_store(Arc::new(InMemoryVectorStore::new()))
//!         .chat_model(Arc::new(model))
//!         .build()?,
//! );
//!
//! let mut session = Session::open(pipeline, "docs").await?;
//! session.ingest(&[SourceLocation::text_dir("data")]).await?;
//! let answer = session.ask("What is the capital of France?").await?;
//! ```

pub mod chunking;
pub mod config;
pub mod document;
pub mod embedding;
pub mod error;
pub mod generator;
pub mod inmemory;
pub mod llm;
pub mod loader;
pub mod pipeline;
pub mod retriever;
pub mod retry;
pub mod session;
pub mod vectorstore;

#[cfg(any(feature = "openai", feature = "ollama", feature = "astra", feature = "web"))]
mod http;

#[cfg(feature = "astra")]
pub mod astra;
#[cfg(feature = "openai")]
pub mod chat;
#[cfg(feature = "ollama")]
pub mod ollama;
#[cfg(feature = "openai")]
pub mod openai;
#[cfg(feature = "qdrant")]
pub mod qdrant;
#[cfg(feature = "web")]
pub mod web;

pub use chunking::{Chunker, FixedSizeChunker, RecursiveChunker, merge_page_continuations};
pub use config::{RagConfig, RagConfigBuilder};
pub use document::{Answer, Chunk, Document, IngestReport, SearchResult, SourceFailure};
pub use embedding::EmbeddingProvider;
pub use error::{RagError, Result};
pub use generator::AnswerGenerator;
pub use inmemory::InMemoryVectorStore;
pub use llm::ChatModel;
pub use loader::{DocumentLoader, FileKind, SourceLoader, SourceLocation};
pub use pipeline::{RagPipeline, RagPipelineBuilder};
pub use retriever::Retriever;
pub use retry::RetryPolicy;
pub use session::{Exchange, Session};
pub use vectorstore::VectorStore;

#[cfg(feature = "astra")]
pub use astra::AstraVectorStore;
#[cfg(feature = "openai")]
pub use chat::ChatCompletionsModel;
#[cfg(feature = "ollama")]
pub use ollama::OllamaEmbeddingProvider;
#[cfg(feature = "openai")]
pub use openai::OpenAIEmbeddingProvider;
#[cfg(feature = "qdrant")]
pub use qdrant::QdrantVectorStore;
#[cfg(feature = "web")]
pub use web::WebLoader;
