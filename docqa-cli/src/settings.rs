//! Environment-driven settings.
//!
//! Every value is read from the process environment (after `.env` has been
//! loaded by the binary). Required keys are only checked for the backends
//! that are actually selected, so a Qdrant user never needs Astra tokens.

use std::str::FromStr;
use std::time::Duration;

use docqa_rag::{RagConfig, RagError, Result, RetryPolicy};

/// Which service produces embeddings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmbeddingBackend {
    /// A local or remote Ollama server.
    Ollama,
    /// An OpenAI-compatible `/embeddings` API.
    OpenAI,
}

impl FromStr for EmbeddingBackend {
    type Err = RagError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "ollama" => Ok(EmbeddingBackend::Ollama),
            "openai" => Ok(EmbeddingBackend::OpenAI),
            other => Err(RagError::ConfigError(format!(
                "EMBEDDING_BACKEND must be 'ollama' or 'openai', got '{other}'"
            ))),
        }
    }
}

/// Which vector database holds the collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    /// DataStax Astra DB.
    Astra,
    /// Qdrant over gRPC.
    Qdrant,
    /// In-process store; contents are lost when the process exits.
    Memory,
}

impl FromStr for StoreBackend {
    type Err = RagError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "astra" => Ok(StoreBackend::Astra),
            "qdrant" => Ok(StoreBackend::Qdrant),
            "memory" => Ok(StoreBackend::Memory),
            other => Err(RagError::ConfigError(format!(
                "VECTOR_STORE must be 'astra', 'qdrant' or 'memory', got '{other}'"
            ))),
        }
    }
}

/// Settings for the `docqa` binary.
#[derive(Debug, Clone)]
pub struct Settings {
    pub embedding_backend: EmbeddingBackend,
    pub ollama_base_url: String,
    pub ollama_model: String,
    pub ollama_num_threads: Option<u32>,
    /// Overrides the embedding model's dimensionality.
    pub embedding_dimensions: Option<usize>,
    pub openai_api_key: Option<String>,
    pub openai_base_url: Option<String>,
    pub openai_embedding_model: Option<String>,
    pub groq_api_key: Option<String>,
    pub groq_model: String,
    /// Points the chat model at another OpenAI-compatible API.
    pub llm_base_url: Option<String>,
    pub vector_store: StoreBackend,
    pub astra_endpoint: Option<String>,
    pub astra_token: Option<String>,
    pub astra_namespace: String,
    pub qdrant_url: String,
    pub collection: String,
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    pub top_k: usize,
    pub request_timeout: Duration,
    /// Retries after the first attempt for transient network failures.
    pub max_retries: u32,
}

/// The collection used when `COLLECTION_NAME` is unset.
pub const DEFAULT_COLLECTION: &str = "rag_collection";

impl Settings {
    /// Read settings from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read settings through `lookup`, which returns the value of a key if
    /// it is set. Empty values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let defaults = RagConfig::default();

        Ok(Self {
            embedding_backend: parse_or(&get, "EMBEDDING_BACKEND", EmbeddingBackend::Ollama)?,
            ollama_base_url: get("OLLAMA_BASE_URL")
                .unwrap_or_else(|| docqa_rag::ollama::OLLAMA_BASE_URL.to_string()),
            ollama_model: get("OLLAMA_MODEL")
                .unwrap_or_else(|| docqa_rag::ollama::DEFAULT_MODEL.to_string()),
            ollama_num_threads: parse_opt(&get, "OLLAMA_NUM_THREADS")?,
            embedding_dimensions: parse_opt(&get, "EMBEDDING_DIMENSIONS")?,
            openai_api_key: get("OPENAI_API_KEY"),
            openai_base_url: get("OPENAI_BASE_URL"),
            openai_embedding_model: get("OPENAI_EMBEDDING_MODEL"),
            groq_api_key: get("GROQ_API_KEY"),
            groq_model: get("GROQ_MODEL")
                .unwrap_or_else(|| docqa_rag::chat::DEFAULT_GROQ_MODEL.to_string()),
            llm_base_url: get("LLM_BASE_URL"),
            vector_store: parse_or(&get, "VECTOR_STORE", StoreBackend::Astra)?,
            astra_endpoint: get("ASTRA_DB_API_ENDPOINT"),
            astra_token: get("ASTRA_DB_APPLICATION_TOKEN"),
            astra_namespace: get("ASTRA_DB_NAMESPACE")
                .unwrap_or_else(|| docqa_rag::astra::DEFAULT_KEYSPACE.to_string()),
            qdrant_url: get("QDRANT_URL")
                .unwrap_or_else(|| docqa_rag::qdrant::DEFAULT_QDRANT_URL.to_string()),
            collection: get("COLLECTION_NAME").unwrap_or_else(|| DEFAULT_COLLECTION.to_string()),
            chunk_size: parse_or(&get, "CHUNK_SIZE", defaults.chunk_size)?,
            chunk_overlap: parse_or(&get, "CHUNK_OVERLAP", defaults.chunk_overlap)?,
            top_k: parse_or(&get, "RETRIEVAL_K", defaults.top_k)?,
            request_timeout: Duration::from_secs(parse_or(&get, "REQUEST_TIMEOUT_SECS", 60)?),
            max_retries: parse_or(&get, "MAX_RETRIES", 2)?,
        })
    }

    /// The pipeline configuration these settings describe.
    pub fn rag_config(&self) -> Result<RagConfig> {
        RagConfig::builder()
            .chunk_size(self.chunk_size)
            .chunk_overlap(self.chunk_overlap)
            .top_k(self.top_k)
            .build()
    }

    /// The retry policy for every network client.
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::with_max_attempts(self.max_retries.saturating_add(1))
    }

    /// Check that the selected embedding backend is configured.
    pub fn require_embedding(&self) -> Result<()> {
        match self.embedding_backend {
            EmbeddingBackend::Ollama => Ok(()),
            EmbeddingBackend::OpenAI => require("OPENAI_API_KEY", &self.openai_api_key),
        }
    }

    /// Check that the selected vector store is configured.
    pub fn require_store(&self) -> Result<()> {
        match self.vector_store {
            StoreBackend::Astra => {
                require("ASTRA_DB_API_ENDPOINT", &self.astra_endpoint)?;
                require("ASTRA_DB_APPLICATION_TOKEN", &self.astra_token)
            }
            StoreBackend::Qdrant | StoreBackend::Memory => Ok(()),
        }
    }

    /// Check that the chat model is configured.
    pub fn require_llm(&self) -> Result<()> {
        require("GROQ_API_KEY", &self.groq_api_key)
    }
}

fn require(key: &str, value: &Option<String>) -> Result<()> {
    match value {
        Some(_) => Ok(()),
        None => Err(RagError::ConfigError(format!("{key} is not set"))),
    }
}

fn parse_opt<T: FromStr>(get: &impl Fn(&str) -> Option<String>, key: &str) -> Result<Option<T>>
where
    T::Err: std::fmt::Display,
{
    get(key)
        .map(|raw| {
            raw.parse::<T>().map_err(|e| RagError::ConfigError(format!("{key}='{raw}': {e}")))
        })
        .transpose()
}

fn parse_or<T: FromStr>(get: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> Result<T>
where
    T::Err: std::fmt::Display,
{
    Ok(parse_opt(get, key)?.unwrap_or(default))
}
