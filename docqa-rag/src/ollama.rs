//! Ollama embedding provider using the local `/api/embed` endpoint.
//!
//! This module is only available when the `ollama` feature is enabled.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, Result};
use crate::http;
use crate::retry::RetryPolicy;

/// The default Ollama server URL.
pub const OLLAMA_BASE_URL: &str = "http://localhost:11434";

/// The default embedding model.
pub const DEFAULT_MODEL: &str = "mxbai-embed-large:latest";

/// The dimensionality of `mxbai-embed-large`.
pub const DEFAULT_DIMENSIONS: usize = 1024;

const PROVIDER: &str = "Ollama";

/// An [`EmbeddingProvider`] backed by an Ollama server.
///
/// # Example
///
/// ```rust,ignore
/// use docqa_rag::ollama::OllamaEmbeddingProvider;
///
/// let provider = OllamaEmbeddingProvider::new()?.with_num_threads(10);
/// let embedding = provider.embed("hello world").await?;
/// ```
pub struct OllamaEmbeddingProvider {
    client: reqwest::Client,
    base_url: String,
    model: String,
    dimensions: usize,
    num_threads: Option<u32>,
    retry: RetryPolicy,
}

impl OllamaEmbeddingProvider {
    /// Create a provider for `mxbai-embed-large` on `localhost:11434`.
    pub fn new() -> Result<Self> {
        Ok(Self {
            client: build_client(http::DEFAULT_TIMEOUT)?,
            base_url: OLLAMA_BASE_URL.into(),
            model: DEFAULT_MODEL.into(),
            dimensions: DEFAULT_DIMENSIONS,
            num_threads: None,
            retry: RetryPolicy::default(),
        })
    }

    /// Set the Ollama server URL.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Set the model name and the dimensionality it produces.
    pub fn with_model(mut self, model: impl Into<String>, dimensions: usize) -> Self {
        self.model = model.into();
        self.dimensions = dimensions;
        self
    }

    /// Set the number of threads Ollama uses for the model.
    pub fn with_num_threads(mut self, threads: u32) -> Self {
        self.num_threads = Some(threads);
        self
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
}

fn build_client(timeout: Duration) -> Result<reqwest::Client> {
    http::client(timeout).map_err(|e| RagError::EmbeddingError {
        provider: PROVIDER.into(),
        message: format!("failed to build HTTP client: {e}"),
    })
}

#[derive(Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    input: &'a [&'a str],
    #[serde(skip_serializing_if = "Option::is_none")]
    options: Option<EmbedOptions>,
}

#[derive(Serialize)]
struct EmbedOptions {
    num_thread: u32,
}

#[derive(Deserialize)]
struct EmbedResponse {
    embeddings: Vec<Vec<f32>>,
}

#[async_trait]
impl EmbeddingProvider for OllamaEmbeddingProvider {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        debug!(provider = PROVIDER, text_len = text.len(), "embedding single text");

        let results = self.embed_batch(&[text]).await?;
        results.into_iter().next().ok_or_else(|| RagError::EmbeddingError {
            provider: PROVIDER.into(),
            message: "server returned no embeddings".into(),
        })
    }

    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        debug!(
            provider = PROVIDER,
            batch_size = texts.len(),
            model = %self.model,
            "embedding batch"
        );

        let url = format!("{}/api/embed", self.base_url);
        let body = EmbedRequest {
            model: &self.model,
            input: texts,
            options: self.num_threads.map(|num_thread| EmbedOptions { num_thread }),
        };

        let response: EmbedResponse =
            http::send_json(&self.retry, "ollama.embed", || self.client.post(&url).json(&body))
                .await
                .map_err(|e| {
                    error!(provider = PROVIDER, error = %e, "embedding request failed");
                    RagError::EmbeddingError { provider: PROVIDER.into(), message: e.message }
                })?;

        if response.embeddings.len() != texts.len() {
            return Err(RagError::EmbeddingError {
                provider: PROVIDER.into(),
                message: format!(
                    "server returned {} embeddings for {} inputs",
                    response.embeddings.len(),
                    texts.len()
                ),
            });
        }

        Ok(response.embeddings)
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}
