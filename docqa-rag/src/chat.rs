//! Chat model client for OpenAI-compatible `/chat/completions` APIs.
//!
//! Groq, OpenAI, DeepSeek, and local servers such as vLLM all speak this
//! protocol; [`ChatCompletionsModel::groq`] and
//! [`ChatCompletionsModel::openai`] preset the base URL.
//!
//! This module is only available when the `openai` feature is enabled.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::error::{RagError, Result};
use crate::http;
use crate::llm::ChatModel;
use crate::openai::OPENAI_API_BASE;
use crate::retry::RetryPolicy;

/// Groq's OpenAI-compatible API base URL.
pub const GROQ_API_BASE: &str = "https://api.groq.com/openai/v1";

/// The default Groq model.
pub const DEFAULT_GROQ_MODEL: &str = "openai/gpt-oss-120b";

/// Generation calls wait longer than embedding calls.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

/// A [`ChatModel`] backed by an OpenAI-compatible chat completions API.
///
/// # Example
///
/// ```rust,ignore
/// use docqa_rag::chat::ChatCompletionsModel;
///
/// let model = ChatCompletionsModel::groq(std::env::var("GROQ_API_KEY")?, "openai/gpt-oss-120b")?;
/// let text = model.generate("Say hello", 0.2).await?;
/// ```
pub struct ChatCompletionsModel {
    client: reqwest::Client,
    provider: String,
    api_key: String,
    base_url: String,
    model: String,
    max_tokens: Option<u32>,
    retry: RetryPolicy,
}

impl ChatCompletionsModel {
    /// Create a client for any compatible API.
    pub fn new(
        provider: impl Into<String>,
        api_key: impl Into<String>,
        base_url: impl Into<String>,
        model: impl Into<String>,
    ) -> Result<Self> {
        let provider = provider.into();
        let api_key = api_key.into();
        if api_key.is_empty() {
            return Err(RagError::GenerationError {
                provider,
                message: "API key must not be empty".into(),
            });
        }
        let client = build_client(&provider, DEFAULT_TIMEOUT)?;
        Ok(Self {
            client,
            provider,
            api_key,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: model.into(),
            max_tokens: None,
            retry: RetryPolicy::default(),
        })
    }

    /// Create a client for Groq.
    pub fn groq(api_key: impl Into<String>, model: impl Into<String>) -> Result<Self> {
        Self::new("Groq", api_key, GROQ_API_BASE, model)
    }

    /// Create a client for OpenAI.
    pub fn openai(api_key: impl Into<String>, model: impl Into<String>) -> Result<Self> {
        Self::new("OpenAI", api_key, OPENAI_API_BASE, model)
    }

    /// Cap the number of generated tokens.
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    /// Set the per-request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Result<Self> {
        self.client = build_client(&self.provider, timeout)?;
        Ok(self)
    }

    /// Set the retry policy for transient failures.
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }
}

fn build_client(provider: &str, timeout: Duration) -> Result<reqwest::Client> {
    http::client(timeout).map_err(|e| RagError::GenerationError {
        provider: provider.to_string(),
        message: format!("failed to build HTTP client: {e}"),
    })
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 1],
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

#[async_trait]
impl ChatModel for ChatCompletionsModel {
    fn name(&self) -> &str {
        &self.model
    }

    async fn generate(&self, prompt: &str, temperature: f32) -> Result<String> {
        debug!(
            provider = %self.provider,
            model = %self.model,
            prompt_len = prompt.len(),
            temperature,
            "generating"
        );

        let url = format!("{}/chat/completions", self.base_url);
        let body = ChatRequest {
            model: &self.model,
            messages: [ChatMessage { role: "user", content: prompt }],
            temperature,
            max_tokens: self.max_tokens,
        };

        let response: ChatResponse = http::send_json(&self.retry, "chat.completions", || {
            self.client.post(&url).bearer_auth(&self.api_key).json(&body)
        })
        .await
        .map_err(|e| {
            error!(provider = %self.provider, error = %e, "chat completion failed");
            RagError::GenerationError { provider: self.provider.clone(), message: e.message }
        })?;

        // Missing or empty content is passed through as an empty answer.
        Ok(response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .unwrap_or_default())
    }
}
