//! Shared HTTP plumbing for the REST backends: client construction with a
//! request timeout, retrying sends, and error classification.

use std::fmt;
use std::time::Duration;

use reqwest::{RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;

use crate::retry::{RetryPolicy, Transient};

/// Default per-request timeout for embedding, index, and web calls.
pub(crate) const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// A failed HTTP exchange, classified for the retry policy.
#[derive(Debug)]
pub(crate) struct HttpFailure {
    pub transient: bool,
    pub message: String,
}

impl fmt::Display for HttpFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl Transient for HttpFailure {
    fn is_transient(&self) -> bool {
        self.transient
    }
}

impl HttpFailure {
    fn from_reqwest(e: &reqwest::Error) -> Self {
        let transient = e.is_timeout() || e.is_connect();
        let message = if e.is_timeout() {
            format!("request timed out: {e}")
        } else {
            format!("request failed: {e}")
        };
        Self { transient, message }
    }

    fn from_status(status: StatusCode, body: &str) -> Self {
        let transient = status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error();
        Self { transient, message: format!("API returned {status}: {}", error_detail(body)) }
    }
}

/// Build a client whose requests time out after `timeout`.
pub(crate) fn client(timeout: Duration) -> reqwest::Result<reqwest::Client> {
    reqwest::Client::builder().timeout(timeout).build()
}

/// Send the request produced by `build`, retrying transient failures.
///
/// `build` is called once per attempt since a `RequestBuilder` is consumed
/// by sending. Non-success statuses are turned into [`HttpFailure`]s.
pub(crate) async fn send<F>(
    policy: &RetryPolicy,
    operation: &str,
    build: F,
) -> Result<Response, HttpFailure>
where
    F: Fn() -> RequestBuilder,
{
    let build = &build;
    policy
        .run(operation, move || async move {
            let response = build().send().await.map_err(|e| HttpFailure::from_reqwest(&e))?;
            let status = response.status();
            if status.is_success() {
                Ok(response)
            } else {
                let body = response.text().await.unwrap_or_default();
                Err(HttpFailure::from_status(status, &body))
            }
        })
        .await
}

/// Like [`send`], then decode the response body as JSON.
pub(crate) async fn send_json<R, F>(
    policy: &RetryPolicy,
    operation: &str,
    build: F,
) -> Result<R, HttpFailure>
where
    R: DeserializeOwned,
    F: Fn() -> RequestBuilder,
{
    let response = send(policy, operation, build).await?;
    response.json::<R>().await.map_err(|e| HttpFailure {
        transient: false,
        message: format!("failed to parse response: {e}"),
    })
}

/// Pull a human-readable message out of an error body.
///
/// Understands `{"error": {"message": ..}}` (OpenAI-compatible APIs),
/// `{"error": ".."}` (Ollama), and `{"errors": [{"message": ..}]}` (Astra DB).
/// Falls back to the raw body, truncated.
pub(crate) fn error_detail(body: &str) -> String {
    if let Ok(value) = serde_json::from_str::<serde_json::Value>(body) {
        let message = value
            .pointer("/error/message")
            .or_else(|| value.get("error"))
            .or_else(|| value.pointer("/errors/0/message"))
            .and_then(|m| m.as_str());
        if let Some(message) = message {
            return message.to_string();
        }
    }
    body.chars().take(500).collect()
}
