//! DataStax Astra DB vector store backend using the JSON Data API.
//!
//! Every operation is one JSON command POSTed to
//! `{endpoint}/api/json/v1/{keyspace}[/{collection}]`. The Data API reports
//! command failures in an `errors` array of a `200 OK` response, so both the
//! HTTP status and the body are checked.
//!
//! This module is only available when the `astra` feature is enabled.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use futures::{StreamExt, TryStreamExt};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::debug;

use crate::document::{Chunk, SearchResult};
use crate::error::{RagError, Result};
use crate::http;
use crate::retry::RetryPolicy;
use crate::vectorstore::VectorStore;

/// The keyspace Astra creates for new databases.
pub const DEFAULT_KEYSPACE: &str = "default_keyspace";

const BACKEND: &str = "AstraDB";

/// Concurrent replace commands during an upsert.
const UPSERT_CONCURRENCY: usize = 8;

/// A [`VectorStore`] backed by an Astra DB serverless vector database.
///
/// Chunks are stored as documents keyed by chunk id, with the vector in
/// `$vector`, the text in `content`, and metadata as a nested object.
/// Upserts use `findOneAndReplace` with `upsert: true`, so re-ingesting a
/// chunk overwrites it.
///
/// Scores returned by [`search`](VectorStore::search) are Astra's
/// `$similarity`, which for the cosine metric is `(1 + cos) / 2` in `[0, 1]`.
///
/// # Example
///
/// ```rust,ignore
/// use docqa_rag::astra::AstraVectorStore;
///
/// let store = AstraVectorStore::new(
///     "https://<db-id>-<region>.apps.astra.datastax.com",
///     std::env::var("ASTRA_DB_APPLICATION_TOKEN")?,
/// )?;
/// store.create_collection("rag_collection", 1024).await?;
/// ```
pub struct AstraVectorStore {
    client: reqwest::Client,
    endpoint: String,
    token: String,
    keyspace: String,
    retry: RetryPolicy,
}

impl AstraVectorStore {
    /// Create a store for the database at `endpoint` in the default keyspace.
    pub fn new(endpoint: impl Into<String>, token: impl Into<String>) -> Result<Self> {
        let token = token.into();
        if token.is_empty() {
            return Err(RagError::VectorStoreError {
                backend: BACKEND.into(),
                message: "application token must not be empty".into(),
            });
        }
        Ok(Self {
            client: build_client(http::DEFAULT_TIMEOUT)?,
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            token,
            keyspace: DEFAULT_KEYSPACE.into(),
            retry: RetryPolicy::default(),
        })
    }

    /// Use a keyspace other than [`DEFAULT_KEYSPACE`].
    pub fn with_keyspace(mut self, keyspace: impl Into<String>) -> Self {
        self.keyspace = keyspace.into();
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

    /// Run a command against the keyspace (`collection = None`) or a collection.
    async fn command(&self, collection: Option<&str>, body: Value) -> Result<CommandResponse> {
        let url = match collection {
            Some(name) => format!("{}/api/json/v1/{}/{name}", self.endpoint, self.keyspace),
            None => format!("{}/api/json/v1/{}", self.endpoint, self.keyspace),
        };
        let operation = body
            .as_object()
            .and_then(|o| o.keys().next())
            .map(|k| format!("astra.{k}"))
            .unwrap_or_else(|| "astra".into());

        let response: CommandResponse = http::send_json(&self.retry, &operation, || {
            self.client.post(&url).header("Token", &self.token).json(&body)
        })
        .await
        .map_err(|e| store_error(e.message))?;

        if let Some(error) = response.errors.first() {
            let message = match &error.error_code {
                Some(code) => format!("{code}: {}", error.message),
                None => error.message.clone(),
            };
            return Err(store_error(message));
        }
        Ok(response)
    }

    /// Declared vector dimension of an existing collection, if it exists.
    async fn existing_dimensions(&self, name: &str) -> Result<Option<Option<usize>>> {
        let response = self
            .command(None, json!({ "findCollections": { "options": { "explain": true } } }))
            .await?;
        let collections = response.status.get("collections").and_then(Value::as_array);
        let found = collections
            .into_iter()
            .flatten()
            .find(|c| c.get("name").and_then(Value::as_str) == Some(name));
        Ok(found.map(|c| {
            c.pointer("/options/vector/dimension").and_then(Value::as_u64).map(|d| d as usize)
        }))
    }
}

fn build_client(timeout: Duration) -> Result<reqwest::Client> {
    http::client(timeout).map_err(|e| store_error(format!("failed to build HTTP client: {e}")))
}

fn store_error(message: impl Into<String>) -> RagError {
    RagError::VectorStoreError { backend: BACKEND.into(), message: message.into() }
}

#[derive(Debug, Default, Deserialize)]
struct CommandResponse {
    #[serde(default)]
    status: serde_json::Map<String, Value>,
    #[serde(default)]
    data: Option<FindData>,
    #[serde(default)]
    errors: Vec<CommandError>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CommandError {
    #[serde(default)]
    message: String,
    #[serde(default)]
    error_code: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct FindData {
    #[serde(default)]
    documents: Vec<StoredChunk>,
}

#[derive(Debug, Deserialize)]
struct StoredChunk {
    #[serde(rename = "_id")]
    id: String,
    #[serde(default)]
    content: String,
    #[serde(default)]
    document_id: String,
    #[serde(default)]
    metadata: HashMap<String, String>,
    #[serde(rename = "$similarity", default)]
    similarity: f32,
}

fn replacement(chunk: &Chunk) -> Value {
    json!({
        "findOneAndReplace": {
            "filter": { "_id": chunk.id },
            "replacement": {
                "_id": chunk.id,
                "$vector": chunk.embedding,
                "content": chunk.text,
                "document_id": chunk.document_id,
                "metadata": chunk.metadata,
            },
            "options": { "upsert": true },
        }
    })
}

#[async_trait]
impl VectorStore for AstraVectorStore {
    async fn create_collection(&self, name: &str, dimensions: usize) -> Result<()> {
        match self.existing_dimensions(name).await? {
            Some(Some(existing)) if existing != dimensions => {
                return Err(RagError::DimensionMismatch { expected: existing, actual: dimensions });
            }
            Some(_) => {
                debug!(collection = name, "astra collection already exists, skipping creation");
                return Ok(());
            }
            None => {}
        }

        self.command(
            None,
            json!({
                "createCollection": {
                    "name": name,
                    "options": { "vector": { "dimension": dimensions, "metric": "cosine" } },
                }
            }),
        )
        .await?;
        debug!(collection = name, dimensions, "created astra collection");
        Ok(())
    }

    async fn delete_collection(&self, name: &str) -> Result<()> {
        self.command(None, json!({ "deleteCollection": { "name": name } })).await?;
        debug!(collection = name, "deleted astra collection");
        Ok(())
    }

    async fn upsert(&self, collection: &str, chunks: &[Chunk]) -> Result<usize> {
        if chunks.is_empty() {
            return Ok(0);
        }

        futures::stream::iter(chunks.iter().map(replacement))
            .map(|body| self.command(Some(collection), body))
            .buffer_unordered(UPSERT_CONCURRENCY)
            .try_for_each(|_| async { Ok(()) })
            .await?;

        debug!(collection, count = chunks.len(), "upserted chunks to astra");
        Ok(chunks.len())
    }

    async fn delete(&self, collection: &str, ids: &[&str]) -> Result<()> {
        if ids.is_empty() {
            return Ok(());
        }
        let filter = json!({ "deleteMany": { "filter": { "_id": { "$in": ids } } } });
        self.command(Some(collection), filter).await?;
        debug!(collection, count = ids.len(), "deleted documents from astra");
        Ok(())
    }

    /// Exact up to the Data API's counting limit (1000); beyond it the
    /// limit is returned.
    async fn count(&self, collection: &str) -> Result<usize> {
        if self.existing_dimensions(collection).await?.is_none() {
            return Ok(0);
        }
        let response = self.command(Some(collection), json!({ "countDocuments": {} })).await?;
        let count = response
            .status
            .get("count")
            .and_then(Value::as_u64)
            .ok_or_else(|| store_error("countDocuments response has no count"))?;
        Ok(count as usize)
    }

    async fn search(
        &self,
        collection: &str,
        embedding: &[f32],
        top_k: usize,
    ) -> Result<Vec<SearchResult>> {
        let response = self
            .command(
                Some(collection),
                json!({
                    "find": {
                        "sort": { "$vector": embedding },
                        "projection": { "$vector": 0 },
                        "options": { "limit": top_k, "includeSimilarity": true },
                    }
                }),
            )
            .await?;

        let documents = response.data.unwrap_or_default().documents;
        let mut results: Vec<SearchResult> = documents
            .into_iter()
            .map(|doc| SearchResult {
                chunk: Chunk {
                    id: doc.id,
                    text: doc.content,
                    embedding: Vec::new(),
                    metadata: doc.metadata,
                    document_id: doc.document_id,
                },
                score: doc.similarity,
            })
            .collect();
        results.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        results.truncate(top_k);
        Ok(results)
    }
}
