//! Question-answering sessions over one collection.

use std::sync::Arc;

use tracing::{debug, info};

use crate::document::{Answer, IngestReport};
use crate::error::Result;
use crate::loader::SourceLocation;
use crate::pipeline::RagPipeline;

/// One answered question.
#[derive(Debug, Clone)]
pub struct Exchange {
    /// The question as asked.
    pub question: String,
    /// The answer and its supporting chunks.
    pub answer: Answer,
}

/// A conversation against one collection.
///
/// The session owns the context a host needs between questions: the
/// pipeline, the collection name, the number of chunks to retrieve, and the
/// history of answered questions. The history is for display only and is
/// never added to the prompt, so every question is answered independently.
///
/// # Example
///
/// ```rust,ignore
/// let mut session = Session::open(pipeline, "rag_collection").await?;
/// let answer = session.ask("What is an embedding?").await?;
/// println!("{}", answer.text);
/// let history = session.close();
/// ```
pub struct Session {
    pipeline: Arc<RagPipeline>,
    collection: String,
    top_k: usize,
    history: Vec<Exchange>,
}

impl Session {
    /// Open a session, creating the collection if it does not exist.
    pub async fn open(pipeline: Arc<RagPipeline>, collection: impl Into<String>) -> Result<Self> {
        let collection = collection.into();
        pipeline.create_collection(&collection).await?;
        let top_k = pipeline.config().top_k;
        info!(collection = %collection, "session opened");
        Ok(Self { pipeline, collection, top_k, history: Vec::new() })
    }

    /// Retrieve `k` chunks per question instead of the configured `top_k`.
    pub fn with_top_k(mut self, k: usize) -> Self {
        self.top_k = k;
        self
    }

    /// The collection this session queries.
    pub fn collection(&self) -> &str {
        &self.collection
    }

    /// The pipeline this session runs on.
    pub fn pipeline(&self) -> &Arc<RagPipeline> {
        &self.pipeline
    }

    /// Ingest sources into the session's collection.
    pub async fn ingest(&self, sources: &[SourceLocation]) -> Result<IngestReport> {
        self.pipeline.ingest_sources(&self.collection, sources).await
    }

    /// Answer a question and record the exchange. Failed questions are not
    /// recorded.
    pub async fn ask(&mut self, question: &str) -> Result<&Answer> {
        let answer = self.pipeline.ask(&self.collection, question, self.top_k).await?;
        self.history.push(Exchange { question: question.to_string(), answer });
        debug!(collection = %self.collection, exchanges = self.history.len(), "recorded exchange");
        let last = self.history.len() - 1;
        Ok(&self.history[last].answer)
    }

    /// Answered questions, oldest first.
    pub fn history(&self) -> &[Exchange] {
        &self.history
    }

    /// Forget all answered questions.
    pub fn clear_history(&mut self) {
        self.history.clear();
        debug!(collection = %self.collection, "cleared history");
    }

    /// End the session, returning its history.
    pub fn close(self) -> Vec<Exchange> {
        info!(collection = %self.collection, exchanges = self.history.len(), "session closed");
        self.history
    }
}
