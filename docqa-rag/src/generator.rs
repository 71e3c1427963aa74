//! Grounded answer generation.

use std::sync::Arc;

use tracing::{debug, error};

use crate::document::SearchResult;
use crate::error::Result;
use crate::llm::ChatModel;

const PROMPT_PREAMBLE: &str = "Answer the following question based only on the provided context. \
Think step by step before answering. If you don't know the answer, just say that you don't know.";

/// Formats retrieved chunks and a question into a prompt and asks a
/// [`ChatModel`] for the answer.
///
/// The model output is returned unchanged, including an empty string.
#[derive(Clone)]
pub struct AnswerGenerator {
    model: Arc<dyn ChatModel>,
    temperature: f32,
}

impl AnswerGenerator {
    /// Create a generator sampling at `temperature`.
    pub fn new(model: Arc<dyn ChatModel>, temperature: f32) -> Self {
        Self { model, temperature }
    }

    /// Generate an answer to `question` from `context`.
    pub async fn generate(&self, question: &str, context: &[SearchResult]) -> Result<String> {
        let prompt = build_prompt(question, context);
        debug!(model = self.model.name(), context_chunks = context.len(), "generating answer");
        self.model.generate(&prompt, self.temperature).await.map_err(|e| {
            error!(model = self.model.name(), error = %e, "answer generation failed");
            e
        })
    }
}

/// Build the grounded prompt: instructions, the chunk texts inside a
/// `<context>` block separated by blank lines, then the question verbatim.
pub fn build_prompt(question: &str, context: &[SearchResult]) -> String {
    let context = context.iter().map(|r| r.chunk.text.as_str()).collect::<Vec<_>>().join("\n\n");
    format!("{PROMPT_PREAMBLE}\n\n<context>\n{context}\n</context>\n\nQuestion: {question}")
}
