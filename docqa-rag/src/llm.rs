//! Chat model trait for text generation.

use async_trait::async_trait;

use crate::error::Result;

/// A language model that turns a prompt into text.
///
/// The pipeline sends a single user prompt and reads back the complete
/// response; streaming is not part of the contract.
#[async_trait]
pub trait ChatModel: Send + Sync {
    /// Name of the model, for logs.
    fn name(&self) -> &str;

    /// Generate a response to `prompt` at the given sampling temperature.
    async fn generate(&self, prompt: &str, temperature: f32) -> Result<String>;
}
