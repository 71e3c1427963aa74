//! Construct providers, stores, and models from [`Settings`].

use std::sync::Arc;

use docqa_rag::{
    AstraVectorStore, ChatCompletionsModel, ChatModel, EmbeddingProvider, InMemoryVectorStore,
    OllamaEmbeddingProvider, OpenAIEmbeddingProvider, QdrantVectorStore, RagError, RagPipeline,
    Result, SourceLoader, VectorStore, WebLoader,
};
use tracing::{info, warn};

use crate::settings::{EmbeddingBackend, Settings, StoreBackend};

/// Build the embedding provider selected by `EMBEDDING_BACKEND`.
pub fn embedding_provider(settings: &Settings) -> Result<Arc<dyn EmbeddingProvider>> {
    settings.require_embedding()?;
    let retry = settings.retry_policy();

    let provider: Arc<dyn EmbeddingProvider> = match settings.embedding_backend {
        EmbeddingBackend::Ollama => {
            let dimensions = match settings.embedding_dimensions {
                Some(dimensions) => dimensions,
                None if settings.ollama_model == docqa_rag::ollama::DEFAULT_MODEL => {
                    docqa_rag::ollama::DEFAULT_DIMENSIONS
                }
                None => {
                    return Err(RagError::ConfigError(format!(
                        "EMBEDDING_DIMENSIONS is required for Ollama model '{}'",
                        settings.ollama_model
                    )));
                }
            };
            let mut provider = OllamaEmbeddingProvider::new()?
                .with_base_url(&settings.ollama_base_url)
                .with_model(&settings.ollama_model, dimensions)
                .with_timeout(settings.request_timeout)?
                .with_retry_policy(retry);
            if let Some(threads) = settings.ollama_num_threads {
                provider = provider.with_num_threads(threads);
            }
            Arc::new(provider)
        }
        EmbeddingBackend::OpenAI => {
            let api_key = settings.openai_api_key.clone().unwrap_or_default();
            let mut provider = OpenAIEmbeddingProvider::new(api_key)?
                .with_timeout(settings.request_timeout)?
                .with_retry_policy(retry);
            if let Some(base_url) = &settings.openai_base_url {
                provider = provider.with_base_url(base_url);
            }
            if let Some(model) = &settings.openai_embedding_model {
                provider = provider.with_model(model);
            }
            if let Some(dimensions) = settings.embedding_dimensions {
                provider = provider.with_dimensions(dimensions);
            }
            Arc::new(provider)
        }
    };

    info!(
        backend = ?settings.embedding_backend,
        dimensions = provider.dimensions(),
        "embedding provider ready"
    );
    Ok(provider)
}

/// Build the vector store selected by `VECTOR_STORE`.
pub fn vector_store(settings: &Settings) -> Result<Arc<dyn VectorStore>> {
    settings.require_store()?;
    let store: Arc<dyn VectorStore> = match settings.vector_store {
        StoreBackend::Astra => {
            let endpoint = settings.astra_endpoint.clone().unwrap_or_default();
            let token = settings.astra_token.clone().unwrap_or_default();
            Arc::new(
                AstraVectorStore::new(endpoint, token)?
                    .with_keyspace(&settings.astra_namespace)
                    .with_timeout(settings.request_timeout)?
                    .with_retry_policy(settings.retry_policy()),
            )
        }
        StoreBackend::Qdrant => Arc::new(QdrantVectorStore::new(&settings.qdrant_url)?),
        StoreBackend::Memory => {
            warn!("using the in-memory vector store; ingested data is lost on exit");
            Arc::new(InMemoryVectorStore::new())
        }
    };
    Ok(store)
}

/// Build the chat model: Groq by default, or any OpenAI-compatible API at
/// `LLM_BASE_URL`.
pub fn chat_model(settings: &Settings) -> Result<Arc<dyn ChatModel>> {
    settings.require_llm()?;
    let api_key = settings.groq_api_key.clone().unwrap_or_default();
    let model = match &settings.llm_base_url {
        Some(base_url) => {
            ChatCompletionsModel::new("LLM", api_key, base_url, &settings.groq_model)?
        }
        None => ChatCompletionsModel::groq(api_key, &settings.groq_model)?,
    };
    let model =
        model.with_timeout(settings.request_timeout)?.with_retry_policy(settings.retry_policy());
    Ok(Arc::new(model))
}

/// Build the pipeline. The chat model is attached only when `answering`.
pub fn pipeline(settings: &Settings, answering: bool) -> Result<RagPipeline> {
    let loader = SourceLoader::new()?.with_web_loader(
        WebLoader::new()?
            .with_timeout(settings.request_timeout)?
            .with_retry_policy(settings.retry_policy()),
    );

    let mut builder = RagPipeline::builder()
        .config(settings.rag_config()?)
        .embedding_provider(embedding_provider(settings)?)
        .vector_store(vector_store(settings)?)
        .loader(Arc::new(loader));
    if answering {
        builder = builder.chat_model(chat_model(settings)?);
    }
    builder.build()
}
