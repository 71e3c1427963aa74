//! Backend construction from settings, without network access.

use std::collections::HashMap;

use docqa_cli::Settings;
use docqa_cli::backend;
use docqa_rag::RagError;

fn settings(pairs: &[(&str, &str)]) -> Settings {
    let env: HashMap<String, String> =
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
    Settings::from_lookup(|key| env.get(key).cloned()).unwrap()
}

#[test]
fn default_ollama_model_knows_its_dimensions() {
    let provider = backend::embedding_provider(&settings(&[])).unwrap();
    assert_eq!(provider.dimensions(), 1024);
}

#[test]
fn custom_ollama_model_needs_dimensions() {
    let err = backend::embedding_provider(&settings(&[("OLLAMA_MODEL", "nomic-embed-text")]))
        .err()
        .unwrap();
    assert!(matches!(err, RagError::ConfigError(ref m) if m.contains("EMBEDDING_DIMENSIONS")));

    let provider = backend::embedding_provider(&settings(&[
        ("OLLAMA_MODEL", "nomic-embed-text"),
        ("EMBEDDING_DIMENSIONS", "768"),
    ]))
    .unwrap();
    assert_eq!(provider.dimensions(), 768);
}

#[test]
fn astra_without_credentials_is_rejected() {
    let err = backend::vector_store(&settings(&[])).err().unwrap();
    assert_eq!(err.kind(), "config");
}

#[tokio::test]
async fn memory_pipeline_builds_without_a_model() {
    let s = settings(&[("VECTOR_STORE", "memory")]);
    let pipeline = backend::pipeline(&s, false).unwrap();
    assert_eq!(pipeline.config().top_k, 3);

    let err = backend::pipeline(&s, true).err().unwrap();
    assert!(err.to_string().contains("GROQ_API_KEY"));
}
