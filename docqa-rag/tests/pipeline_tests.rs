//! End-to-end pipeline tests with deterministic mock embedders and models.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use docqa_rag::{
    ChatModel, Document, EmbeddingProvider, InMemoryVectorStore, RagConfig, RagError,
    RagPipeline, Result, Session, SourceLocation, VectorStore,
};

const DIM: usize = 64;

/// Bag-of-words embedding: each lowercase word is hashed into a bucket.
struct KeywordEmbedder {
    dimensions: usize,
    calls: AtomicUsize,
}

impl KeywordEmbedder {
    fn new(dimensions: usize) -> Self {
        Self { dimensions, calls: AtomicUsize::new(0) }
    }
}

fn bucket(word: &str, dimensions: usize) -> usize {
    word.bytes().fold(7usize, |h, b| h.wrapping_mul(31).wrapping_add(b as usize)) % dimensions
}

#[async_trait]
impl EmbeddingProvider for KeywordEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let mut vector = vec![0.0; self.dimensions];
        for word in text.split(|c: char| !c.is_alphanumeric()).filter(|w| !w.is_empty()) {
            vector[bucket(&word.to_lowercase(), self.dimensions)] += 1.0;
        }
        Ok(vector)
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}

/// Declares one dimensionality but produces another.
struct MisreportingEmbedder;

#[async_trait]
impl EmbeddingProvider for MisreportingEmbedder {
    async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
        Ok(vec![1.0; 4])
    }

    fn dimensions(&self) -> usize {
        8
    }
}

/// Points questions in the opposite direction of every stored chunk.
struct OpposingEmbedder;

#[async_trait]
impl EmbeddingProvider for OpposingEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let sign = if text.trim_end().ends_with('?') { -1.0 } else { 1.0 };
        Ok(vec![sign, 0.0, 0.0, 0.0])
    }

    fn dimensions(&self) -> usize {
        4
    }
}

/// Answers by repeating the context block of the prompt.
#[derive(Default)]
struct EchoModel {
    calls: AtomicUsize,
}

#[async_trait]
impl ChatModel for EchoModel {
    fn name(&self) -> &str {
        "echo"
    }

    async fn generate(&self, prompt: &str, temperature: f32) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        assert!((temperature - 0.2).abs() < f32::EPSILON);
        let context = prompt
            .split_once("<context>")
            .and_then(|(_, rest)| rest.split_once("</context>"))
            .map(|(context, _)| context.trim())
            .unwrap_or_default();
        Ok(format!("According to the documents: {context}"))
    }
}

struct FailingModel;

#[async_trait]
impl ChatModel for FailingModel {
    fn name(&self) -> &str {
        "failing"
    }

    async fn generate(&self, _prompt: &str, _temperature: f32) -> Result<String> {
        Err(RagError::GenerationError { provider: "mock".into(), message: "unavailable".into() })
    }
}

fn memory_store() -> Arc<dyn VectorStore> {
    Arc::new(InMemoryVectorStore::new())
}

fn pipeline_with(
    embedder: Arc<dyn EmbeddingProvider>,
    store: Arc<dyn VectorStore>,
    model: Option<Arc<dyn ChatModel>>,
) -> RagPipeline {
    let mut builder = RagPipeline::builder()
        .config(RagConfig::default())
        .embedding_provider(embedder)
        .vector_store(store);
    if let Some(model) = model {
        builder = builder.chat_model(model);
    }
    builder.build().unwrap()
}

#[tokio::test]
async fn answers_from_single_chunk_document() {
    let store = Arc::new(InMemoryVectorStore::new());
    let model = Arc::new(EchoModel::default());
    let pipeline =
        pipeline_with(Arc::new(KeywordEmbedder::new(DIM)), store.clone(), Some(model.clone()));

    pipeline.create_collection("docs").await.unwrap();
    let chunks = pipeline
        .ingest("docs", &Document::new("facts.txt", "Paris is the capital of France."))
        .await
        .unwrap();
    assert_eq!(chunks.len(), 1);
    assert_eq!(store.count("docs").await.unwrap(), 1);

    let answer = pipeline.ask("docs", "What is the capital of France?", 1).await.unwrap();
    assert!(answer.text.contains("Paris"));
    assert_eq!(answer.sources.len(), 1);
    assert_eq!(answer.sources[0].chunk.text, "Paris is the capital of France.");
    assert_eq!(answer.sources[0].chunk.source(), "facts.txt");
    assert_eq!(model.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn empty_index_never_calls_the_model() {
    let embedder = Arc::new(KeywordEmbedder::new(DIM));
    let model = Arc::new(EchoModel::default());
    let pipeline = pipeline_with(
        embedder.clone(),
        Arc::new(InMemoryVectorStore::new()),
        Some(model.clone()),
    );

    pipeline.create_collection("empty").await.unwrap();
    let err = pipeline.ask("empty", "Anything?", 3).await.unwrap_err();
    assert!(matches!(err, RagError::EmptyIndex { ref collection } if collection == "empty"));
    assert_eq!(model.calls.load(Ordering::SeqCst), 0);
    assert_eq!(embedder.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn asking_a_collection_that_was_never_created_is_an_empty_index() {
    let embedder = Arc::new(KeywordEmbedder::new(DIM));
    let model = Arc::new(EchoModel::default());
    let pipeline = pipeline_with(embedder.clone(), memory_store(), Some(model.clone()));

    let err = pipeline.ask("never_ingested", "Anything?", 3).await.unwrap_err();
    assert!(
        matches!(err, RagError::EmptyIndex { ref collection } if collection == "never_ingested")
    );
    let err = pipeline.query("never_ingested", "Anything?").await.unwrap_err();
    assert_eq!(err.kind(), "empty_index");
    assert_eq!(model.calls.load(Ordering::SeqCst), 0);
    assert_eq!(embedder.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn default_retrieval_keeps_negatively_scored_chunks() {
    let model = Arc::new(EchoModel::default());
    let pipeline = pipeline_with(Arc::new(OpposingEmbedder), memory_store(), Some(model.clone()));
    pipeline.create_collection("docs").await.unwrap();
    let facts = Document::new("facts.txt", "Paris is the capital of France.");
    pipeline.ingest("docs", &facts).await.unwrap();

    let answer = pipeline.ask("docs", "What is the capital of France?", 1).await.unwrap();
    assert_eq!(answer.sources.len(), 1);
    assert!(answer.sources[0].score < 0.0);
    assert!(answer.text.contains("Paris"));
    assert_eq!(model.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn threshold_that_removes_every_chunk_skips_the_model() {
    let model = Arc::new(EchoModel::default());
    let pipeline = RagPipeline::builder()
        .config(RagConfig::builder().similarity_threshold(0.5).build().unwrap())
        .embedding_provider(Arc::new(OpposingEmbedder))
        .vector_store(memory_store())
        .chat_model(model.clone())
        .build()
        .unwrap();
    pipeline.create_collection("docs").await.unwrap();
    let facts = Document::new("facts.txt", "Paris is the capital of France.");
    pipeline.ingest("docs", &facts).await.unwrap();

    assert!(pipeline.query("docs", "What is the capital of France?").await.unwrap().is_empty());
    let err = pipeline.ask("docs", "What is the capital of France?", 1).await.unwrap_err();
    assert!(matches!(err, RagError::NoRelevantContext { ref collection } if collection == "docs"));
    assert_eq!(model.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn reingesting_does_not_duplicate_entries() {
    let store = Arc::new(InMemoryVectorStore::new());
    let config = RagConfig::builder().chunk_size(40).chunk_overlap(10).build().unwrap();
    let pipeline = RagPipeline::builder()
        .config(config)
        .embedding_provider(Arc::new(KeywordEmbedder::new(DIM)))
        .vector_store(store.clone())
        .build()
        .unwrap();

    let document = Document::new(
        "notes.txt",
        "Embeddings map text to vectors. Similar texts have nearby vectors. \
         Vector stores answer nearest neighbour queries.",
    );
    pipeline.create_collection("docs").await.unwrap();
    let first = pipeline.ingest("docs", &document).await.unwrap();
    let once = store.count("docs").await.unwrap();
    pipeline.ingest("docs", &document).await.unwrap();

    assert!(first.len() > 1);
    assert_eq!(once, first.len());
    assert_eq!(store.count("docs").await.unwrap(), once);
}

#[tokio::test]
async fn results_are_ordered_and_bounded() {
    let pipeline = pipeline_with(Arc::new(KeywordEmbedder::new(DIM)), memory_store(), None);
    pipeline.create_collection("docs").await.unwrap();
    let documents = [
        Document::new("a.txt", "Rust ownership and borrowing rules."),
        Document::new("b.txt", "Borrowing in Rust prevents data races."),
        Document::new("c.txt", "Paris has many museums."),
        Document::new("d.txt", "Tokio is an async runtime for Rust."),
    ];
    pipeline.ingest_batch("docs", &documents).await.unwrap();

    let results = pipeline.query("docs", "How does borrowing work in Rust?").await.unwrap();
    assert!(results.len() <= pipeline.config().top_k);
    assert!(results.windows(2).all(|w| w[0].score >= w[1].score));
    assert!(results[0].chunk.text.contains("orrowing"));
}

#[tokio::test]
async fn misreported_dimensions_fail_ingestion() {
    let pipeline =
        pipeline_with(Arc::new(MisreportingEmbedder), Arc::new(InMemoryVectorStore::new()), None);
    pipeline.create_collection("docs").await.unwrap();
    let err = pipeline.ingest("docs", &Document::new("a.txt", "some text")).await.unwrap_err();
    assert!(matches!(err, RagError::DimensionMismatch { expected: 8, actual: 4 }));
}

#[tokio::test]
async fn querying_with_another_dimensionality_fails() {
    let store = Arc::new(InMemoryVectorStore::new());
    let ingesting = pipeline_with(Arc::new(KeywordEmbedder::new(DIM)), store.clone(), None);
    ingesting.create_collection("docs").await.unwrap();
    ingesting.ingest("docs", &Document::new("a.txt", "Paris is in France.")).await.unwrap();

    let querying = pipeline_with(Arc::new(KeywordEmbedder::new(32)), store, None);
    let err = querying.create_collection("docs").await.unwrap_err();
    assert!(matches!(err, RagError::DimensionMismatch { expected: 64, actual: 32 }));
    let err = querying.query("docs", "Where is Paris?").await.unwrap_err();
    assert!(matches!(err, RagError::DimensionMismatch { .. }));
}

#[tokio::test]
async fn sentence_across_page_break_is_retrievable_intact() {
    let pipeline = pipeline_with(Arc::new(KeywordEmbedder::new(DIM)), memory_store(), None);
    pipeline.create_collection("docs").await.unwrap();

    let page1 =
        Document::new("report.pdf", "Results were strong. The reactor reached full power on the")
            .with_page(1);
    let page2 =
        Document::new("report.pdf", "third day of testing. Maintenance followed.").with_page(2);
    pipeline.ingest_batch("docs", &[page1, page2]).await.unwrap();

    let results = pipeline.query("docs", "When did the reactor reach full power?").await.unwrap();
    assert!(
        results
            .iter()
            .any(|r| r.chunk.text.contains("reached full power on the third day of testing."))
    );
}

#[tokio::test]
async fn failed_sources_are_reported_and_others_ingested() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("good.txt"), "LangChain loaders read text files.").unwrap();
    std::fs::write(dir.path().join("notes.md"), "# Notes\n\nMarkdown is loaded as text.").unwrap();
    std::fs::write(dir.path().join("ignored.csv"), "a,b").unwrap();
    std::fs::write(dir.path().join("bad.docx"), "binary").unwrap();

    let store = Arc::new(InMemoryVectorStore::new());
    let pipeline = pipeline_with(Arc::new(KeywordEmbedder::new(DIM)), store.clone(), None);
    let report = pipeline
        .ingest_sources(
            "docs",
            &[
                SourceLocation::text_dir(dir.path()),
                SourceLocation::File(dir.path().join("missing.txt")),
                SourceLocation::File(dir.path().join("bad.docx")),
            ],
        )
        .await
        .unwrap();

    assert_eq!(report.documents, 2);
    assert_eq!(report.chunks_inserted, 2);
    assert_eq!(report.failures.len(), 2);
    assert!(report.failures.iter().all(|f| matches!(f.error, RagError::IngestionError { .. })));
    assert!(!report.all_failed());
    assert_eq!(store.count("docs").await.unwrap(), 2);
}

#[tokio::test]
async fn asking_without_a_model_is_a_config_error() {
    let pipeline = pipeline_with(Arc::new(KeywordEmbedder::new(DIM)), memory_store(), None);
    pipeline.create_collection("docs").await.unwrap();
    let err = pipeline.ask("docs", "question", 3).await.unwrap_err();
    assert!(matches!(err, RagError::ConfigError(_)));
}

#[tokio::test]
async fn session_records_and_clears_history() {
    let pipeline = Arc::new(pipeline_with(
        Arc::new(KeywordEmbedder::new(DIM)),
        Arc::new(InMemoryVectorStore::new()),
        Some(Arc::new(EchoModel::default())),
    ));
    let mut session = Session::open(pipeline.clone(), "chat").await.unwrap();
    let facts = Document::new("facts.txt", "Paris is the capital of France.");
    pipeline.ingest("chat", &facts).await.unwrap();

    let answer = session.ask("What is the capital of France?").await.unwrap();
    assert!(answer.text.contains("Paris"));
    session.ask("Which country is Paris in?").await.unwrap();
    assert_eq!(session.history().len(), 2);
    assert_eq!(session.history()[0].question, "What is the capital of France?");

    session.clear_history();
    assert!(session.history().is_empty());
    session.ask("Capital?").await.unwrap();
    let history = session.close();
    assert_eq!(history.len(), 1);
}

#[tokio::test]
async fn generation_errors_surface_and_are_not_recorded() {
    let pipeline = Arc::new(pipeline_with(
        Arc::new(KeywordEmbedder::new(DIM)),
        Arc::new(InMemoryVectorStore::new()),
        Some(Arc::new(FailingModel)),
    ));
    let mut session = Session::open(pipeline.clone(), "chat").await.unwrap();
    let facts = Document::new("facts.txt", "Paris is the capital of France.");
    pipeline.ingest("chat", &facts).await.unwrap();

    let err = session.ask("What is the capital of France?").await.unwrap_err();
    assert_eq!(err.kind(), "generation");
    assert!(session.history().is_empty());
}
