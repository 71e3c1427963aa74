//! Property tests for in-memory vector store search ordering and upsert
//! semantics.

use std::collections::HashMap;

use docqa_rag::document::Chunk;
use docqa_rag::inmemory::InMemoryVectorStore;
use docqa_rag::vectorstore::VectorStore;
use proptest::prelude::*;

/// Generate a non-zero L2-normalized embedding of the given dimension.
fn arb_normalized_embedding(dim: usize) -> impl Strategy<Value = Vec<f32>> {
    proptest::collection::vec(-1.0f32..1.0f32, dim).prop_filter_map("non-zero embedding", |mut v| {
        let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm < 1e-8 {
            return None;
        }
        for val in &mut v {
            *val /= norm;
        }
        Some(v)
    })
}

/// Generate a chunk with a normalized embedding.
fn arb_chunk(dim: usize) -> impl Strategy<Value = Chunk> {
    ("[a-z]{3,8}", "[a-z ]{5,30}", arb_normalized_embedding(dim)).prop_map(
        |(id, text, embedding)| Chunk {
            id,
            text,
            embedding,
            metadata: HashMap::new(),
            document_id: "doc_1".to_string(),
        },
    )
}

/// Searching returns results ordered by non-increasing cosine similarity,
/// at most `top_k` of them.
mod prop_inmemory_search_ordering {
    use super::*;

    const DIM: usize = 16;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        #[test]
        fn results_ordered_descending_and_bounded_by_top_k(
            chunks in proptest::collection::vec(arb_chunk(DIM), 1..20),
            query in arb_normalized_embedding(DIM),
            top_k in 1usize..25,
        ) {
            let rt = tokio::runtime::Runtime::new().unwrap();
            let (results, unique_count) = rt.block_on(async {
                let store = InMemoryVectorStore::new();
                store.create_collection("test", DIM).await.unwrap();
                store.upsert("test", &chunks).await.unwrap();
                let unique_count = store.count("test").await.unwrap();
                let results = store.search("test", &query, top_k).await.unwrap();
                (results, unique_count)
            });

            prop_assert!(results.len() <= top_k);
            prop_assert_eq!(results.len(), top_k.min(unique_count));

            for window in results.windows(2) {
                prop_assert!(
                    window[0].score >= window[1].score,
                    "results not in descending order: {} < {}",
                    window[0].score,
                    window[1].score,
                );
            }
        }

        /// Upserting the same chunks twice leaves the entry count unchanged.
        #[test]
        fn repeated_upsert_does_not_duplicate(
            chunks in proptest::collection::vec(arb_chunk(DIM), 1..20),
        ) {
            let rt = tokio::runtime::Runtime::new().unwrap();
            let (once, twice) = rt.block_on(async {
                let store = InMemoryVectorStore::new();
                store.create_collection("test", DIM).await.unwrap();
                store.upsert("test", &chunks).await.unwrap();
                let once = store.count("test").await.unwrap();
                store.upsert("test", &chunks).await.unwrap();
                (once, store.count("test").await.unwrap())
            });
            prop_assert_eq!(once, twice);
        }
    }
}

#[tokio::test]
async fn delete_removes_entries_and_collection() {
    let store = InMemoryVectorStore::new();
    store.create_collection("c", 2).await.unwrap();
    let chunk = |id: &str, embedding: Vec<f32>| Chunk {
        id: id.to_string(),
        text: id.to_string(),
        embedding,
        metadata: HashMap::new(),
        document_id: "doc".to_string(),
    };
    let written =
        store.upsert("c", &[chunk("a", vec![1.0, 0.0]), chunk("b", vec![0.0, 1.0])]).await.unwrap();
    assert_eq!(written, 2);

    store.delete("c", &["a"]).await.unwrap();
    let results = store.search("c", &[1.0, 0.0], 5).await.unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].chunk.id, "b");

    store.delete_collection("c").await.unwrap();
    assert!(store.count("c").await.is_err());
}
