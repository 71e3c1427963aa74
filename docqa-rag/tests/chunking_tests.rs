//! Property tests for chunk size, overlap, and lossless reconstruction.

use docqa_rag::chunking::{Chunker, FixedSizeChunker, RecursiveChunker};
use docqa_rag::document::{Chunk, Document};
use proptest::prelude::*;

/// Text with words, sentence ends, line and paragraph breaks, and some
/// multi-byte characters.
fn arb_text() -> impl Strategy<Value = String> {
    proptest::collection::vec(
        prop_oneof![
            6 => "[a-zé]{1,12}",
            3 => Just(" ".to_string()),
            1 => Just(". ".to_string()),
            1 => Just("\n".to_string()),
            1 => Just("\n\n".to_string()),
            1 => Just("日本".to_string()),
        ],
        0..200,
    )
    .prop_map(|parts| parts.concat())
}

/// Size and overlap with `overlap < size`.
fn arb_params() -> impl Strategy<Value = (usize, usize)> {
    (1usize..120).prop_flat_map(|size| (Just(size), 0..size))
}

fn start(chunk: &Chunk) -> usize {
    chunk.start_index().expect("chunks carry start_index")
}

/// Rebuild the document by dropping each chunk's overlap with the previous one.
fn reconstruct(chunks: &[Chunk]) -> String {
    let mut text = String::new();
    let mut covered = 0;
    for chunk in chunks {
        let skip = covered - start(chunk);
        text.extend(chunk.text.chars().skip(skip));
        covered = start(chunk) + chunk.text.chars().count();
    }
    text
}

fn check_invariants(
    chunks: &[Chunk],
    text: &str,
    size: usize,
    overlap: usize,
) -> Result<(), TestCaseError> {
    let len = text.chars().count();
    if len == 0 {
        prop_assert!(chunks.is_empty());
        return Ok(());
    }
    if len <= size {
        prop_assert_eq!(chunks.len(), 1);
        prop_assert_eq!(chunks[0].text.as_str(), text);
    }

    prop_assert_eq!(reconstruct(chunks), text);
    for chunk in chunks {
        prop_assert!(chunk.text.chars().count() <= size);
        prop_assert!(!chunk.text.is_empty());
    }
    for pair in chunks.windows(2) {
        let prev_end = start(&pair[0]) + pair[0].text.chars().count();
        let shared = prev_end - start(&pair[1]);
        prop_assert!(shared >= overlap, "overlap {} below {}", shared, overlap);
        prop_assert!(shared < size);
    }
    Ok(())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn recursive_chunks_tile_the_document(text in arb_text(), (size, overlap) in arb_params()) {
        let document = Document::new("p.txt", text.clone());
        let chunks = RecursiveChunker::new(size, overlap).chunk(&document);
        check_invariants(&chunks, &text, size, overlap)?;
    }

    #[test]
    fn fixed_chunks_tile_the_document(text in arb_text(), (size, overlap) in arb_params()) {
        let document = Document::new("p.txt", text.clone());
        let chunks = FixedSizeChunker::new(size, overlap).chunk(&document);
        check_invariants(&chunks, &text, size, overlap)?;
        // Hard cuts never widen the overlap.
        for pair in chunks.windows(2) {
            let prev_end = start(&pair[0]) + pair[0].text.chars().count();
            prop_assert_eq!(prev_end - start(&pair[1]), overlap);
        }
    }

    #[test]
    fn chunking_is_deterministic(text in arb_text(), (size, overlap) in arb_params()) {
        let document = Document::new("p.txt", text);
        let chunker = RecursiveChunker::new(size, overlap);
        prop_assert_eq!(chunker.chunk(&document), chunker.chunk(&document));
    }
}

#[test]
fn default_settings_keep_short_documents_whole() {
    let document = Document::new("facts.txt", "Paris is the capital of France.");
    let chunks = RecursiveChunker::new(1000, 200).chunk(&document);
    assert_eq!(chunks.len(), 1);
    assert_eq!(chunks[0].text, document.text);
    assert_eq!(chunks[0].document_id, document.id);
}

#[test]
fn continuation_pages_keep_sentence_intact() {
    let page1 = Document::new("report.pdf", "The committee approved the budget for the new")
        .with_page(1);
    let page2 = Document::new("report.pdf", "research building in March.").with_page(2);

    let chunks = RecursiveChunker::new(1000, 200).chunk_documents(&[page1, page2]);
    assert_eq!(chunks.len(), 1);
    assert!(chunks[0]
        .text
        .contains("approved the budget for the new research building in March."));
    assert_eq!(chunks[0].metadata.get("page").map(String::as_str), Some("1"));
    assert_eq!(chunks[0].metadata.get("page_end").map(String::as_str), Some("2"));
}
