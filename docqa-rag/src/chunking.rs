//! Document chunking strategies.
//!
//! This module provides the [`Chunker`] trait and two implementations:
//!
//! - [`RecursiveChunker`]: splits at the latest paragraph, line, sentence, or
//!   word boundary that fits, falling back to a hard character cut
//! - [`FixedSizeChunker`]: splits by character count with configurable overlap
//!
//! Both work on character (not byte) offsets and produce chunks that tile the
//! document: every chunk is a contiguous span, consecutive spans overlap, and
//! the union of the spans is the whole text. Each chunk records its span start
//! under [`START_INDEX_KEY`], so the document can be rebuilt by dropping the
//! overlapping prefix of each chunk.

use crate::document::{
    CHUNK_INDEX_KEY, Chunk, Document, PAGE_END_KEY, START_INDEX_KEY, stable_id,
};

/// A strategy for splitting documents into chunks.
///
/// Implementations produce [`Chunk`]s with text and metadata but no embeddings.
/// Embeddings are attached later by the pipeline.
pub trait Chunker: Send + Sync {
    /// Split a document into chunks.
    ///
    /// Returns an empty `Vec` if the document has empty text.
    /// Each returned chunk has an empty embedding vector.
    fn chunk(&self, document: &Document) -> Vec<Chunk>;

    /// Split an ordered sequence of documents, merging PDF continuation
    /// pages first (see [`merge_page_continuations`]).
    fn chunk_documents(&self, documents: &[Document]) -> Vec<Chunk> {
        merge_page_continuations(documents).iter().flat_map(|d| self.chunk(d)).collect()
    }
}

/// Splits text into fixed-size chunks by character count with configurable overlap.
///
/// Chunk IDs are derived from the document id, the chunk offset, and the chunk
/// text. Each chunk inherits the parent document's metadata plus
/// `chunk_index` and `start_index` fields.
///
/// # Example
///
/// ```rust,ignore
/// use docqa_rag::FixedSizeChunker;
///
/// let chunker = FixedSizeChunker::new(256, 50);
/// let chunks = chunker.chunk(&document);
/// ```
#[derive(Debug, Clone)]
pub struct FixedSizeChunker {
    chunk_size: usize,
    chunk_overlap: usize,
}

impl FixedSizeChunker {
    /// Create a new `FixedSizeChunker`.
    ///
    /// # Arguments
    ///
    /// * `chunk_size`: maximum number of characters per chunk
    /// * `chunk_overlap`: number of overlapping characters between consecutive
    ///   chunks, clamped below `chunk_size`
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Self {
        let chunk_size = chunk_size.max(1);
        Self { chunk_size, chunk_overlap: chunk_overlap.min(chunk_size - 1) }
    }
}

impl Chunker for FixedSizeChunker {
    fn chunk(&self, document: &Document) -> Vec<Chunk> {
        let chars: Vec<char> = document.text.chars().collect();
        let mut spans = Vec::new();
        let mut start = 0;

        while start < chars.len() {
            let end = (start + self.chunk_size).min(chars.len());
            spans.push((start, end));
            if end == chars.len() {
                break;
            }
            start = end - self.chunk_overlap;
        }

        build_chunks(document, &chars, &spans)
    }
}

/// Splits text at natural boundaries: paragraphs → lines → sentences → words.
///
/// Each chunk ends at the latest paragraph break that keeps it within
/// `chunk_size`; failing that the latest line break, then sentence end, then
/// word boundary, then a hard cut at exactly `chunk_size` characters. The next
/// chunk starts `chunk_overlap` characters before the previous end, moved back
/// to the start of a word when one lies within another `chunk_overlap`
/// characters, so the shared context is at least `chunk_overlap` and never
/// begins mid-word unless the text has no spaces there.
///
/// # Example
///
/// ```rust,ignore
/// use docqa_rag::RecursiveChunker;
///
/// let chunker = RecursiveChunker::new(1000, 200);
/// let chunks = chunker.chunk(&document);
/// ```
#[derive(Debug, Clone)]
pub struct RecursiveChunker {
    chunk_size: usize,
    chunk_overlap: usize,
}

impl RecursiveChunker {
    /// Create a new `RecursiveChunker`.
    ///
    /// # Arguments
    ///
    /// * `chunk_size`: maximum number of characters per chunk
    /// * `chunk_overlap`: minimum number of overlapping characters between
    ///   consecutive chunks, clamped below `chunk_size`
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Self {
        let chunk_size = chunk_size.max(1);
        Self { chunk_size, chunk_overlap: chunk_overlap.min(chunk_size - 1) }
    }
}

impl Chunker for RecursiveChunker {
    fn chunk(&self, document: &Document) -> Vec<Chunk> {
        let chars: Vec<char> = document.text.chars().collect();
        let spans = boundary_spans(&chars, self.chunk_size, self.chunk_overlap);
        build_chunks(document, &chars, &spans)
    }
}

/// Boundary kinds in order of preference.
#[derive(Debug, Clone, Copy)]
enum Boundary {
    Paragraph,
    Line,
    Sentence,
    Word,
}

impl Boundary {
    const ORDER: [Boundary; 4] =
        [Boundary::Paragraph, Boundary::Line, Boundary::Sentence, Boundary::Word];

    /// Whether a chunk may end right before `chars[pos]`.
    fn ends_at(self, chars: &[char], pos: usize) -> bool {
        if pos == 0 {
            return false;
        }
        let last = chars[pos - 1];
        match self {
            Boundary::Paragraph => pos >= 2 && last == '\n' && chars[pos - 2] == '\n',
            Boundary::Line => last == '\n',
            Boundary::Sentence => {
                pos >= 2 && last.is_whitespace() && matches!(chars[pos - 2], '.' | '!' | '?')
            }
            Boundary::Word => last.is_whitespace(),
        }
    }
}

/// Compute `(start, end)` character spans for [`RecursiveChunker`].
///
/// Invariants: spans are non-empty, at most `size` long, cover the text in
/// order, each end is strictly greater than the previous end, and
/// consecutive spans overlap by at least `overlap` (and less than `size`).
fn boundary_spans(chars: &[char], size: usize, overlap: usize) -> Vec<(usize, usize)> {
    let len = chars.len();
    let mut spans = Vec::new();
    let mut start = 0;
    let mut prev_end = 0;

    while start < len {
        if len - start <= size {
            spans.push((start, len));
            break;
        }

        // A split point must leave room for the overlap and move past the
        // previous chunk's end.
        let lo = (start + overlap).max(prev_end);
        let hi = start + size;
        let end = find_split(chars, lo, hi).unwrap_or(hi);
        spans.push((start, end));

        start = next_start(chars, start, end, size, overlap);
        prev_end = end;
    }

    spans
}

/// Latest boundary position in `(lo, hi]`, trying each boundary kind in order.
fn find_split(chars: &[char], lo: usize, hi: usize) -> Option<usize> {
    Boundary::ORDER
        .iter()
        .find_map(|boundary| (lo + 1..=hi).rev().find(|&pos| boundary.ends_at(chars, pos)))
}

fn next_start(chars: &[char], start: usize, end: usize, size: usize, overlap: usize) -> usize {
    if overlap == 0 {
        return end;
    }
    let target = end - overlap;
    let floor = (start + 1).max(target.saturating_sub(overlap)).max((end + 1).saturating_sub(size));
    (floor..=target).rev().find(|&pos| is_word_start(chars, pos)).unwrap_or(target)
}

fn is_word_start(chars: &[char], pos: usize) -> bool {
    !chars[pos].is_whitespace() && (pos == 0 || chars[pos - 1].is_whitespace())
}

fn build_chunks(document: &Document, chars: &[char], spans: &[(usize, usize)]) -> Vec<Chunk> {
    spans
        .iter()
        .enumerate()
        .map(|(i, &(start, end))| {
            let text: String = chars[start..end].iter().collect();
            let mut metadata = document.metadata.clone();
            metadata.insert(CHUNK_INDEX_KEY.to_string(), i.to_string());
            metadata.insert(START_INDEX_KEY.to_string(), start.to_string());
            Chunk {
                id: stable_id(&format!("{}:{start}:{text}", document.id)),
                text,
                embedding: Vec::new(),
                metadata,
                document_id: document.id.clone(),
            }
        })
        .collect()
}

/// Merge consecutive pages of the same source when a page ends mid-sentence.
///
/// Two documents are merged when they share a `source`, the second one's
/// `page` directly follows the first one's last page, and the first one's
/// text does not end with sentence-terminal punctuation. The merged document
/// keeps the first page's id and metadata and records the last page under
/// `page_end`. Documents without page numbers pass through unchanged.
pub fn merge_page_continuations(documents: &[Document]) -> Vec<Document> {
    let mut merged: Vec<Document> = Vec::with_capacity(documents.len());

    for document in documents {
        if let Some(previous) = merged.last_mut() {
            if continues_on(previous, document) {
                let text = format!("{} {}", previous.text.trim_end(), document.text.trim_start());
                previous.text = text;
                if let Some(page) = document.page() {
                    previous.metadata.insert(PAGE_END_KEY.to_string(), page.to_string());
                }
                continue;
            }
        }
        merged.push(document.clone());
    }

    merged
}

fn continues_on(previous: &Document, next: &Document) -> bool {
    if previous.source() != next.source() {
        return false;
    }
    let last_page = previous
        .metadata
        .get(PAGE_END_KEY)
        .and_then(|p| p.parse::<u32>().ok())
        .or_else(|| previous.page());
    match (last_page, next.page()) {
        (Some(last), Some(page)) if page == last + 1 => !ends_sentence(&previous.text),
        _ => false,
    }
}

fn ends_sentence(text: &str) -> bool {
    match text.trim_end().chars().last() {
        None => true,
        Some(c) => matches!(
            c,
            '.' | '!' | '?' | ':' | ';' | '"' | '\'' | ')' | '\u{201D}' | '\u{2019}'
        ),
    }
}
