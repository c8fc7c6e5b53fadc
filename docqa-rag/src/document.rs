//! Data types for extracted pages, chunks, and retrieval results.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One unit of extracted text from a source document.
///
/// Produced by a [`TextExtractor`](crate::extract::TextExtractor) and consumed
/// by the [`FixedSizeChunker`](crate::chunking::FixedSizeChunker).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PageText {
    /// Identifier of the source document (its path relative to the ingestion root).
    pub source_id: String,
    /// 1-based page number, if the source is paginated.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
    /// The raw extracted text of the page.
    pub text: String,
}

impl PageText {
    /// Create a new page of extracted text.
    pub fn new(source_id: impl Into<String>, page: Option<u32>, text: impl Into<String>) -> Self {
        Self { source_id: source_id.into(), page, text: text.into() }
    }
}

/// A bounded, contiguous slice of a source document's text.
///
/// Chunks are immutable once created. `sequence` is the chunk's position
/// within its source and is used to restore reading order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Chunk {
    /// The text content of the chunk.
    pub text: String,
    /// Identifier of the source document.
    pub source_id: String,
    /// 1-based page number within the source, if known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
    /// Position of the chunk within its source.
    pub sequence: usize,
}

impl Chunk {
    /// Create a new chunk.
    pub fn new(
        text: impl Into<String>,
        source_id: impl Into<String>,
        page: Option<u32>,
        sequence: usize,
    ) -> Self {
        Self { text: text.into(), source_id: source_id.into(), page, sequence }
    }

    /// Compare two chunks by `(source_id, page, sequence)`, i.e. reading order.
    ///
    /// Chunks without a page number sort before paginated chunks of the same source.
    pub fn reading_order(&self, other: &Self) -> Ordering {
        self.source_id
            .cmp(&other.source_id)
            .then_with(|| self.page.cmp(&other.page))
            .then_with(|| self.sequence.cmp(&other.sequence))
    }
}

/// A [`Chunk`] together with its embedding vector.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EmbeddedChunk {
    /// The embedded chunk.
    pub chunk: Chunk,
    /// The embedding vector for the chunk text.
    pub vector: Vec<f32>,
}

impl EmbeddedChunk {
    /// Pair a chunk with its vector.
    pub fn new(chunk: Chunk, vector: Vec<f32>) -> Self {
        Self { chunk, vector }
    }
}

/// A retrieved [`Chunk`] paired with its cosine similarity to the query.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScoredChunk {
    /// The retrieved chunk.
    pub chunk: Chunk,
    /// The similarity score (higher is more relevant).
    pub score: f32,
}

/// The ordered chunks returned by the [`Retriever`](crate::retriever::Retriever)
/// for one query.
///
/// Ordered either by descending score or, after flow restoration, by
/// [`Chunk::reading_order`].
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct RetrievalResult {
    hits: Vec<ScoredChunk>,
}

impl RetrievalResult {
    /// Wrap a list of hits, keeping their order.
    pub fn new(hits: Vec<ScoredChunk>) -> Self {
        Self { hits }
    }

    /// The hits in retrieval order.
    pub fn hits(&self) -> &[ScoredChunk] {
        &self.hits
    }

    /// Iterate over the retrieved chunks in order.
    pub fn chunks(&self) -> impl Iterator<Item = &Chunk> {
        self.hits.iter().map(|hit| &hit.chunk)
    }

    /// Number of retrieved chunks.
    pub fn len(&self) -> usize {
        self.hits.len()
    }

    /// Whether nothing was retrieved.
    pub fn is_empty(&self) -> bool {
        self.hits.is_empty()
    }

    /// Reorder the hits by `(source_id, page, sequence)`.
    pub fn restore_document_order(&mut self) {
        self.hits.sort_by(|a, b| a.chunk.reading_order(&b.chunk));
    }

    /// Consume the result, returning the hits.
    pub fn into_hits(self) -> Vec<ScoredChunk> {
        self.hits
    }
}

impl From<Vec<ScoredChunk>> for RetrievalResult {
    fn from(hits: Vec<ScoredChunk>) -> Self {
        Self::new(hits)
    }
}

/// The detailed outcome of one question, returned by
/// [`DocumentQa::ask_detailed`](crate::service::DocumentQa::ask_detailed).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Answer {
    /// Identifier attached to the `docqa.ask` tracing span for this question.
    pub query_id: Uuid,
    /// The composed answer, or the not-found sentinel.
    pub text: String,
    /// The question after normalization.
    pub normalized_query: String,
    /// The chunks the answer was grounded on, in context order.
    pub sources: Vec<Chunk>,
    /// `false` when the context was empty and no model call was made.
    pub grounded: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hit(source: &str, page: Option<u32>, sequence: usize, score: f32) -> ScoredChunk {
        ScoredChunk { chunk: Chunk::new("t", source, page, sequence), score }
    }

    #[test]
    fn restores_reading_order_by_source_page_and_sequence() {
        let mut result = RetrievalResult::new(vec![
            hit("b.txt", Some(1), 0, 0.9),
            hit("a.txt", Some(2), 3, 0.8),
            hit("a.txt", Some(1), 1, 0.7),
            hit("a.txt", Some(1), 0, 0.6),
        ]);
        result.restore_document_order();

        let order: Vec<_> =
            result.chunks().map(|c| (c.source_id.as_str(), c.page, c.sequence)).collect();
        assert_eq!(
            order,
            vec![("a.txt", Some(1), 0), ("a.txt", Some(1), 1), ("a.txt", Some(2), 3), ("b.txt", Some(1), 0)]
        );
    }

    #[test]
    fn unpaged_chunks_sort_before_paged_ones() {
        let unpaged = Chunk::new("x", "doc", None, 5);
        let paged = Chunk::new("y", "doc", Some(1), 0);
        assert_eq!(unpaged.reading_order(&paged), Ordering::Less);
    }
}
