//! Document chunking.
//!
//! Text is split into overlapping fixed-size windows measured in characters
//! (Unicode scalar values), so a window never cuts through a multi-byte code
//! point. Adjacent windows share exactly `overlap` characters, which keeps a
//! sentence that straddles a boundary intact in at least one chunk.

use std::collections::HashMap;

use crate::document::{Chunk, PageText};
use crate::error::{RagError, Result};

/// A strategy for splitting extracted pages into [`Chunk`]s.
///
/// Implementations assign each chunk its position within its source so that
/// retrieval can restore reading order later.
pub trait Chunker: Send + Sync {
    /// Split pages into chunks.
    ///
    /// Pages with empty text contribute no chunks and are not an error.
    fn chunk_pages(&self, pages: &[PageText]) -> Vec<Chunk>;
}

/// Split `text` into windows of `chunk_size` characters, advancing by
/// `chunk_size - overlap` each step.
///
/// - Empty text yields no chunks.
/// - Text no longer than `chunk_size` yields exactly one chunk.
/// - The final window is clipped at the end of the text, and splitting stops
///   once a window reaches the end, so no trailing chunk is a strict suffix
///   of its predecessor.
///
/// # Errors
///
/// Returns [`RagError::ConfigurationError`] if `chunk_size == 0` or
/// `overlap >= chunk_size`.
///
/// # Example
///
/// ```rust
/// use docqa_rag::chunking::chunk_text;
///
/// let chunks = chunk_text("abcdefghij", 4, 1).unwrap();
/// assert_eq!(chunks, vec!["abcd", "defg", "ghij"]);
/// ```
pub fn chunk_text(text: &str, chunk_size: usize, overlap: usize) -> Result<Vec<String>> {
    validate_window(chunk_size, overlap)?;

    // Byte offset of every char boundary, including the end of the text.
    let offsets: Vec<usize> =
        text.char_indices().map(|(i, _)| i).chain(std::iter::once(text.len())).collect();
    let char_count = offsets.len() - 1;
    let step = chunk_size - overlap;

    let mut chunks = Vec::new();
    let mut start = 0;
    while start < char_count {
        let end = (start + chunk_size).min(char_count);
        chunks.push(text[offsets[start]..offsets[end]].to_string());
        if end == char_count {
            break;
        }
        start += step;
    }

    Ok(chunks)
}

fn validate_window(chunk_size: usize, overlap: usize) -> Result<()> {
    if chunk_size == 0 {
        return Err(RagError::ConfigurationError("chunk_size must be greater than zero".into()));
    }
    if overlap >= chunk_size {
        return Err(RagError::ConfigurationError(format!(
            "chunk_overlap ({overlap}) must be less than chunk_size ({chunk_size})"
        )));
    }
    Ok(())
}

/// Splits pages into fixed-size, overlapping character windows.
///
/// The `sequence` counter runs per source across all of its pages, so
/// `(source_id, page, sequence)` reproduces reading order.
///
/// # Example
///
/// ```rust
/// use docqa_rag::{Chunker, FixedSizeChunker, PageText};
///
/// let chunker = FixedSizeChunker::new(1000, 300).unwrap();
/// let chunks = chunker.chunk_pages(&[PageText::new("notes.txt", Some(1), "short page")]);
/// assert_eq!(chunks.len(), 1);
/// assert_eq!(chunks[0].sequence, 0);
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
    /// * `chunk_overlap`: number of characters shared by consecutive chunks
    ///
    /// # Errors
    ///
    /// Returns [`RagError::ConfigurationError`] if `chunk_overlap >= chunk_size`
    /// or `chunk_size == 0`.
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Result<Self> {
        validate_window(chunk_size, chunk_overlap)?;
        Ok(Self { chunk_size, chunk_overlap })
    }

    /// Maximum number of characters per chunk.
    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Number of characters shared by consecutive chunks.
    pub fn chunk_overlap(&self) -> usize {
        self.chunk_overlap
    }

    fn split(&self, text: &str) -> Vec<String> {
        // Parameters were validated in `new`.
        chunk_text(text, self.chunk_size, self.chunk_overlap).unwrap_or_default()
    }
}

impl Chunker for FixedSizeChunker {
    fn chunk_pages(&self, pages: &[PageText]) -> Vec<Chunk> {
        let mut next_sequence: HashMap<&str, usize> = HashMap::new();
        let mut chunks = Vec::new();

        for page in pages {
            let sequence = next_sequence.entry(page.source_id.as_str()).or_insert(0);
            for text in self.split(&page.text) {
                chunks.push(Chunk::new(text, page.source_id.clone(), page.page, *sequence));
                *sequence += 1;
            }
        }

        chunks
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_text_yields_no_chunks() {
        assert!(chunk_text("", 500, 100).unwrap().is_empty());
    }

    #[test]
    fn short_text_yields_single_chunk() {
        assert_eq!(chunk_text("abc", 500, 100).unwrap(), vec!["abc"]);
    }

    #[test]
    fn rejects_overlap_not_smaller_than_size() {
        assert!(matches!(chunk_text("abc", 10, 10), Err(RagError::ConfigurationError(_))));
        assert!(matches!(chunk_text("abc", 10, 11), Err(RagError::ConfigurationError(_))));
        assert!(matches!(FixedSizeChunker::new(0, 0), Err(RagError::ConfigurationError(_))));
    }

    #[test]
    fn zero_overlap_partitions_text() {
        let chunks = chunk_text("abcdefgh", 3, 0).unwrap();
        assert_eq!(chunks, vec!["abc", "def", "gh"]);
    }

    #[test]
    fn windows_never_split_multibyte_chars() {
        let text = "héllo wörld ñ";
        let chunks = chunk_text(text, 4, 1).unwrap();
        assert!(chunks.iter().all(|c| c.chars().count() <= 4));
        assert_eq!(chunks.first().map(String::as_str), Some("héll"));
        assert!(text.ends_with(chunks.last().unwrap().as_str()));
    }

    #[test]
    fn sequence_runs_per_source_across_pages() {
        let chunker = FixedSizeChunker::new(4, 0).unwrap();
        let pages = vec![
            PageText::new("a.txt", Some(1), "aaaabbbb"),
            PageText::new("b.txt", Some(1), "cccc"),
            PageText::new("a.txt", Some(2), ""),
            PageText::new("a.txt", Some(3), "dddd"),
        ];

        let chunks = chunker.chunk_pages(&pages);
        let ids: Vec<_> =
            chunks.iter().map(|c| (c.source_id.as_str(), c.page, c.sequence)).collect();
        assert_eq!(
            ids,
            vec![
                ("a.txt", Some(1), 0),
                ("a.txt", Some(1), 1),
                ("b.txt", Some(1), 0),
                ("a.txt", Some(3), 2),
            ]
        );
    }
}
