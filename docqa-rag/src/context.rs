//! Assembly of retrieved chunks into the grounding context.

use std::fmt;

use crate::document::RetrievalResult;

/// Separator placed between chunk texts.
pub const CHUNK_SEPARATOR: &str = "\n\n";

/// The text the answer composer is allowed to draw facts from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Context {
    /// Nothing was retrieved, or everything retrieved was whitespace.
    Empty,
    /// Non-blank concatenated chunk texts.
    Text(String),
}

impl Context {
    /// Whether this is the empty marker.
    pub fn is_empty(&self) -> bool {
        matches!(self, Context::Empty)
    }

    /// The context text, or `None` for [`Context::Empty`].
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Context::Empty => None,
            Context::Text(text) => Some(text),
        }
    }
}

impl fmt::Display for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Context::Empty => f.write_str("<empty context>"),
            Context::Text(text) => f.write_str(text),
        }
    }
}

/// Join chunk texts with a blank line, in retrieval order.
///
/// Returns [`Context::Empty`] when `results` is empty or the joined text is
/// blank after trimming.
///
/// # Example
///
/// ```rust
/// use docqa_rag::{Chunk, Context, RetrievalResult, ScoredChunk, assemble};
///
/// let results = RetrievalResult::new(vec![
///     ScoredChunk { chunk: Chunk::new("first", "a.txt", Some(1), 0), score: 0.9 },
///     ScoredChunk { chunk: Chunk::new("second", "a.txt", Some(1), 1), score: 0.8 },
/// ]);
/// assert_eq!(assemble(&results), Context::Text("first\n\nsecond".into()));
/// assert_eq!(assemble(&RetrievalResult::default()), Context::Empty);
/// ```
pub fn assemble(results: &RetrievalResult) -> Context {
    if results.is_empty() {
        return Context::Empty;
    }

    let joined = results.chunks().map(|c| c.text.as_str()).collect::<Vec<_>>().join(CHUNK_SEPARATOR);
    if joined.trim().is_empty() { Context::Empty } else { Context::Text(joined) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{Chunk, ScoredChunk};

    fn results(texts: &[&str]) -> RetrievalResult {
        texts
            .iter()
            .enumerate()
            .map(|(i, t)| ScoredChunk { chunk: Chunk::new(*t, "doc", None, i), score: 1.0 })
            .collect::<Vec<_>>()
            .into()
    }

    #[test]
    fn empty_and_blank_results_are_empty_context() {
        assert_eq!(assemble(&results(&[])), Context::Empty);
        assert_eq!(assemble(&results(&["   "])), Context::Empty);
        assert_eq!(assemble(&results(&[" ", "\n\t"])), Context::Empty);
    }

    #[test]
    fn keeps_chunk_text_verbatim() {
        let context = assemble(&results(&["  padded  ", "next"]));
        assert_eq!(context.as_text(), Some("  padded  \n\nnext"));
        assert!(!context.is_empty());
    }
}
