//! Query-time retrieval: embed the question, search the index, reorder.

use std::sync::Arc;

use tracing::{debug, error};

use crate::config::{RagConfig, SearchStrategy};
use crate::document::RetrievalResult;
use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, Result};
use crate::index::VectorIndex;

/// Retrieval settings.
///
/// The default retrieves 20 chunks by plain similarity and then restores
/// reading order, which hands the composer passages in the order they appear
/// in the source rather than by score.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetrievalOptions {
    /// Number of chunks to retrieve.
    pub top_k: usize,
    /// Similarity or diversity-aware search.
    pub strategy: SearchStrategy,
    /// Reorder results by `(source_id, page, sequence)`.
    pub restore_document_order: bool,
}

impl Default for RetrievalOptions {
    fn default() -> Self {
        RetrievalOptions::from(&RagConfig::default())
    }
}

impl From<&RagConfig> for RetrievalOptions {
    fn from(config: &RagConfig) -> Self {
        Self {
            top_k: config.top_k,
            strategy: config.search_strategy,
            restore_document_order: config.restore_document_order,
        }
    }
}

/// Fetches the chunks most relevant to a normalized query.
///
/// Holds the index behind an `Arc`; any number of retrievers and concurrent
/// queries can share one index without locking.
pub struct Retriever {
    embedding_provider: Arc<dyn EmbeddingProvider>,
    index: Arc<VectorIndex>,
    options: RetrievalOptions,
}

impl Retriever {
    /// Create a retriever over `index`, embedding queries with `embedding_provider`.
    pub fn new(
        embedding_provider: Arc<dyn EmbeddingProvider>,
        index: Arc<VectorIndex>,
        options: RetrievalOptions,
    ) -> Self {
        Self { embedding_provider, index, options }
    }

    /// The index being searched.
    pub fn index(&self) -> &Arc<VectorIndex> {
        &self.index
    }

    /// The retrieval settings.
    pub fn options(&self) -> &RetrievalOptions {
        &self.options
    }

    /// Retrieve up to `top_k` chunks for `normalized_query`.
    ///
    /// No similarity cutoff is applied.
    ///
    /// # Errors
    ///
    /// - [`RagError::EmbeddingServiceError`] if embedding the query fails.
    /// - [`RagError::EmptyIndexError`] if the index holds no chunks.
    /// - [`RagError::ConfigurationError`] for invalid `top_k`/`fetch_k`/`lambda`.
    pub async fn retrieve(&self, normalized_query: &str) -> Result<RetrievalResult> {
        let query_vector = self.embedding_provider.embed_query(normalized_query).await.map_err(|e| {
            error!(error = %e, "embedding failed during retrieval");
            match e {
                RagError::EmbeddingServiceError { .. } => e,
                other => RagError::EmbeddingServiceError {
                    provider: self.embedding_provider.model_name().to_string(),
                    message: other.to_string(),
                },
            }
        })?;

        let RetrievalOptions { top_k, strategy, restore_document_order } = self.options;
        let hits = match strategy {
            SearchStrategy::Similarity => self.index.similarity_search(&query_vector, top_k)?,
            SearchStrategy::Diverse { fetch_k, lambda } => {
                self.index.diverse_search(&query_vector, top_k, fetch_k, lambda)?
            }
        };

        let mut result = RetrievalResult::new(hits);
        if restore_document_order {
            result.restore_document_order();
        }

        debug!(
            top_k,
            returned = result.len(),
            restore_document_order,
            "retrieved chunks"
        );
        Ok(result)
    }
}
