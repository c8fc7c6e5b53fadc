//! Configuration for ingestion and retrieval.

use serde::{Deserialize, Serialize};

use crate::error::{RagError, Result};

/// How the [`Retriever`](crate::retriever::Retriever) searches the index.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SearchStrategy {
    /// Plain top-k cosine similarity.
    #[default]
    Similarity,
    /// Maximal marginal relevance over the `fetch_k` nearest candidates.
    Diverse {
        /// Number of nearest candidates to consider, `>= top_k`.
        fetch_k: usize,
        /// Weight of query relevance versus diversity, in `[0, 1]`.
        lambda: f32,
    },
}

/// What the [`QueryNormalizer`](crate::normalizer::QueryNormalizer) does when
/// its language-model call fails.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum NormalizationFailurePolicy {
    /// Log a warning and continue with the raw query.
    #[default]
    FallbackToRaw,
    /// Fail the question with [`RagError::NormalizationError`].
    Propagate,
}

/// Configuration parameters for the RAG pipeline.
///
/// Defaults: 1000-character chunks with a 300-character overlap, 20
/// retrieved chunks, plain similarity search with reading-order restoration,
/// and query normalization that falls back to the raw query on failure.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RagConfig {
    /// Maximum chunk size in characters.
    pub chunk_size: usize,
    /// Number of overlapping characters between consecutive chunks.
    pub chunk_overlap: usize,
    /// Number of chunks to retrieve per question.
    pub top_k: usize,
    /// Similarity or diversity-aware search.
    pub search_strategy: SearchStrategy,
    /// Reorder retrieved chunks by `(source_id, page, sequence)`.
    pub restore_document_order: bool,
    /// Run the spelling/casing normalization pass before retrieval.
    pub normalize_queries: bool,
    /// Behaviour when normalization fails.
    pub normalization_failure: NormalizationFailurePolicy,
    /// Number of chunk texts per embedding request during ingestion.
    pub embedding_batch_size: usize,
    /// Maximum number of embedding requests in flight during ingestion.
    pub max_concurrent_batches: usize,
}

impl Default for RagConfig {
    fn default() -> Self {
        Self {
            chunk_size: 1000,
            chunk_overlap: 300,
            top_k: 20,
            search_strategy: SearchStrategy::Similarity,
            restore_document_order: true,
            normalize_queries: true,
            normalization_failure: NormalizationFailurePolicy::FallbackToRaw,
            embedding_batch_size: 64,
            max_concurrent_batches: 4,
        }
    }
}

impl RagConfig {
    /// Create a new builder for constructing a [`RagConfig`].
    pub fn builder() -> RagConfigBuilder {
        RagConfigBuilder::default()
    }

    /// Check that the parameters are consistent.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::ConfigurationError`] if:
    /// - `chunk_size == 0` or `chunk_overlap >= chunk_size`
    /// - `top_k == 0`
    /// - the diverse strategy has `fetch_k < top_k` or `lambda` outside `[0, 1]`
    /// - `embedding_batch_size == 0` or `max_concurrent_batches == 0`
    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 {
            return Err(RagError::ConfigurationError(
                "chunk_size must be greater than zero".to_string(),
            ));
        }
        if self.chunk_overlap >= self.chunk_size {
            return Err(RagError::ConfigurationError(format!(
                "chunk_overlap ({}) must be less than chunk_size ({})",
                self.chunk_overlap, self.chunk_size
            )));
        }
        if self.top_k == 0 {
            return Err(RagError::ConfigurationError("top_k must be greater than zero".to_string()));
        }
        if let SearchStrategy::Diverse { fetch_k, lambda } = self.search_strategy {
            validate_diverse(self.top_k, fetch_k, lambda)?;
        }
        if self.embedding_batch_size == 0 {
            return Err(RagError::ConfigurationError(
                "embedding_batch_size must be greater than zero".to_string(),
            ));
        }
        if self.max_concurrent_batches == 0 {
            return Err(RagError::ConfigurationError(
                "max_concurrent_batches must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// Validate diverse-search parameters.
pub(crate) fn validate_diverse(k: usize, fetch_k: usize, lambda: f32) -> Result<()> {
    if fetch_k < k {
        return Err(RagError::ConfigurationError(format!(
            "fetch_k ({fetch_k}) must be at least k ({k})"
        )));
    }
    if !(0.0..=1.0).contains(&lambda) {
        return Err(RagError::ConfigurationError(format!(
            "lambda ({lambda}) must be within [0, 1]"
        )));
    }
    Ok(())
}

/// Builder for constructing a validated [`RagConfig`].
#[derive(Debug, Clone, Default)]
pub struct RagConfigBuilder {
    config: RagConfig,
}

impl RagConfigBuilder {
    /// Set the maximum chunk size in characters.
    pub fn chunk_size(mut self, size: usize) -> Self {
        self.config.chunk_size = size;
        self
    }

    /// Set the overlap between consecutive chunks in characters.
    pub fn chunk_overlap(mut self, overlap: usize) -> Self {
        self.config.chunk_overlap = overlap;
        self
    }

    /// Set the number of chunks retrieved per question.
    pub fn top_k(mut self, k: usize) -> Self {
        self.config.top_k = k;
        self
    }

    /// Set the search strategy.
    pub fn search_strategy(mut self, strategy: SearchStrategy) -> Self {
        self.config.search_strategy = strategy;
        self
    }

    /// Enable or disable reading-order restoration of retrieved chunks.
    pub fn restore_document_order(mut self, restore: bool) -> Self {
        self.config.restore_document_order = restore;
        self
    }

    /// Enable or disable the query normalization pass.
    pub fn normalize_queries(mut self, normalize: bool) -> Self {
        self.config.normalize_queries = normalize;
        self
    }

    /// Set the behaviour when normalization fails.
    pub fn normalization_failure(mut self, policy: NormalizationFailurePolicy) -> Self {
        self.config.normalization_failure = policy;
        self
    }

    /// Set the number of texts per embedding request during ingestion.
    pub fn embedding_batch_size(mut self, size: usize) -> Self {
        self.config.embedding_batch_size = size;
        self
    }

    /// Set the maximum number of concurrent embedding requests during ingestion.
    pub fn max_concurrent_batches(mut self, limit: usize) -> Self {
        self.config.max_concurrent_batches = limit;
        self
    }

    /// Build the [`RagConfig`], validating that parameters are consistent.
    ///
    /// # Errors
    ///
    /// See [`RagConfig::validate`].
    pub fn build(self) -> Result<RagConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = RagConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.chunk_size, 1000);
        assert_eq!(config.chunk_overlap, 300);
        assert_eq!(config.top_k, 20);
        assert!(config.restore_document_order);
    }

    #[test]
    fn rejects_inconsistent_parameters() {
        assert!(RagConfig::builder().chunk_size(100).chunk_overlap(100).build().is_err());
        assert!(RagConfig::builder().top_k(0).build().is_err());
        assert!(RagConfig::builder().embedding_batch_size(0).build().is_err());
        assert!(
            RagConfig::builder()
                .top_k(10)
                .search_strategy(SearchStrategy::Diverse { fetch_k: 5, lambda: 0.5 })
                .build()
                .is_err()
        );
        assert!(
            RagConfig::builder()
                .top_k(4)
                .search_strategy(SearchStrategy::Diverse { fetch_k: 20, lambda: 1.5 })
                .build()
                .is_err()
        );
    }

    #[test]
    fn deserializes_partial_json_with_defaults() {
        let config: RagConfig = serde_json::from_str(
            r#"{"top_k": 5, "search_strategy": {"kind": "diverse", "fetch_k": 20, "lambda": 0.5}}"#,
        )
        .unwrap();
        assert_eq!(config.top_k, 5);
        assert_eq!(config.chunk_size, 1000);
        assert_eq!(config.search_strategy, SearchStrategy::Diverse { fetch_k: 20, lambda: 0.5 });
        assert!(config.validate().is_ok());
    }
}
