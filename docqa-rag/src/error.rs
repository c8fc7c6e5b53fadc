//! Error types for the `docqa-rag` crate.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while ingesting documents or answering questions.
///
/// Provider failures ([`EmbeddingServiceError`](RagError::EmbeddingServiceError),
/// [`NormalizationError`](RagError::NormalizationError),
/// [`CompositionError`](RagError::CompositionError)) are never retried inside
/// the crate and never converted into an answer string.
#[derive(Debug, Error)]
pub enum RagError {
    /// Invalid chunking, retrieval, or builder parameters.
    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    /// The embedding provider failed or timed out.
    #[error("Embedding service error ({provider}): {message}")]
    EmbeddingServiceError {
        /// The embedding provider that produced the error.
        provider: String,
        /// A description of the failure.
        message: String,
    },

    /// A raw language-model call failed.
    #[error("Language model error ({provider}): {message}")]
    LanguageModelError {
        /// The language-model provider that produced the error.
        provider: String,
        /// A description of the failure.
        message: String,
    },

    /// Query normalization failed and the policy is to propagate.
    #[error("Normalization error: {0}")]
    NormalizationError(String),

    /// The answer composition call failed.
    #[error("Composition error: {0}")]
    CompositionError(String),

    /// Ingestion produced no chunks at all.
    #[error("Empty corpus: ingestion produced no chunks")]
    EmptyCorpusError,

    /// A search was issued against an index holding zero chunks.
    #[error("Empty index: the vector index holds no chunks")]
    EmptyIndexError,

    /// The persisted index is missing or incompatible.
    #[error("Failed to load index from {}: {message}", path.display())]
    IndexLoadError {
        /// The location the index was loaded from.
        path: PathBuf,
        /// A description of the failure.
        message: String,
    },

    /// The index could not be written to durable storage.
    #[error("Failed to persist index to {}: {message}", path.display())]
    IndexPersistError {
        /// The location the index was written to.
        path: PathBuf,
        /// A description of the failure.
        message: String,
    },

    /// A vector does not have the dimension the index was built with.
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// The dimension of the index.
        expected: usize,
        /// The dimension that was supplied.
        actual: usize,
    },

    /// A source document could not be discovered or read.
    #[error("Source error ({}): {message}", path.display())]
    SourceError {
        /// The offending file or directory.
        path: PathBuf,
        /// A description of the failure.
        message: String,
    },
}

impl RagError {
    /// Returns `true` for failures of an external provider (embedding or
    /// language model), as opposed to caller bugs or missing data.
    pub fn is_provider_failure(&self) -> bool {
        matches!(
            self,
            RagError::EmbeddingServiceError { .. }
                | RagError::LanguageModelError { .. }
                | RagError::NormalizationError(_)
                | RagError::CompositionError(_)
        )
    }
}

/// A convenience result type for RAG operations.
pub type Result<T> = std::result::Result<T, RagError>;
