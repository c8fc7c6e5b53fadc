//! Offline ingestion: extract → chunk → embed → build index.
//!
//! The [`IngestionPipeline`] turns a corpus into a fresh [`VectorIndex`].
//! Every run is a full rebuild; there is no incremental upsert.
//!
//! # Example
//!
//! ```rust,ignore
//! use docqa_rag::{IngestionPipeline, PlainTextExtractor, RagConfig};
//!
//! let pipeline = IngestionPipeline::builder()
//!     .config(RagConfig::default())
//!     .embedding_provider(Arc::new(my_embedder))
//!     .build()?;
//!
//! let index = pipeline.ingest_directory("data", &PlainTextExtractor, &["txt"]).await?;
//! index.persist("index")?;
//! ```

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use futures::{StreamExt, TryStreamExt, stream};
use tracing::{debug, error, info};

use crate::chunking::{Chunker, FixedSizeChunker};
use crate::config::RagConfig;
use crate::document::{Chunk, EmbeddedChunk, PageText};
use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, Result};
use crate::extract::{TextExtractor, discover_documents, source_id};
use crate::index::VectorIndex;

/// The ingestion orchestrator.
///
/// Chunks pages, embeds the chunks in batches with bounded concurrency, and
/// builds the index. A failure in any batch aborts the whole run; no
/// document is silently dropped. Construct one via
/// [`IngestionPipeline::builder()`].
pub struct IngestionPipeline {
    chunker: Arc<dyn Chunker>,
    embedding_provider: Arc<dyn EmbeddingProvider>,
    embedding_batch_size: usize,
    max_concurrent_batches: usize,
    chunking: Option<(usize, usize)>,
}

impl IngestionPipeline {
    /// Create a new [`IngestionPipelineBuilder`].
    pub fn builder() -> IngestionPipelineBuilder {
        IngestionPipelineBuilder::default()
    }

    /// Return a reference to the embedding provider.
    pub fn embedding_provider(&self) -> &Arc<dyn EmbeddingProvider> {
        &self.embedding_provider
    }

    /// Chunk, embed, and index the given pages.
    ///
    /// # Errors
    ///
    /// - [`RagError::EmptyCorpusError`] if the pages produce no chunks.
    /// - [`RagError::EmbeddingServiceError`] if any embedding batch fails or
    ///   returns the wrong number of vectors.
    /// - [`RagError::DimensionMismatch`] if the provider returns vectors of
    ///   inconsistent dimension.
    pub async fn ingest_pages(&self, pages: &[PageText]) -> Result<VectorIndex> {
        let chunks = self.chunker.chunk_pages(pages);
        if chunks.is_empty() {
            error!(pages = pages.len(), "ingestion produced no chunks");
            return Err(RagError::EmptyCorpusError);
        }

        let source_count = {
            let mut per_source: BTreeMap<&str, usize> = BTreeMap::new();
            for chunk in &chunks {
                *per_source.entry(chunk.source_id.as_str()).or_default() += 1;
            }
            for (source, chunk_count) in &per_source {
                info!(source, chunk_count, "chunked source");
            }
            per_source.len()
        };

        let vectors = self.embed_chunks(&chunks).await?;
        let embedded: Vec<EmbeddedChunk> =
            chunks.into_iter().zip(vectors).map(|(chunk, vector)| EmbeddedChunk::new(chunk, vector)).collect();

        let mut index =
            VectorIndex::build(embedded)?.with_embedding_model(self.embedding_provider.model_name());
        if let Some((size, overlap)) = self.chunking {
            index = index.with_chunking(size, overlap);
        }

        info!(sources = source_count, chunk_count = index.len(), "ingestion completed");
        Ok(index)
    }

    /// Discover, extract, and ingest every matching file under `dir`.
    ///
    /// Each document's source id is its path relative to `dir`, so files with
    /// the same name in different subdirectories stay separate sources.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::SourceError`] if `dir` is missing, an entry below it
    /// cannot be read, or a file cannot be extracted, plus every error of [`ingest_pages`](Self::ingest_pages).
    pub async fn ingest_directory(
        &self,
        dir: impl AsRef<Path>,
        extractor: &dyn TextExtractor,
        extensions: &[&str],
    ) -> Result<VectorIndex> {
        let root = dir.as_ref();
        let files = discover_documents(root, extensions)?;
        info!(dir = %root.display(), files = files.len(), "discovered source documents");

        let mut pages = Vec::new();
        for path in &files {
            let extracted = extractor.extract(path, &source_id(root, path))?;
            if extracted.is_empty() {
                info!(path = %path.display(), "skipping document without text");
                continue;
            }
            info!(path = %path.display(), pages = extracted.len(), "extracted document");
            pages.extend(extracted);
        }

        self.ingest_pages(&pages).await
    }

    async fn embed_chunks(&self, chunks: &[Chunk]) -> Result<Vec<Vec<f32>>> {
        let provider = &self.embedding_provider;
        let batch_count = chunks.len().div_ceil(self.embedding_batch_size);
        debug!(
            chunks = chunks.len(),
            batch_count,
            max_concurrent = self.max_concurrent_batches,
            "embedding chunks"
        );

        let batches: Vec<Vec<Vec<f32>>> = stream::iter(chunks.chunks(self.embedding_batch_size).enumerate())
            .map(|(batch_no, batch)| async move {
                let texts: Vec<&str> = batch.iter().map(|c| c.text.as_str()).collect();
                let vectors = provider.embed_batch(&texts).await.map_err(|e| {
                    error!(batch_no, error = %e, "embedding failed during ingestion");
                    match e {
                        RagError::EmbeddingServiceError { .. } => e,
                        other => RagError::EmbeddingServiceError {
                            provider: provider.model_name().to_string(),
                            message: other.to_string(),
                        },
                    }
                })?;
                if vectors.len() != batch.len() {
                    error!(batch_no, expected = batch.len(), got = vectors.len(), "embedding count mismatch");
                    return Err(RagError::EmbeddingServiceError {
                        provider: provider.model_name().to_string(),
                        message: format!(
                            "batch {batch_no}: expected {} vectors, got {}",
                            batch.len(),
                            vectors.len()
                        ),
                    });
                }
                Ok(vectors)
            })
            .buffered(self.max_concurrent_batches)
            .try_collect()
            .await?;

        Ok(batches.into_iter().flatten().collect())
    }
}

/// Builder for constructing an [`IngestionPipeline`].
///
/// The embedding provider is required. Without an explicit chunker, a
/// [`FixedSizeChunker`] is created from the configuration.
#[derive(Default)]
pub struct IngestionPipelineBuilder {
    config: Option<RagConfig>,
    embedding_provider: Option<Arc<dyn EmbeddingProvider>>,
    chunker: Option<Arc<dyn Chunker>>,
}

impl IngestionPipelineBuilder {
    /// Set the pipeline configuration.
    pub fn config(mut self, config: RagConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Set the embedding provider.
    pub fn embedding_provider(mut self, provider: Arc<dyn EmbeddingProvider>) -> Self {
        self.embedding_provider = Some(provider);
        self
    }

    /// Override the chunker built from the configuration.
    pub fn chunker(mut self, chunker: Arc<dyn Chunker>) -> Self {
        self.chunker = Some(chunker);
        self
    }

    /// Build the [`IngestionPipeline`].
    ///
    /// # Errors
    ///
    /// Returns [`RagError::ConfigurationError`] if the embedding provider is
    /// missing or the configuration is invalid.
    pub fn build(self) -> Result<IngestionPipeline> {
        let config = self.config.unwrap_or_default();
        config.validate()?;
        let embedding_provider = self.embedding_provider.ok_or_else(|| {
            RagError::ConfigurationError("embedding_provider is required".to_string())
        })?;

        let (chunker, chunking): (Arc<dyn Chunker>, _) = match self.chunker {
            Some(chunker) => (chunker, None),
            None => (
                Arc::new(FixedSizeChunker::new(config.chunk_size, config.chunk_overlap)?),
                Some((config.chunk_size, config.chunk_overlap)),
            ),
        };

        Ok(IngestionPipeline {
            chunker,
            embedding_provider,
            embedding_batch_size: config.embedding_batch_size,
            max_concurrent_batches: config.max_concurrent_batches,
            chunking,
        })
    }
}
