//! # docqa-rag
//!
//! Grounded question answering over a private document collection.
//!
//! ## Overview
//!
//! The crate has two phases that share nothing but a persisted index:
//!
//! - **Ingestion** ([`IngestionPipeline`]): extracted text is split by the
//!   [`FixedSizeChunker`] into overlapping character windows, embedded in
//!   batches through an [`EmbeddingProvider`], and stored in a
//!   [`VectorIndex`] that is written to `<dir>/index.json`.
//! - **Answering** ([`DocumentQa`]): a question is corrected by the
//!   [`QueryNormalizer`], matched against the index by the [`Retriever`],
//!   joined into a [`Context`], and answered by the [`AnswerComposer`] using
//!   only that context. When nothing relevant is retrieved the answer is
//!   exactly [`NOT_FOUND`] and no model is called.
//!
//! Provider integrations are feature-gated:
//!
//! | Feature | Module | Description |
//! |---------|--------|-------------|
//! | `openai` | [`openai`] | OpenAI-compatible embeddings and chat completions (OpenAI, OpenRouter, local gateways) |
//!
//! [`mock`] holds deterministic providers for tests and offline runs.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use docqa_rag::mock::{MockEmbeddingProvider, MockLlm};
//! use docqa_rag::{DocumentQa, IngestionPipeline, PageText, RagConfig};
//!
//! # async fn run() -> docqa_rag::Result<()> {
//! let embedder = Arc::new(MockEmbeddingProvider::new(64));
//! let config = RagConfig::default();
//!
//! let pipeline = IngestionPipeline::builder()
//!     .config(config.clone())
//!     .embedding_provider(embedder.clone())
//!     .build()?;
//! let index = pipeline
//!     .ingest_pages(&[PageText::new("sky.txt", Some(1), "The sky is blue because of Rayleigh scattering.")])
//!     .await?;
//!
//! let qa = DocumentQa::builder()
//!     .config(config)
//!     .embedding_provider(embedder)
//!     .language_model(Arc::new(MockLlm::new("Because of Rayleigh scattering.")))
//!     .index(Arc::new(index))
//!     .build()?;
//!
//! println!("{}", qa.ask("why is the sky blue").await?);
//! # Ok(())
//! # }
//! ```

pub mod chunking;
pub mod composer;
pub mod config;
pub mod context;
pub mod document;
pub mod embedding;
pub mod error;
pub mod extract;
pub mod index;
pub mod llm;
pub mod mock;
pub mod normalizer;
pub mod pipeline;
pub mod retriever;
pub mod service;

#[cfg(feature = "openai")]
pub mod openai;

pub use chunking::{Chunker, FixedSizeChunker, chunk_text};
pub use composer::{AnswerComposer, NOT_FOUND};
pub use config::{NormalizationFailurePolicy, RagConfig, RagConfigBuilder, SearchStrategy};
pub use context::{Context, assemble};
pub use document::{Answer, Chunk, EmbeddedChunk, PageText, RetrievalResult, ScoredChunk};
pub use embedding::EmbeddingProvider;
pub use error::{RagError, Result};
pub use extract::{PlainTextExtractor, TextExtractor, discover_documents};
pub use index::{INDEX_FILE_NAME, IndexManifest, VectorIndex};
pub use llm::LanguageModel;
pub use normalizer::QueryNormalizer;
pub use pipeline::{IngestionPipeline, IngestionPipelineBuilder};
pub use retriever::{RetrievalOptions, Retriever};
pub use service::{DocumentQa, DocumentQaBuilder};
