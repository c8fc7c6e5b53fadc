//! The question-answering service: normalize → retrieve → assemble → compose.

use std::sync::Arc;

use tracing::{Instrument, info, info_span};
use uuid::Uuid;

use crate::composer::AnswerComposer;
use crate::config::RagConfig;
use crate::context::assemble;
use crate::document::Answer;
use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, Result};
use crate::index::VectorIndex;
use crate::llm::LanguageModel;
use crate::normalizer::QueryNormalizer;
use crate::retriever::{RetrievalOptions, Retriever};

/// Answers questions from a fixed [`VectorIndex`].
///
/// Built once from explicit dependencies and shared across concurrent
/// questions; nothing inside is mutated after construction. Replacing the
/// index means building a new `DocumentQa` and swapping it in.
///
/// Each question runs inside a `docqa.ask` span carrying a fresh `query_id`,
/// with `docqa.normalize`, `docqa.retrieve` and `docqa.compose` child spans.
///
/// # Example
///
/// ```rust,ignore
/// use docqa_rag::{DocumentQa, RagConfig, VectorIndex};
///
/// let index = Arc::new(VectorIndex::load("index", embedder.dimensions())?);
/// let qa = DocumentQa::builder()
///     .config(RagConfig::default())
///     .embedding_provider(embedder)
///     .language_model(llm)
///     .index(index)
///     .build()?;
///
/// println!("{}", qa.ask("why is the sky blue").await?);
/// ```
pub struct DocumentQa {
    normalizer: QueryNormalizer,
    retriever: Retriever,
    composer: AnswerComposer,
}

impl DocumentQa {
    /// Assemble a service from already-built stages.
    pub fn new(normalizer: QueryNormalizer, retriever: Retriever, composer: AnswerComposer) -> Self {
        Self { normalizer, retriever, composer }
    }

    /// Create a new [`DocumentQaBuilder`].
    pub fn builder() -> DocumentQaBuilder {
        DocumentQaBuilder::default()
    }

    /// The retriever, and through it the index.
    pub fn retriever(&self) -> &Retriever {
        &self.retriever
    }

    /// Answer `question`, returning only the text.
    ///
    /// The result is either a grounded answer or exactly
    /// [`NOT_FOUND`](crate::composer::NOT_FOUND) when nothing relevant was
    /// retrieved. Provider failures are errors, never the sentinel.
    pub async fn ask(&self, question: &str) -> Result<String> {
        self.ask_detailed(question).await.map(|answer| answer.text)
    }

    /// Answer `question`, returning the normalized query and the chunks used.
    ///
    /// # Errors
    ///
    /// - [`RagError::ConfigurationError`] if the question is blank.
    /// - [`RagError::NormalizationError`] under the propagate policy.
    /// - [`RagError::EmbeddingServiceError`] or [`RagError::EmptyIndexError`]
    ///   from retrieval.
    /// - [`RagError::CompositionError`] if the answer model fails.
    pub async fn ask_detailed(&self, question: &str) -> Result<Answer> {
        let question = question.trim();
        if question.is_empty() {
            return Err(RagError::ConfigurationError("question must not be empty".into()));
        }

        let query_id = Uuid::new_v4();
        let span = info_span!("docqa.ask", query_id = %query_id, question_len = question.len());

        async move {
            let normalized = self
                .normalizer
                .normalize(question)
                .instrument(info_span!("docqa.normalize"))
                .await?;

            let results = self
                .retriever
                .retrieve(&normalized)
                .instrument(info_span!("docqa.retrieve"))
                .await?;

            let context = assemble(&results);
            let grounded = !context.is_empty();
            let text = self
                .composer
                .answer(&normalized, &context)
                .instrument(info_span!("docqa.compose", grounded))
                .await?;

            info!(retrieved = results.len(), grounded, "answered question");
            let sources = if grounded { results.chunks().cloned().collect() } else { Vec::new() };
            Ok(Answer { query_id, text, normalized_query: normalized, sources, grounded })
        }
        .instrument(span)
        .await
    }
}

/// Builder for a [`DocumentQa`] wired from a [`RagConfig`].
///
/// The same language model serves normalization and composition.
#[derive(Default)]
pub struct DocumentQaBuilder {
    config: Option<RagConfig>,
    embedding_provider: Option<Arc<dyn EmbeddingProvider>>,
    language_model: Option<Arc<dyn LanguageModel>>,
    index: Option<Arc<VectorIndex>>,
}

impl DocumentQaBuilder {
    /// Set the configuration.
    pub fn config(mut self, config: RagConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Set the embedding provider used for queries.
    pub fn embedding_provider(mut self, provider: Arc<dyn EmbeddingProvider>) -> Self {
        self.embedding_provider = Some(provider);
        self
    }

    /// Set the language model used for normalization and answers.
    pub fn language_model(mut self, llm: Arc<dyn LanguageModel>) -> Self {
        self.language_model = Some(llm);
        self
    }

    /// Set the index to search.
    pub fn index(mut self, index: Arc<VectorIndex>) -> Self {
        self.index = Some(index);
        self
    }

    /// Build the [`DocumentQa`].
    ///
    /// # Errors
    ///
    /// Returns [`RagError::ConfigurationError`] if a dependency is missing,
    /// the configuration is invalid, or the provider's dimension differs from
    /// the index's.
    pub fn build(self) -> Result<DocumentQa> {
        let config = self.config.unwrap_or_default();
        config.validate()?;

        let missing = |what: &str| RagError::ConfigurationError(format!("{what} is required"));
        let embedding_provider = self.embedding_provider.ok_or_else(|| missing("embedding_provider"))?;
        let llm = self.language_model.ok_or_else(|| missing("language_model"))?;
        let index = self.index.ok_or_else(|| missing("index"))?;

        if embedding_provider.dimensions() != index.dimensions() {
            return Err(RagError::ConfigurationError(format!(
                "embedding provider produces {}-dimensional vectors but the index holds {}",
                embedding_provider.dimensions(),
                index.dimensions()
            )));
        }

        let normalizer = if config.normalize_queries {
            QueryNormalizer::new(llm.clone(), config.normalization_failure)
        } else {
            QueryNormalizer::disabled()
        };
        let retriever = Retriever::new(embedding_provider, index, RetrievalOptions::from(&config));

        Ok(DocumentQa::new(normalizer, retriever, AnswerComposer::new(llm)))
    }
}
