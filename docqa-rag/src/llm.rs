//! Language-model completion trait.

use async_trait::async_trait;

use crate::error::Result;

/// A text-completion backend used by the
/// [`QueryNormalizer`](crate::normalizer::QueryNormalizer) and the
/// [`AnswerComposer`](crate::composer::AnswerComposer).
///
/// One call to [`complete`](LanguageModel::complete) is one network round trip.
/// Implementations report failures (including timeouts) as
/// [`RagError::LanguageModelError`](crate::RagError::LanguageModelError);
/// callers decide how to classify them.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Send a single user prompt and return the raw completion text.
    async fn complete(&self, prompt: &str) -> Result<String>;

    /// The model identifier, used in logs.
    fn name(&self) -> &str;
}
