//! Spelling and casing correction of user questions before retrieval.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::config::NormalizationFailurePolicy;
use crate::error::{RagError, Result};
use crate::llm::LanguageModel;

/// Build the correction prompt for a raw question.
pub fn normalization_prompt(raw_query: &str) -> String {
    format!(
        "Correct the spelling and casing of the following question.\n\
         Do NOT change its meaning.\n\
         Do NOT alter names, codes, formulas, or technical terms that are already spelled as intended.\n\
         Return ONLY the corrected question, with no explanation.\n\
         \n\
         Question:\n\
         {raw_query}\n\
         \n\
         Corrected question:\n"
    )
}

/// Corrects spelling and casing of a question with one language-model call.
///
/// On model failure the behaviour depends on the [`NormalizationFailurePolicy`]:
/// `FallbackToRaw` logs a warning and returns the raw query, `Propagate`
/// returns [`RagError::NormalizationError`]. An empty completion always falls
/// back to the raw query.
///
/// # Example
///
/// ```rust,ignore
/// use docqa_rag::{NormalizationFailurePolicy, QueryNormalizer};
///
/// let normalizer = QueryNormalizer::new(llm, NormalizationFailurePolicy::FallbackToRaw);
/// let query = normalizer.normalize("why is teh sky blue").await?;
/// ```
pub struct QueryNormalizer {
    llm: Option<Arc<dyn LanguageModel>>,
    on_failure: NormalizationFailurePolicy,
}

impl QueryNormalizer {
    /// Create a normalizer backed by the given language model.
    pub fn new(llm: Arc<dyn LanguageModel>, on_failure: NormalizationFailurePolicy) -> Self {
        Self { llm: Some(llm), on_failure }
    }

    /// Create a normalizer that returns the query unchanged without calling a model.
    pub fn disabled() -> Self {
        Self { llm: None, on_failure: NormalizationFailurePolicy::FallbackToRaw }
    }

    /// The configured failure policy.
    pub fn failure_policy(&self) -> NormalizationFailurePolicy {
        self.on_failure
    }

    /// Return the corrected question.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::NormalizationError`] if the model call fails and the
    /// policy is [`NormalizationFailurePolicy::Propagate`].
    pub async fn normalize(&self, raw_query: &str) -> Result<String> {
        let Some(llm) = &self.llm else {
            return Ok(raw_query.to_string());
        };

        match llm.complete(&normalization_prompt(raw_query)).await {
            Ok(output) => {
                let corrected = output.trim();
                if corrected.is_empty() {
                    warn!(model = llm.name(), "normalizer returned empty output, using raw query");
                    return Ok(raw_query.to_string());
                }
                debug!(raw = raw_query, normalized = corrected, "normalized query");
                Ok(corrected.to_string())
            }
            Err(e) => match self.on_failure {
                NormalizationFailurePolicy::FallbackToRaw => {
                    warn!(model = llm.name(), error = %e, "query normalization failed, using raw query");
                    Ok(raw_query.to_string())
                }
                NormalizationFailurePolicy::Propagate => {
                    Err(RagError::NormalizationError(format!("{} failed: {e}", llm.name())))
                }
            },
        }
    }
}
