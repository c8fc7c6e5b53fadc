//! Grounded answer composition.

use std::sync::Arc;

use tracing::{debug, error, info};

use crate::context::Context;
use crate::error::{RagError, Result};
use crate::llm::LanguageModel;

/// The fixed reply for questions the corpus cannot answer.
pub const NOT_FOUND: &str = "Not found in the document.";

/// Build the grounded-answer prompt.
///
/// The prompt carries the context verbatim, the question, and the rules
/// restricting the model to that context.
pub fn answer_prompt(question: &str, context: &str) -> String {
    format!(
        "You are an academic assistant answering questions about a private document collection.\n\
         \n\
         TASK:\n\
         Extract and present all information from the context that answers the question below.\n\
         \n\
         RULES:\n\
         - Use ONLY the given context. Do not add outside knowledge.\n\
         - Include every passage that explains the concept; do not summarize it away or skip details.\n\
         - Light rephrasing for clarity is allowed.\n\
         - If the context does not contain the answer, reply exactly:\n\
         {NOT_FOUND}\n\
         \n\
         Context:\n\
         {context}\n\
         \n\
         Question:\n\
         {question}\n\
         \n\
         Answer (full explanation from the document):\n"
    )
}

/// Asks the language model to answer a question from the assembled context.
///
/// With [`Context::Empty`] it returns [`NOT_FOUND`] without calling the
/// model. Otherwise it makes exactly one call and returns the trimmed output.
pub struct AnswerComposer {
    llm: Arc<dyn LanguageModel>,
}

impl AnswerComposer {
    /// Create a composer backed by `llm`.
    pub fn new(llm: Arc<dyn LanguageModel>) -> Self {
        Self { llm }
    }

    /// Compose the answer to `question` from `context`.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::CompositionError`] if the model call fails or
    /// returns only whitespace.
    pub async fn answer(&self, question: &str, context: &Context) -> Result<String> {
        let Context::Text(context_text) = context else {
            info!("empty context, answering not found without a model call");
            return Ok(NOT_FOUND.to_string());
        };

        debug!(model = self.llm.name(), context_len = context_text.len(), "composing answer");
        let output = self.llm.complete(&answer_prompt(question, context_text)).await.map_err(|e| {
            error!(model = self.llm.name(), error = %e, "answer composition failed");
            RagError::CompositionError(format!("{} failed: {e}", self.llm.name()))
        })?;

        let answer = output.trim();
        if answer.is_empty() {
            error!(model = self.llm.name(), "model returned an empty answer");
            return Err(RagError::CompositionError(format!(
                "{} returned an empty completion",
                self.llm.name()
            )));
        }
        Ok(answer.to_string())
    }
}
