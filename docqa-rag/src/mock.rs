//! Deterministic in-process providers for tests, demos, and offline runs.
//!
//! [`MockLlm`] returns canned completions and records every prompt it sees.
//! [`MockEmbeddingProvider`] produces bag-of-words hashing embeddings, so
//! texts sharing words land close together without any network access.

use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;

use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, Result};
use crate::llm::LanguageModel;

type Responder = Box<dyn Fn(&str) -> Result<String> + Send + Sync>;

/// A [`LanguageModel`] returning scripted completions.
pub struct MockLlm {
    name: String,
    responder: Responder,
    prompts: Mutex<Vec<String>>,
}

impl MockLlm {
    /// Always complete with `response`.
    pub fn new(response: impl Into<String>) -> Self {
        let response = response.into();
        Self::from_fn(move |_| Ok(response.clone()))
    }

    /// Always fail with a [`RagError::LanguageModelError`].
    pub fn failing(message: impl Into<String>) -> Self {
        let message = message.into();
        Self::from_fn(move |_| {
            Err(RagError::LanguageModelError { provider: "mock".into(), message: message.clone() })
        })
    }

    /// Compute each completion from the prompt.
    pub fn from_fn(responder: impl Fn(&str) -> Result<String> + Send + Sync + 'static) -> Self {
        Self {
            name: "mock-llm".to_string(),
            responder: Box::new(responder),
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// Number of completed or failed calls so far.
    pub fn call_count(&self) -> usize {
        self.prompts.lock().map(|p| p.len()).unwrap_or_default()
    }

    /// Every prompt received, in call order.
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().map(|p| p.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl LanguageModel for MockLlm {
    async fn complete(&self, prompt: &str) -> Result<String> {
        if let Ok(mut prompts) = self.prompts.lock() {
            prompts.push(prompt.to_string());
        }
        (self.responder)(prompt)
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// An [`EmbeddingProvider`] hashing lowercase words into a fixed number of buckets.
///
/// Vectors are L2-normalised; a text without any word maps to the zero vector.
pub struct MockEmbeddingProvider {
    dimensions: usize,
    fail_after: Option<usize>,
    calls: AtomicUsize,
}

impl MockEmbeddingProvider {
    /// Create a provider producing `dimensions`-long vectors.
    pub fn new(dimensions: usize) -> Self {
        Self { dimensions, fail_after: None, calls: AtomicUsize::new(0) }
    }

    /// Fail every call after the first `calls` successful ones.
    pub fn failing_after(mut self, calls: usize) -> Self {
        self.fail_after = Some(calls);
        self
    }

    /// Number of `embed`/`embed_batch`/`embed_query` calls so far.
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn record_call(&self) -> Result<()> {
        let previous = self.calls.fetch_add(1, Ordering::SeqCst);
        match self.fail_after {
            Some(limit) if previous >= limit => Err(RagError::EmbeddingServiceError {
                provider: "mock".into(),
                message: format!("simulated failure on call {}", previous + 1),
            }),
            _ => Ok(()),
        }
    }

    fn vectorize(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dimensions];
        if self.dimensions == 0 {
            return vector;
        }
        for word in text.split(|c: char| !c.is_alphanumeric()).filter(|w| !w.is_empty()) {
            let bucket = fnv1a(&word.to_lowercase()) % self.dimensions as u64;
            vector[bucket as usize] += 1.0;
        }
        let norm: f32 = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            vector.iter_mut().for_each(|x| *x /= norm);
        }
        vector
    }
}

fn fnv1a(text: &str) -> u64 {
    text.bytes().fold(0xcbf2_9ce4_8422_2325u64, |hash, b| {
        (hash ^ u64::from(b)).wrapping_mul(0x0100_0000_01b3)
    })
}

#[async_trait]
impl EmbeddingProvider for MockEmbeddingProvider {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.record_call()?;
        Ok(self.vectorize(text))
    }

    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        self.record_call()?;
        Ok(texts.iter().map(|t| self.vectorize(t)).collect())
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn model_name(&self) -> &str {
        "mock-hashing-embedder"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn hashing_embedder_is_deterministic_and_case_insensitive() {
        let provider = MockEmbeddingProvider::new(32);
        let a = provider.embed("The Sky is BLUE").await.unwrap();
        let b = provider.embed("the sky is blue").await.unwrap();
        assert_eq!(a, b);
        assert_eq!(a.len(), 32);
        assert_eq!(provider.call_count(), 2);
    }

    #[tokio::test]
    async fn failing_after_limit() {
        let provider = MockEmbeddingProvider::new(8).failing_after(1);
        assert!(provider.embed_batch(&["a", "b"]).await.is_ok());
        assert!(matches!(
            provider.embed_query("c").await,
            Err(RagError::EmbeddingServiceError { .. })
        ));
    }

    #[tokio::test]
    async fn mock_llm_records_prompts() {
        let llm = MockLlm::from_fn(|prompt| Ok(prompt.to_uppercase()));
        assert_eq!(llm.complete("hi").await.unwrap(), "HI");
        assert_eq!(llm.prompts(), vec!["hi".to_string()]);
    }
}
