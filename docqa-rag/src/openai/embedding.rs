use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use super::{OpenAIConfig, PROVIDER, describe_request_error, error_detail};
use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, Result};

/// The default embedding model.
pub const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-3-small";

/// The dimensionality of `text-embedding-3-small`.
pub const DEFAULT_DIMENSIONS: usize = 1536;

/// An [`EmbeddingProvider`] calling `{base_url}/embeddings`.
///
/// # Configuration
///
/// - `model` – defaults to `text-embedding-3-small`.
/// - `dimensions` – expected vector size; [`with_dimensions`](Self::with_dimensions)
///   also asks the API to truncate to it.
///
/// Responses are reordered by their `index` field and checked for count and
/// dimension before being returned.
pub struct OpenAIEmbeddingProvider {
    client: reqwest::Client,
    config: OpenAIConfig,
    model: String,
    dimensions: usize,
    request_dimensions: Option<usize>,
}

impl OpenAIEmbeddingProvider {
    /// Create a provider with the default model and dimensions.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::ConfigurationError`] if the config is invalid.
    pub fn new(config: OpenAIConfig) -> Result<Self> {
        Ok(Self {
            client: config.http_client()?,
            config,
            model: DEFAULT_EMBEDDING_MODEL.into(),
            dimensions: DEFAULT_DIMENSIONS,
            request_dimensions: None,
        })
    }

    /// Create a provider from [`OpenAIConfig::from_env`].
    pub fn from_env() -> Result<Self> {
        Self::new(OpenAIConfig::from_env()?)
    }

    /// Set the model name (e.g. `text-embedding-3-large`).
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Set the output dimensions (Matryoshka truncation).
    pub fn with_dimensions(mut self, dims: usize) -> Self {
        self.dimensions = dims;
        self.request_dimensions = Some(dims);
        self
    }

    fn failure(&self, message: impl Into<String>) -> RagError {
        RagError::EmbeddingServiceError { provider: PROVIDER.into(), message: message.into() }
    }
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: Vec<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    dimensions: Option<usize>,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Deserialize)]
struct EmbeddingData {
    #[serde(default)]
    index: Option<usize>,
    embedding: Vec<f32>,
}

/// Order `data` by its `index` field and check count and dimension.
///
/// Entries without an index keep their position.
fn ordered_vectors(
    mut data: Vec<EmbeddingData>,
    expected_count: usize,
    dimensions: usize,
) -> std::result::Result<Vec<Vec<f32>>, String> {
    if data.len() != expected_count {
        return Err(format!("expected {expected_count} embeddings, got {}", data.len()));
    }
    if data.iter().all(|d| d.index.is_some()) {
        data.sort_by_key(|d| d.index);
        if data.iter().enumerate().any(|(i, d)| d.index != Some(i)) {
            return Err("response indices are not a permutation of the inputs".into());
        }
    }
    if let Some(bad) = data.iter().find(|d| d.embedding.len() != dimensions) {
        return Err(format!("expected {dimensions}-dimensional embeddings, got {}", bad.embedding.len()));
    }
    Ok(data.into_iter().map(|d| d.embedding).collect())
}

#[async_trait]
impl EmbeddingProvider for OpenAIEmbeddingProvider {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        debug!(provider = PROVIDER, text_len = text.len(), "embedding single text");

        let results = self.embed_batch(&[text]).await?;
        results.into_iter().next().ok_or_else(|| self.failure("API returned empty response"))
    }

    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        debug!(provider = PROVIDER, batch_size = texts.len(), model = %self.model, "embedding batch");

        let request_body = EmbeddingRequest {
            model: &self.model,
            input: texts.to_vec(),
            dimensions: self.request_dimensions,
        };

        let response = self
            .client
            .post(self.config.endpoint("embeddings"))
            .bearer_auth(&self.config.api_key)
            .json(&request_body)
            .send()
            .await
            .map_err(|e| {
                error!(provider = PROVIDER, error = %e, "request failed");
                self.failure(describe_request_error(&e, self.config.timeout))
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let detail = error_detail(response.text().await.unwrap_or_default());
            error!(provider = PROVIDER, %status, "API error");
            return Err(self.failure(format!("API returned {status}: {detail}")));
        }

        let embedding_response: EmbeddingResponse = response.json().await.map_err(|e| {
            error!(provider = PROVIDER, error = %e, "failed to parse response");
            self.failure(format!("failed to parse response: {}", describe_request_error(&e, self.config.timeout)))
        })?;

        ordered_vectors(embedding_response.data, texts.len(), self.dimensions).map_err(|message| {
            error!(provider = PROVIDER, %message, "invalid embedding response");
            self.failure(message)
        })
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}
