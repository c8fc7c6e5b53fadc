use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use super::{OpenAIConfig, PROVIDER, describe_request_error, error_detail};
use crate::error::{RagError, Result};
use crate::llm::LanguageModel;

/// The default chat model.
pub const DEFAULT_CHAT_MODEL: &str = "gpt-3.5-turbo";

/// Low temperature keeps answers close to the context.
pub const DEFAULT_TEMPERATURE: f32 = 0.1;

/// A [`LanguageModel`] calling `{base_url}/chat/completions` with a single user message.
pub struct OpenAIChatModel {
    client: reqwest::Client,
    config: OpenAIConfig,
    model: String,
    temperature: f32,
}

impl OpenAIChatModel {
    /// Create a chat model with the default model and temperature.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::ConfigurationError`] if the config is invalid.
    pub fn new(config: OpenAIConfig) -> Result<Self> {
        Ok(Self {
            client: config.http_client()?,
            config,
            model: DEFAULT_CHAT_MODEL.into(),
            temperature: DEFAULT_TEMPERATURE,
        })
    }

    /// Set the model name.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Set the sampling temperature.
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    fn failure(&self, message: impl Into<String>) -> RagError {
        RagError::LanguageModelError { provider: PROVIDER.into(), message: message.into() }
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 1],
    temperature: f32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

fn first_content(response: ChatResponse) -> Option<String> {
    response.choices.into_iter().next().map(|c| c.message.content.unwrap_or_default())
}

#[async_trait]
impl LanguageModel for OpenAIChatModel {
    async fn complete(&self, prompt: &str) -> Result<String> {
        debug!(provider = PROVIDER, model = %self.model, prompt_len = prompt.len(), "chat completion");

        let request_body = ChatRequest {
            model: &self.model,
            messages: [ChatMessage { role: "user", content: prompt }],
            temperature: self.temperature,
        };

        let response = self
            .client
            .post(self.config.endpoint("chat/completions"))
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

        let chat_response: ChatResponse = response.json().await.map_err(|e| {
            error!(provider = PROVIDER, error = %e, "failed to parse response");
            self.failure(format!("failed to parse response: {}", describe_request_error(&e, self.config.timeout)))
        })?;

        first_content(chat_response).ok_or_else(|| self.failure("response contained no choices"))
    }

    fn name(&self) -> &str {
        &self.model
    }
}
