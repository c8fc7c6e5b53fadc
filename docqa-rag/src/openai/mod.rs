//! Providers for OpenAI-compatible HTTP APIs (OpenAI, OpenRouter, local gateways).
//!
//! This module is only available when the `openai` feature is enabled.
//!
//! # Example
//!
//! ```rust,ignore
//! use docqa_rag::openai::{OpenAIChatModel, OpenAIConfig, OpenAIEmbeddingProvider};
//!
//! let config = OpenAIConfig::from_env()?;
//! let embedder = OpenAIEmbeddingProvider::new(config.clone())?;
//! let llm = OpenAIChatModel::new(config)?.with_model("gpt-3.5-turbo");
//! ```

mod chat;
mod config;
mod embedding;

pub use chat::{DEFAULT_CHAT_MODEL, DEFAULT_TEMPERATURE, OpenAIChatModel};
pub use config::{API_KEY_ENV_VARS, BASE_URL_ENV_VAR, DEFAULT_BASE_URL, DEFAULT_TIMEOUT, OpenAIConfig};
pub use embedding::{DEFAULT_DIMENSIONS, DEFAULT_EMBEDDING_MODEL, OpenAIEmbeddingProvider};

use serde::Deserialize;

/// Provider label used in errors and logs.
pub(crate) const PROVIDER: &str = "openai-compatible";

#[derive(Deserialize)]
struct ErrorResponse {
    error: ErrorDetail,
}

#[derive(Deserialize)]
struct ErrorDetail {
    message: String,
}

/// Pull the human-readable message out of an API error body, falling back to the raw body.
pub(crate) fn error_detail(body: String) -> String {
    serde_json::from_str::<ErrorResponse>(&body).map(|e| e.error.message).unwrap_or(body)
}

/// Describe a transport failure, calling out timeouts explicitly.
pub(crate) fn describe_request_error(e: &reqwest::Error, timeout: std::time::Duration) -> String {
    if e.is_timeout() {
        format!("request timed out after {}s", timeout.as_secs_f32())
    } else {
        format!("request failed: {e}")
    }
}
