use std::time::Duration;

use crate::error::{RagError, Result};

/// OpenRouter's OpenAI-compatible endpoint.
pub const DEFAULT_BASE_URL: &str = "https://openrouter.ai/api/v1";

/// Per-request timeout applied when none is configured.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Environment variables checked for the API key, in order.
pub const API_KEY_ENV_VARS: [&str; 3] = ["DOCQA_API_KEY", "OPENROUTER_API_KEY", "OPENAI_API_KEY"];

/// Environment variable overriding the base URL.
pub const BASE_URL_ENV_VAR: &str = "DOCQA_BASE_URL";

/// Connection settings shared by the embedding and chat providers.
#[derive(Clone)]
pub struct OpenAIConfig {
    /// Bearer token sent with every request.
    pub api_key: String,
    /// API root, e.g. `https://api.openai.com/v1`.
    pub base_url: String,
    /// Applied to the whole request, including reading the body.
    pub timeout: Duration,
}

impl std::fmt::Debug for OpenAIConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAIConfig")
            .field("api_key", &"<redacted>")
            .field("base_url", &self.base_url)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl OpenAIConfig {
    /// Create a config for `api_key` with the default base URL and timeout.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self { api_key: api_key.into(), base_url: DEFAULT_BASE_URL.to_string(), timeout: DEFAULT_TIMEOUT }
    }

    /// Read the API key from the first set variable of [`API_KEY_ENV_VARS`]
    /// and the base URL from [`BASE_URL_ENV_VAR`] if present.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::ConfigurationError`] if no API key variable is set.
    pub fn from_env() -> Result<Self> {
        let api_key = API_KEY_ENV_VARS
            .iter()
            .find_map(|var| std::env::var(var).ok().filter(|v| !v.trim().is_empty()))
            .ok_or_else(|| {
                RagError::ConfigurationError(format!(
                    "no API key found; set one of {}",
                    API_KEY_ENV_VARS.join(", ")
                ))
            })?;

        let mut config = Self::new(api_key);
        if let Ok(base_url) = std::env::var(BASE_URL_ENV_VAR) {
            config.base_url = base_url;
        }
        Ok(config)
    }

    /// Set the API root.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Set the per-request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Full URL of `path` under the base URL.
    pub(crate) fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), path.trim_start_matches('/'))
    }

    pub(crate) fn validate(&self) -> Result<()> {
        if self.api_key.trim().is_empty() {
            return Err(RagError::ConfigurationError("API key must not be empty".into()));
        }
        if self.base_url.trim().is_empty() {
            return Err(RagError::ConfigurationError("base URL must not be empty".into()));
        }
        if self.timeout.is_zero() {
            return Err(RagError::ConfigurationError("timeout must be greater than zero".into()));
        }
        Ok(())
    }

    pub(crate) fn http_client(&self) -> Result<reqwest::Client> {
        self.validate()?;
        reqwest::Client::builder()
            .timeout(self.timeout)
            .build()
            .map_err(|e| RagError::ConfigurationError(format!("failed to create HTTP client: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_joins_without_double_slashes() {
        let config = OpenAIConfig::new("key").with_base_url("http://localhost:8080/v1/");
        assert_eq!(config.endpoint("/embeddings"), "http://localhost:8080/v1/embeddings");
        assert_eq!(
            OpenAIConfig::new("key").endpoint("chat/completions"),
            "https://openrouter.ai/api/v1/chat/completions"
        );
    }

    #[test]
    fn rejects_empty_key_and_zero_timeout() {
        assert!(matches!(OpenAIConfig::new(" ").validate(), Err(RagError::ConfigurationError(_))));
        assert!(matches!(
            OpenAIConfig::new("key").with_timeout(Duration::ZERO).validate(),
            Err(RagError::ConfigurationError(_))
        ));
    }

    #[test]
    fn debug_hides_the_key() {
        let rendered = format!("{:?}", OpenAIConfig::new("sk-secret"));
        assert!(!rendered.contains("sk-secret"));
    }
}
