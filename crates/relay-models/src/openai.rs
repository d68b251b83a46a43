//! OpenAI client implementation.
//!
//! This module provides an implementation of the `ModelClient` trait for OpenAI's
//! chat-completions API. The base URL can be overridden to target any
//! OpenAI-compatible server.

use async_trait::async_trait;
use relay_abstraction::{Completion, GenerationParams, ModelClient, ProviderError};
use reqwest::Client;
use std::env;
use std::time::Duration;
use tracing::debug;

use crate::chat::{self, ChatRequest};
use crate::factory::ClientConfigError;

/// Default OpenAI API base URL.
pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";

/// Environment variable consulted when no API key is given.
pub const OPENAI_API_KEY_ENV: &str = "OPENAI_API_KEY";

/// Default per-request timeout.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// OpenAI client implementation.
#[derive(Debug, Clone)]
pub struct OpenAiClient {
    /// The model ID (e.g., "gpt-4o", "gpt-4o-mini").
    model_id: String,
    /// The API key for authentication.
    api_key: String,
    /// The base URL for the API, without a trailing slash.
    base_url: String,
    /// HTTP client for making requests.
    client: Client,
}

impl OpenAiClient {
    /// Creates a new `OpenAiClient`, reading the API key from `OPENAI_API_KEY`.
    ///
    /// # Errors
    /// Returns a `ClientConfigError` if the API key is not found in the environment.
    #[allow(clippy::disallowed_methods)] // env::var is needed for API key loading
    pub fn new(model_id: String) -> Result<Self, ClientConfigError> {
        let api_key = env::var(OPENAI_API_KEY_ENV)
            .map_err(|_| ClientConfigError::MissingField("api_key"))?;
        Ok(Self::with_api_key(model_id, api_key))
    }

    /// Creates a new `OpenAiClient` with an explicit API key.
    #[must_use]
    pub fn with_api_key(model_id: String, api_key: String) -> Self {
        Self {
            model_id,
            api_key,
            base_url: DEFAULT_OPENAI_BASE_URL.to_string(),
            client: build_http_client(DEFAULT_REQUEST_TIMEOUT),
        }
    }

    /// Points the client at another OpenAI-compatible endpoint.
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Overrides the per-request timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.client = build_http_client(timeout);
        self
    }

    /// Returns the base URL requests are sent to.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

/// Builds a reqwest client with the given timeout, falling back to the
/// default client if the builder is rejected.
pub(crate) fn build_http_client(timeout: Duration) -> Client {
    Client::builder().timeout(timeout).build().unwrap_or_else(|_| Client::new())
}

#[async_trait]
impl ModelClient for OpenAiClient {
    async fn complete(
        &self,
        prompt: &str,
        params: &GenerationParams,
    ) -> Result<Completion, ProviderError> {
        debug!(
            model_id = %self.model_id,
            prompt_len = prompt.len(),
            parameters = ?params,
            "OpenAiClient generating completion"
        );

        let url = format!("{}/chat/completions", self.base_url);
        let body = ChatRequest::user_prompt(Some(self.model_id.clone()), prompt, params);
        let request = self.client.post(&url).bearer_auth(&self.api_key).json(&body);

        chat::send("openai", &self.model_id, request).await
    }

    fn model_id(&self) -> &str {
        &self.model_id
    }

    fn provider(&self) -> &str {
        "openai"
    }
}
