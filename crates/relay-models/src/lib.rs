//! Model client implementations for relay.
//!
//! This crate provides concrete implementations of the `ModelClient` trait.
//!
//! # Supported Providers
//!
//! - **Mock**: Testing and development (echoes the prompt)
//! - **Scripted**: Replays canned completions and records prompts
//! - **OpenAI**: OpenAI's chat-completions API, or any compatible server (API key required)
//! - **Azure**: Azure OpenAI deployments (API key or token credential)

mod chat;

pub mod azure;
pub mod factory;
pub mod openai;
pub mod scripted;

use async_trait::async_trait;
use relay_abstraction::{Completion, GenerationParams, ModelClient, ProviderError, Usage};
use tracing::debug;

pub use azure::{
    AzureOpenAiClient, AzureSettings, EnvTokenProvider, ResolvedAzureSettings, TokenProvider,
};
pub use chat::EMPTY_COMPLETION_PLACEHOLDER;
pub use factory::{ClientConfig, ClientConfigError, ClientFactory, ProviderKind};
pub use openai::OpenAiClient;
pub use scripted::ScriptedClient;

/// A mock implementation of the `ModelClient` trait for testing and demonstration.
#[derive(Debug, Default)]
pub struct MockClient {
    id: String,
}

impl MockClient {
    /// Creates a new `MockClient` with the given ID.
    #[must_use]
    pub const fn new(id: String) -> Self {
        Self { id }
    }
}

#[async_trait]
impl ModelClient for MockClient {
    async fn complete(
        &self,
        prompt: &str,
        params: &GenerationParams,
    ) -> Result<Completion, ProviderError> {
        debug!(
            model_id = %self.id,
            prompt_len = prompt.len(),
            parameters = ?params,
            "MockClient generating completion"
        );

        let content = format!("Mock response for: {prompt}\nModel ID: {}", self.id);

        let prompt_tokens = count_tokens(prompt);
        let completion_tokens = count_tokens(&content);

        Ok(Completion {
            content,
            model_id: Some(self.id.clone()),
            usage: Some(Usage {
                prompt_tokens,
                completion_tokens,
                total_tokens: prompt_tokens + completion_tokens,
            }),
        })
    }

    fn model_id(&self) -> &str {
        &self.id
    }

    fn provider(&self) -> &str {
        "mock"
    }
}

/// Count tokens in a string (simplified: word count).
fn count_tokens(text: &str) -> u32 {
    text.split_whitespace().count() as u32
}
