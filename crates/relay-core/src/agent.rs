//! Agent: one configuration bound to one model client.

use std::fmt;
use std::sync::Arc;

use relay_abstraction::{Completion, ModelClient};
use relay_models::ClientFactory;
use tracing::{debug, error};

use crate::config::Configuration;
use crate::error::{AgentError, ConfigurationError};

/// Answers single prompts with the bound client and configuration.
///
/// Stateless across calls; share it with `Arc` to run several workflows
/// against the same client.
#[derive(Clone)]
pub struct Agent {
    name: String,
    config: Configuration,
    client: Arc<dyn ModelClient>,
}

impl fmt::Debug for Agent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Agent")
            .field("name", &self.name)
            .field("config", &self.config)
            .field("provider", &self.client.provider())
            .field("model_id", &self.client.model_id())
            .finish()
    }
}

impl Agent {
    /// Builds an agent, creating its client from the configuration.
    ///
    /// # Errors
    /// Returns `ConfigurationError` if no client can be built. Nothing is sent
    /// over the network.
    pub fn new(name: impl Into<String>, config: Configuration) -> Result<Self, ConfigurationError> {
        let client = ClientFactory::create(&config.client_config())?;
        Ok(Self::with_client(name, config, client))
    }

    /// Binds an existing, possibly shared, client.
    pub fn with_client(
        name: impl Into<String>,
        config: Configuration,
        client: Arc<dyn ModelClient>,
    ) -> Self {
        let name = name.into();
        debug!(
            agent = %name,
            provider = %client.provider(),
            model_id = %client.model_id(),
            "Agent bound to model client"
        );
        Self { name, config, client }
    }

    /// Agent name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Bound configuration.
    pub const fn config(&self) -> &Configuration {
        &self.config
    }

    /// Bound client.
    pub fn client(&self) -> &Arc<dyn ModelClient> {
        &self.client
    }

    /// Sends a fully composed prompt and returns the completion text.
    ///
    /// # Errors
    /// `AgentError::EmptyPrompt` for blank text, otherwise the client's
    /// `ProviderError` unchanged. No retry is attempted.
    pub async fn prompt(&self, text: &str) -> Result<String, AgentError> {
        self.complete(text).await.map(|completion| completion.content)
    }

    /// Like [`Agent::prompt`], keeping model id and usage.
    ///
    /// # Errors
    /// See [`Agent::prompt`].
    pub async fn complete(&self, text: &str) -> Result<Completion, AgentError> {
        if text.trim().is_empty() {
            return Err(AgentError::EmptyPrompt);
        }

        debug!(agent = %self.name, prompt_len = text.len(), "Agent prompting model");

        let completion = self.client.complete(text, self.config.params()).await.map_err(|e| {
            error!(agent = %self.name, error = %e, "Model call failed");
            AgentError::Provider(e)
        })?;

        debug!(
            agent = %self.name,
            response_len = completion.content.len(),
            "Agent received completion"
        );

        Ok(completion)
    }
}
