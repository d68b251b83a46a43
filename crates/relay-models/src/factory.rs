//! Client factory for creating model clients from configuration.
//!
//! The provider is chosen once, here, when an agent is built. Nothing
//! downstream branches on the provider name.

use crate::azure::{AzureOpenAiClient, AzureSettings, TokenProvider};
use crate::{MockClient, OpenAiClient};
use relay_abstraction::ModelClient;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, error};

/// Errors raised while turning a [`ClientConfig`] into a client.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ClientConfigError {
    /// A required setting is absent.
    #[error("missing required setting '{0}'")]
    MissingField(&'static str),

    /// A setting is present but unusable.
    #[error("invalid value for '{field}': {reason}")]
    InvalidValue {
        /// Setting name.
        field: &'static str,
        /// Why it was rejected.
        reason: String,
    },

    /// The provider name is not recognized.
    #[error("unsupported model provider: {0}")]
    UnsupportedProvider(String),
}

/// Provider enumeration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderKind {
    /// OpenAI or any OpenAI-compatible server.
    OpenAi,
    /// Azure-hosted OpenAI deployment.
    Azure,
    /// Mock client for testing.
    Mock,
}

impl ProviderKind {
    /// Canonical lowercase name.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::OpenAi => "openai",
            Self::Azure => "azure",
            Self::Mock => "mock",
        }
    }

    /// Whether the provider needs a credential to be usable.
    pub const fn requires_credential(self) -> bool {
        !matches!(self, Self::Mock)
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderKind {
    type Err = ClientConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "openai" | "openai-compatible" => Ok(Self::OpenAi),
            "azure" | "azure-openai" | "azureopenai" => Ok(Self::Azure),
            "mock" => Ok(Self::Mock),
            other => Err(ClientConfigError::UnsupportedProvider(other.to_string())),
        }
    }
}

/// Client configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct ClientConfig {
    /// The provider to create a client for.
    pub provider: ProviderKind,
    /// The model ID (for Azure, the deployment name).
    pub model_id: String,
    /// API key for OpenAI. Azure keys live in `azure`.
    pub api_key: Option<String>,
    /// Endpoint override for OpenAI-compatible servers.
    pub base_url: Option<String>,
    /// Azure-specific settings.
    pub azure: AzureSettings,
    /// Per-request timeout override.
    pub timeout: Option<Duration>,
}

impl ClientConfig {
    /// Creates a new `ClientConfig` with the given provider and model ID.
    #[must_use]
    pub fn new(provider: ProviderKind, model_id: impl Into<String>) -> Self {
        Self {
            provider,
            model_id: model_id.into(),
            api_key: None,
            base_url: None,
            azure: AzureSettings::default(),
            timeout: None,
        }
    }

    /// Sets the API key for this configuration.
    #[must_use]
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// Sets the base URL for this configuration.
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    /// Sets the Azure section for this configuration.
    #[must_use]
    pub fn with_azure(mut self, azure: AzureSettings) -> Self {
        self.azure = azure;
        self
    }

    /// Sets the per-request timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// Factory for creating model clients.
pub struct ClientFactory;

impl ClientFactory {
    /// Creates a client from the given configuration.
    ///
    /// # Errors
    /// Returns a `ClientConfigError` if a required setting is missing or invalid.
    pub fn create(config: &ClientConfig) -> Result<Arc<dyn ModelClient>, ClientConfigError> {
        Self::create_with_token_provider(config, None)
    }

    /// Creates a client, handing `token_provider` to providers that use
    /// token authentication.
    ///
    /// # Errors
    /// Returns a `ClientConfigError` if a required setting is missing or invalid.
    pub fn create_with_token_provider(
        config: &ClientConfig,
        token_provider: Option<Arc<dyn TokenProvider>>,
    ) -> Result<Arc<dyn ModelClient>, ClientConfigError> {
        debug!(
            provider = %config.provider,
            model_id = %config.model_id,
            "Creating model client"
        );

        let client: Arc<dyn ModelClient> = match config.provider {
            ProviderKind::Mock => Arc::new(MockClient::new(config.model_id.clone())),
            ProviderKind::OpenAi => {
                if config.model_id.trim().is_empty() {
                    return Err(ClientConfigError::MissingField("model"));
                }
                let mut client = match &config.api_key {
                    Some(key) => OpenAiClient::with_api_key(config.model_id.clone(), key.clone()),
                    None => OpenAiClient::new(config.model_id.clone()).inspect_err(|e| {
                        error!(error = %e, "OpenAI client has no API key");
                    })?,
                };
                if let Some(base_url) = &config.base_url {
                    client = client.with_base_url(base_url.clone());
                }
                if let Some(timeout) = config.timeout {
                    client = client.with_timeout(timeout);
                }
                Arc::new(client)
            }
            ProviderKind::Azure => {
                let mut azure = config.azure.clone();
                if azure.base_url.is_none() {
                    azure.base_url.clone_from(&config.base_url);
                }
                let model = Some(config.model_id.as_str()).filter(|m| !m.trim().is_empty());
                let mut client = AzureOpenAiClient::from_settings(model, &azure, token_provider)?;
                if let Some(timeout) = config.timeout {
                    client = client.with_timeout(timeout);
                }
                Arc::new(client)
            }
        };

        Ok(client)
    }
}
