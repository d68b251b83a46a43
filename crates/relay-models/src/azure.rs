//! Azure OpenAI client implementation.
//!
//! Azure hosts OpenAI models behind per-resource endpoints and named
//! deployments. Two authentication modes are supported:
//!
//! - **API key**: sent in the `api-key` header.
//! - **Default credential**: a bearer token obtained from a [`TokenProvider`]
//!   for the Cognitive Services scope.
//!
//! Configuration problems are reported by [`AzureSettings::resolve`], which
//! [`AzureOpenAiClient::from_settings`] runs before any request is made.

use async_trait::async_trait;
use relay_abstraction::{Completion, GenerationParams, ModelClient, ProviderError};
use reqwest::{Client, Url};
use std::env;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use crate::chat::{self, ChatRequest};
use crate::factory::ClientConfigError;
use crate::openai::{DEFAULT_REQUEST_TIMEOUT, build_http_client};

/// API version used when none is configured.
pub const DEFAULT_AZURE_API_VERSION: &str = "2023-05-15";

/// Token scope requested in default-credential mode.
pub const COGNITIVE_SERVICES_SCOPE: &str = "https://cognitiveservices.azure.com/.default";

/// Environment variable read by [`EnvTokenProvider`].
pub const AZURE_AD_TOKEN_ENV: &str = "AZURE_OPENAI_AD_TOKEN";

const AZURE_HOST_SUFFIX: &str = ".openai.azure.com";

/// Source of bearer tokens for default-credential authentication.
#[async_trait]
pub trait TokenProvider: Send + Sync {
    /// Returns a bearer token valid for `scope`.
    async fn token(&self, scope: &str) -> Result<String, ProviderError>;
}

/// A [`TokenProvider`] reading a pre-acquired token from the environment on
/// every request, so an external refresher can rotate it.
#[derive(Debug, Clone)]
pub struct EnvTokenProvider {
    var: String,
}

impl EnvTokenProvider {
    /// Reads the token from `AZURE_OPENAI_AD_TOKEN`.
    pub fn new() -> Self {
        Self::from_var(AZURE_AD_TOKEN_ENV)
    }

    /// Reads the token from a custom variable.
    pub fn from_var(var: impl Into<String>) -> Self {
        Self { var: var.into() }
    }
}

impl Default for EnvTokenProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TokenProvider for EnvTokenProvider {
    #[allow(clippy::disallowed_methods)] // env::var is the token source
    async fn token(&self, _scope: &str) -> Result<String, ProviderError> {
        env::var(&self.var)
            .ok()
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| ProviderError::auth(format!("{} is not set", self.var)))
    }
}

/// Azure section of a client configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AzureSettings {
    /// API key (API-key mode).
    pub api_key: Option<String>,
    /// Resource name; expands to `https://{resource_name}.openai.azure.com/`.
    pub resource_name: Option<String>,
    /// Explicit endpoint; wins over `resource_name`.
    pub base_url: Option<String>,
    /// Deployment used when no model name is given.
    pub deployment: Option<String>,
    /// API version; defaults to [`DEFAULT_AZURE_API_VERSION`].
    pub api_version: Option<String>,
    /// Authenticate with a token provider instead of an API key.
    pub use_default_credential: bool,
}

/// How requests are authenticated.
#[derive(Clone)]
pub enum AzureAuth {
    /// Static key sent in the `api-key` header.
    ApiKey(String),
    /// Bearer token fetched per request.
    Token(Arc<dyn TokenProvider>),
}

impl fmt::Debug for AzureAuth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ApiKey(_) => f.write_str("ApiKey(<redacted>)"),
            Self::Token(_) => f.write_str("Token(<provider>)"),
        }
    }
}

/// Azure OpenAI client implementation.
#[derive(Debug, Clone)]
pub struct AzureOpenAiClient {
    deployment: String,
    endpoint: String,
    resource_name: Option<String>,
    api_version: String,
    auth: AzureAuth,
    client: Client,
}

/// Extracts `name` from an endpoint of the form `https://name.openai.azure.com/...`.
pub fn extract_resource_name(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    let host = parsed.host_str()?;
    host.strip_suffix(AZURE_HOST_SUFFIX).filter(|name| !name.is_empty()).map(str::to_string)
}

fn non_empty(value: Option<&String>) -> Option<String> {
    value.map(|v| v.trim()).filter(|v| !v.is_empty()).map(str::to_string)
}

/// Settings after defaults are applied and requirements checked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedAzureSettings {
    /// Deployment requests are routed to.
    pub deployment: String,
    /// Endpoint, as configured or expanded from the resource name.
    pub endpoint: String,
    /// Resource name, configured or extracted from the endpoint.
    pub resource_name: Option<String>,
    /// API version sent with each request.
    pub api_version: String,
    /// Whether the token-provider mode is used.
    pub use_default_credential: bool,
}

impl AzureSettings {
    /// Applies defaults and checks that everything the selected
    /// authentication mode needs is present. Performs no I/O.
    ///
    /// `model` is the deployment to target; when absent, `deployment` is used.
    ///
    /// # Errors
    /// Returns `ClientConfigError::MissingField` naming the first missing setting.
    pub fn resolve(&self, model: Option<&str>) -> Result<ResolvedAzureSettings, ClientConfigError> {
        let deployment = model
            .map(str::trim)
            .filter(|m| !m.is_empty())
            .map(str::to_string)
            .or_else(|| non_empty(self.deployment.as_ref()));
        let api_version = non_empty(self.api_version.as_ref())
            .unwrap_or_else(|| DEFAULT_AZURE_API_VERSION.to_string());
        let mut resource_name = non_empty(self.resource_name.as_ref());
        let base_url = non_empty(self.base_url.as_ref());

        let endpoint = if self.use_default_credential {
            base_url.ok_or(ClientConfigError::MissingField("azure.base_url"))?
        } else {
            if non_empty(self.api_key.as_ref()).is_none() {
                return Err(ClientConfigError::MissingField("azure.api_key"));
            }
            base_url
                .or_else(|| resource_name.as_ref().map(|r| format!("https://{r}{AZURE_HOST_SUFFIX}/")))
                .ok_or(ClientConfigError::MissingField("azure.resource_name"))?
        };

        let deployment = deployment.ok_or(ClientConfigError::MissingField("azure.deployment"))?;

        Url::parse(&endpoint).map_err(|e| ClientConfigError::InvalidValue {
            field: "azure.base_url",
            reason: e.to_string(),
        })?;

        if resource_name.is_none() {
            resource_name = extract_resource_name(&endpoint);
        }

        Ok(ResolvedAzureSettings {
            deployment,
            endpoint,
            resource_name,
            api_version,
            use_default_credential: self.use_default_credential,
        })
    }
}

impl AzureOpenAiClient {
    /// Builds a client from settings.
    ///
    /// `token_provider` is only consulted in default-credential mode and falls
    /// back to [`EnvTokenProvider`].
    ///
    /// # Errors
    /// Returns `ClientConfigError::MissingField` naming the first missing setting.
    pub fn from_settings(
        model: Option<&str>,
        settings: &AzureSettings,
        token_provider: Option<Arc<dyn TokenProvider>>,
    ) -> Result<Self, ClientConfigError> {
        let resolved = settings.resolve(model)?;

        let auth = if resolved.use_default_credential {
            AzureAuth::Token(token_provider.unwrap_or_else(|| Arc::new(EnvTokenProvider::new())))
        } else {
            // resolve() guarantees the key is present in this mode
            AzureAuth::ApiKey(non_empty(settings.api_key.as_ref()).unwrap_or_default())
        };

        debug!(
            deployment = %resolved.deployment,
            endpoint = %resolved.endpoint,
            api_version = %resolved.api_version,
            auth = ?auth,
            "Configured Azure OpenAI client"
        );

        Ok(Self {
            deployment: resolved.deployment,
            endpoint: resolved.endpoint.trim_end_matches('/').to_string(),
            resource_name: resolved.resource_name,
            api_version: resolved.api_version,
            auth,
            client: build_http_client(DEFAULT_REQUEST_TIMEOUT),
        })
    }

    /// Overrides the per-request timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.client = build_http_client(timeout);
        self
    }

    /// Returns the endpoint requests are sent to, without a trailing slash.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Returns the resource name, if configured or derivable from the endpoint.
    pub fn resource_name(&self) -> Option<&str> {
        self.resource_name.as_deref()
    }

    /// Returns the API version sent with each request.
    pub fn api_version(&self) -> &str {
        &self.api_version
    }

    /// Whether requests are authenticated with a bearer token.
    pub const fn uses_token_auth(&self) -> bool {
        matches!(self.auth, AzureAuth::Token(_))
    }

    fn completions_url(&self) -> String {
        format!("{}/openai/deployments/{}/chat/completions", self.endpoint, self.deployment)
    }
}

#[async_trait]
impl ModelClient for AzureOpenAiClient {
    async fn complete(
        &self,
        prompt: &str,
        params: &GenerationParams,
    ) -> Result<Completion, ProviderError> {
        debug!(
            deployment = %self.deployment,
            prompt_len = prompt.len(),
            parameters = ?params,
            "AzureOpenAiClient generating completion"
        );

        let body = ChatRequest::user_prompt(None, prompt, params);
        let request = self
            .client
            .post(self.completions_url())
            .query(&[("api-version", self.api_version.as_str())])
            .json(&body);

        let request = match &self.auth {
            AzureAuth::ApiKey(key) => request.header("api-key", key),
            AzureAuth::Token(provider) => {
                let token = provider.token(COGNITIVE_SERVICES_SCOPE).await?;
                request.bearer_auth(token)
            }
        };

        chat::send("azure", &self.deployment, request).await
    }

    fn model_id(&self) -> &str {
        &self.deployment
    }

    fn provider(&self) -> &str {
        "azure"
    }
}
