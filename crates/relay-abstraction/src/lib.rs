//! Model client abstraction layer for relay.
//!
//! This crate defines the narrow interface the agent and workflow engine use to
//! talk to a language-model provider. Concrete providers live in `relay-models`.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Category of a provider failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderErrorKind {
    /// Credentials were missing, invalid, or rejected.
    Auth,
    /// The provider throttled the request or the quota is exhausted.
    RateLimit,
    /// The request could not reach the provider, or the provider was unavailable.
    Network,
    /// The request did not finish within the client's deadline.
    Timeout,
    /// The provider answered with something that is not a usable completion.
    InvalidResponse,
}

impl fmt::Display for ProviderErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Auth => "authentication failure",
            Self::RateLimit => "rate limited",
            Self::Network => "network failure",
            Self::Timeout => "timeout",
            Self::InvalidResponse => "invalid response",
        };
        f.write_str(name)
    }
}

/// An error returned by a [`ModelClient`].
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[error("Provider error ({kind}): {message}")]
pub struct ProviderError {
    /// What went wrong.
    pub kind: ProviderErrorKind,
    /// Provider- or transport-supplied detail.
    pub message: String,
}

impl ProviderError {
    /// Creates a new `ProviderError`.
    pub fn new(kind: ProviderErrorKind, message: impl Into<String>) -> Self {
        Self { kind, message: message.into() }
    }

    /// Shorthand for an [`ProviderErrorKind::Auth`] error.
    pub fn auth(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorKind::Auth, message)
    }

    /// Shorthand for a [`ProviderErrorKind::RateLimit`] error.
    pub fn rate_limit(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorKind::RateLimit, message)
    }

    /// Shorthand for a [`ProviderErrorKind::Network`] error.
    pub fn network(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorKind::Network, message)
    }

    /// Shorthand for a [`ProviderErrorKind::Timeout`] error.
    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorKind::Timeout, message)
    }

    /// Shorthand for a [`ProviderErrorKind::InvalidResponse`] error.
    pub fn invalid_response(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorKind::InvalidResponse, message)
    }

    /// Whether retrying the same request later could plausibly succeed.
    ///
    /// Nothing in relay retries on its own; this is a hint for callers that
    /// layer a retry policy on top.
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self.kind,
            ProviderErrorKind::RateLimit | ProviderErrorKind::Network | ProviderErrorKind::Timeout
        )
    }
}

/// Error returned by [`GenerationParams::validate`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid generation parameter '{field}': {reason}")]
pub struct InvalidParameter {
    /// Name of the offending parameter.
    pub field: &'static str,
    /// Why the value was rejected.
    pub reason: String,
}

/// Parameters for controlling the model's generation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationParams {
    /// What sampling temperature to use, between 0 and 2.
    /// Higher values mean the model will take more risks.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,

    /// Nucleus sampling: the model considers the tokens with `top_p` probability mass.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f32>,

    /// The maximum number of tokens to generate in the completion.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,

    /// Up to 4 sequences where the provider will stop generating further tokens.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stop_sequences: Option<Vec<String>>,
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self { temperature: Some(0.7), top_p: Some(1.0), max_tokens: Some(512), stop_sequences: None }
    }
}

impl GenerationParams {
    /// Maximum number of stop sequences accepted by providers.
    pub const MAX_STOP_SEQUENCES: usize = 4;

    /// Checks every set parameter against its accepted range.
    pub fn validate(&self) -> Result<(), InvalidParameter> {
        if let Some(temperature) = self.temperature {
            if !(0.0..=2.0).contains(&temperature) {
                return Err(InvalidParameter {
                    field: "temperature",
                    reason: format!("{temperature} is outside 0.0..=2.0"),
                });
            }
        }

        if let Some(top_p) = self.top_p {
            if !(0.0..=1.0).contains(&top_p) {
                return Err(InvalidParameter {
                    field: "top_p",
                    reason: format!("{top_p} is outside 0.0..=1.0"),
                });
            }
        }

        if self.max_tokens == Some(0) {
            return Err(InvalidParameter {
                field: "max_tokens",
                reason: "must be greater than zero".to_string(),
            });
        }

        if let Some(stops) = &self.stop_sequences {
            if stops.len() > Self::MAX_STOP_SEQUENCES {
                return Err(InvalidParameter {
                    field: "stop_sequences",
                    reason: format!(
                        "{} given, at most {} allowed",
                        stops.len(),
                        Self::MAX_STOP_SEQUENCES
                    ),
                });
            }
        }

        Ok(())
    }
}

/// A completion returned by a model client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Completion {
    /// The generated text.
    pub content: String,

    /// Optional: the ID of the model that produced the completion.
    pub model_id: Option<String>,

    /// Optional: token usage for the request.
    pub usage: Option<Usage>,
}

impl Completion {
    /// Creates a completion carrying only text.
    pub fn text(content: impl Into<String>) -> Self {
        Self { content: content.into(), model_id: None, usage: None }
    }
}

/// Token usage statistics for a model request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    /// Number of tokens in the prompt.
    pub prompt_tokens: u32,

    /// Number of tokens in the completion.
    pub completion_tokens: u32,

    /// Total number of tokens used.
    pub total_tokens: u32,
}

/// A provider-agnostic way of turning a prompt into a completion.
///
/// Implementations must be `Send + Sync`: one client may be shared by several
/// agents and used by concurrent workflow runs. Retries and per-request
/// timeouts, if any, belong to the implementation.
#[async_trait]
pub trait ModelClient: Send + Sync {
    /// Generates a completion for an already composed prompt.
    ///
    /// # Errors
    /// Returns a `ProviderError` if the provider could not produce a completion.
    async fn complete(
        &self,
        prompt: &str,
        params: &GenerationParams,
    ) -> Result<Completion, ProviderError>;

    /// Returns the ID of the model this client targets.
    fn model_id(&self) -> &str;

    /// Returns a short provider name (e.g. "openai", "azure").
    fn provider(&self) -> &str;
}
