//! Chat-completions wire format shared by the OpenAI and Azure OpenAI clients.
//!
//! Both services accept the same request body and answer with the same
//! response shape; only the URL and the authentication header differ.

use relay_abstraction::{Completion, GenerationParams, ProviderError, Usage};
use reqwest::{RequestBuilder, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

/// Completion text used when the provider answers with no choices at all.
pub const EMPTY_COMPLETION_PLACEHOLDER: &str = "[empty]";

#[derive(Debug, Serialize)]
pub(crate) struct ChatRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    pub messages: Vec<ChatRequestMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stop: Option<Vec<String>>,
}

/// A single request message. `content` is always a plain string: some
/// deployments reject the list-of-parts form.
#[derive(Debug, Serialize)]
pub(crate) struct ChatRequestMessage {
    pub role: &'static str,
    pub content: String,
}

impl ChatRequest {
    /// Builds a single-user-message request. `model` is `None` for Azure,
    /// where the deployment in the URL selects the model.
    pub fn user_prompt(model: Option<String>, prompt: &str, params: &GenerationParams) -> Self {
        Self {
            model,
            messages: vec![ChatRequestMessage { role: "user", content: prompt.to_string() }],
            temperature: params.temperature,
            top_p: params.top_p,
            max_tokens: params.max_tokens,
            stop: params.stop_sequences.clone(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct ChatResponse {
    #[serde(default)]
    pub choices: Vec<ChatChoice>,
    pub usage: Option<ChatUsage>,
    pub model: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ChatChoice {
    pub message: ChatResponseMessage,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ChatResponseMessage {
    pub content: Option<String>,
}

#[derive(Debug, Deserialize)]
#[allow(clippy::struct_field_names)] // Matches API naming
pub(crate) struct ChatUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

impl ChatResponse {
    /// Converts the wire response into a [`Completion`].
    ///
    /// No choices yields [`EMPTY_COMPLETION_PLACEHOLDER`]; a choice without
    /// content yields an empty string.
    pub fn into_completion(self, fallback_model: &str) -> Completion {
        let content = match self.choices.into_iter().next() {
            Some(choice) => choice.message.content.unwrap_or_default(),
            None => EMPTY_COMPLETION_PLACEHOLDER.to_string(),
        };

        let usage = self.usage.map(|u| Usage {
            prompt_tokens: u.prompt_tokens,
            completion_tokens: u.completion_tokens,
            total_tokens: u.total_tokens,
        });

        Completion {
            content,
            model_id: Some(self.model.unwrap_or_else(|| fallback_model.to_string())),
            usage,
        }
    }
}

/// Maps a non-success HTTP status to a [`ProviderError`].
pub fn error_for_status(provider: &str, status: StatusCode, body: &str) -> ProviderError {
    let detail = format!("{provider} API error ({status}): {body}");
    match status.as_u16() {
        401 | 403 => ProviderError::auth(detail),
        402 | 429 => ProviderError::rate_limit(detail),
        408 | 504 => ProviderError::timeout(detail),
        500..=599 => ProviderError::network(detail),
        _ => ProviderError::invalid_response(detail),
    }
}

/// Maps a transport-level failure to a [`ProviderError`].
pub fn error_for_transport(provider: &str, err: &reqwest::Error) -> ProviderError {
    if err.is_timeout() {
        ProviderError::timeout(format!("{provider} request timed out: {err}"))
    } else {
        ProviderError::network(format!("{provider} network error: {err}"))
    }
}

/// Sends a prepared request and decodes the chat-completions answer.
pub(crate) async fn send(
    provider: &str,
    model_id: &str,
    request: RequestBuilder,
) -> Result<Completion, ProviderError> {
    let response = request.send().await.map_err(|e| {
        error!(provider, error = %e, "Failed to send chat completion request");
        error_for_transport(provider, &e)
    })?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_else(|_| "Unknown error".to_string());
        error!(provider, status = %status, error = %body, "Provider returned error status");
        return Err(error_for_status(provider, status, &body));
    }

    let body = response.text().await.map_err(|e| error_for_transport(provider, &e))?;
    let parsed: ChatResponse = serde_json::from_str(&body).map_err(|e| {
        error!(provider, error = %e, "Failed to parse chat completion response");
        ProviderError::invalid_response(format!("Failed to parse response: {e}"))
    })?;

    debug!(provider, model_id, choices = parsed.choices.len(), "Chat completion received");

    Ok(parsed.into_completion(model_id))
}
