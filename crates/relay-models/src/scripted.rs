//! A replaying client for tests and demos.

use async_trait::async_trait;
use relay_abstraction::{Completion, GenerationParams, ModelClient, ProviderError};
use std::collections::VecDeque;
use tokio::sync::Mutex;
use tracing::debug;

/// Replays a fixed queue of results and records every prompt it receives.
///
/// Once the queue is drained, further calls fail with an
/// `InvalidResponse` error so tests notice unexpected extra calls.
#[derive(Debug)]
pub struct ScriptedClient {
    id: String,
    responses: Mutex<VecDeque<Result<Completion, ProviderError>>>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedClient {
    /// Creates a client that will answer with `responses`, in order.
    pub fn new(
        id: impl Into<String>,
        responses: impl IntoIterator<Item = Result<Completion, ProviderError>>,
    ) -> Self {
        Self {
            id: id.into(),
            responses: Mutex::new(responses.into_iter().collect()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// Creates a client that answers successfully with each text, in order.
    pub fn from_texts<I, S>(id: impl Into<String>, texts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(id, texts.into_iter().map(|t| Ok(Completion::text(t))))
    }

    /// Returns every prompt received so far, in call order.
    pub async fn prompts(&self) -> Vec<String> {
        self.prompts.lock().await.clone()
    }

    /// Number of calls received so far.
    pub async fn call_count(&self) -> usize {
        self.prompts.lock().await.len()
    }
}

#[async_trait]
impl ModelClient for ScriptedClient {
    async fn complete(
        &self,
        prompt: &str,
        _params: &GenerationParams,
    ) -> Result<Completion, ProviderError> {
        self.prompts.lock().await.push(prompt.to_string());
        let next = self.responses.lock().await.pop_front();
        debug!(model_id = %self.id, prompt_len = prompt.len(), "ScriptedClient replaying");

        next.unwrap_or_else(|| {
            Err(ProviderError::invalid_response(format!(
                "scripted client '{}' has no responses left",
                self.id
            )))
        })
    }

    fn model_id(&self) -> &str {
        &self.id
    }

    fn provider(&self) -> &str {
        "scripted"
    }
}
