//! Context threading between workflow steps.

use serde::{Deserialize, Serialize};

/// Separator between completions in the accumulated context.
pub const CONTEXT_SEPARATOR: &str = "\n\n";

/// Header introducing the accumulated context in a composed prompt.
pub const CONTEXT_HEADER: &str = "Context so far:";

/// Upper bound on the accumulated context carried into later prompts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContextLimit {
    /// Every prior completion is carried forward.
    #[default]
    Unbounded,
    /// Keep at most this many characters, dropping the oldest text first.
    MaxChars(usize),
}

/// Builds the effective prompt for a step.
///
/// The context block is omitted entirely when `context` is empty.
pub fn compose_prompt(instruction: &str, context: &str) -> String {
    if context.is_empty() {
        instruction.to_string()
    } else {
        format!("{instruction}\n\n{CONTEXT_HEADER}\n{context}")
    }
}

/// Running concatenation of prior completions, scoped to one run.
#[derive(Debug, Clone, Default)]
pub struct ExecutionContext {
    text: String,
    limit: ContextLimit,
    truncated: bool,
}

impl ExecutionContext {
    /// Creates an empty context with the given bound.
    pub const fn new(limit: ContextLimit) -> Self {
        Self { text: String::new(), limit, truncated: false }
    }

    /// Appends a completion, then applies the bound.
    pub fn append(&mut self, completion: &str) {
        if !self.text.is_empty() {
            self.text.push_str(CONTEXT_SEPARATOR);
        }
        self.text.push_str(completion);

        if let ContextLimit::MaxChars(max) = self.limit {
            self.truncate_front(max);
        }
    }

    /// Keeps the last `max` chars, never starting on a separator remnant.
    fn truncate_front(&mut self, max: usize) {
        let chars = self.text.chars().count();
        if chars <= max {
            return;
        }
        let drop = chars - max;
        let cut = self.text.char_indices().nth(drop).map_or(self.text.len(), |(i, _)| i);
        let remnant = self.text[cut..].len() - self.text[cut..].trim_start_matches('\n').len();
        self.text.drain(..cut + remnant);
        self.truncated = true;
    }

    /// Accumulated text.
    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// Returns `true` if nothing has been accumulated.
    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    /// Returns `true` if older text has been dropped to honor the bound.
    pub const fn was_truncated(&self) -> bool {
        self.truncated
    }

    /// Effective prompt for `instruction` given the current context.
    pub fn prompt_for(&self, instruction: &str) -> String {
        compose_prompt(instruction, &self.text)
    }
}
