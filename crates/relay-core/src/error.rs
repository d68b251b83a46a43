//! Error types for relay core.

use relay_abstraction::{InvalidParameter, ProviderError};
use relay_models::ClientConfigError;
use thiserror::Error;

use crate::workflow::ResultSet;

/// Configuration could not be resolved into a usable [`crate::Configuration`].
///
/// Always raised before any provider interaction.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigurationError {
    /// A required field is absent.
    #[error("missing required configuration field '{0}'")]
    MissingField(String),

    /// A field is present but unusable.
    #[error("invalid value for configuration field '{field}': {reason}")]
    InvalidValue {
        /// Field name.
        field: String,
        /// Why it was rejected.
        reason: String,
    },

    /// A `${VAR}` placeholder could not be resolved.
    #[error("configuration field '{field}' references unset environment variable '{variable}'")]
    UnresolvedPlaceholder {
        /// Field name.
        field: String,
        /// Environment variable named by the placeholder.
        variable: String,
    },

    /// The provider name is not recognized.
    #[error("unsupported provider '{0}'")]
    UnsupportedProvider(String),

    /// The configuration file could not be read.
    #[error("failed to read configuration file {path}: {reason}")]
    Read {
        /// File path.
        path: String,
        /// Underlying error.
        reason: String,
    },

    /// The configuration file could not be parsed.
    #[error("failed to parse configuration file {path}: {reason}")]
    Parse {
        /// File path.
        path: String,
        /// Underlying error.
        reason: String,
    },
}

impl ConfigurationError {
    /// Returns the name of the field this error is about, when there is one.
    pub fn field(&self) -> Option<&str> {
        match self {
            Self::MissingField(field)
            | Self::InvalidValue { field, .. }
            | Self::UnresolvedPlaceholder { field, .. } => Some(field),
            _ => None,
        }
    }
}

impl From<ClientConfigError> for ConfigurationError {
    fn from(err: ClientConfigError) -> Self {
        match err {
            ClientConfigError::MissingField(field) => Self::MissingField(field.to_string()),
            ClientConfigError::InvalidValue { field, reason } => {
                Self::InvalidValue { field: field.to_string(), reason }
            }
            ClientConfigError::UnsupportedProvider(name) => Self::UnsupportedProvider(name),
        }
    }
}

impl From<InvalidParameter> for ConfigurationError {
    fn from(err: InvalidParameter) -> Self {
        Self::InvalidValue { field: format!("params.{}", err.field), reason: err.reason }
    }
}

/// Errors from a single agent prompt.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AgentError {
    /// The prompt was empty or whitespace only; the client was not called.
    #[error("prompt text is empty")]
    EmptyPrompt,

    /// The model client failed.
    #[error(transparent)]
    Provider(#[from] ProviderError),
}

impl AgentError {
    /// Returns the provider error, if that is what this is.
    pub const fn provider_error(&self) -> Option<&ProviderError> {
        match self {
            Self::Provider(err) => Some(err),
            Self::EmptyPrompt => None,
        }
    }
}

/// A step could not be added to a workflow. The workflow is left unchanged.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StepDefinitionError {
    /// Another step already uses this name.
    #[error("duplicate step name '{0}'")]
    DuplicateName(String),

    /// The step name is empty.
    #[error("step name cannot be empty")]
    EmptyName,

    /// The step instruction is empty.
    #[error("instruction for step '{0}' cannot be empty")]
    EmptyInstruction(String),
}

/// A workflow run ended before completing every step.
///
/// Both variants carry the results of the steps that completed before the
/// run stopped.
#[derive(Error, Debug, Clone)]
pub enum WorkflowRunError {
    /// A step's model call failed; later steps were not run.
    #[error("workflow step '{step}' (index {index}) failed: {source}")]
    StepFailed {
        /// Name of the failing step.
        step: String,
        /// Zero-based position of the failing step.
        index: usize,
        /// What went wrong.
        source: AgentError,
        /// Completions of the steps before `index`.
        partial: ResultSet,
    },

    /// The run was cancelled between steps.
    #[error("workflow cancelled before step '{next_step}' (index {index})")]
    Cancelled {
        /// Name of the step that was not started.
        next_step: String,
        /// Zero-based position of that step.
        index: usize,
        /// Completions of the steps before `index`.
        partial: ResultSet,
    },
}

impl WorkflowRunError {
    /// Results of the steps that completed before the run stopped.
    pub const fn partial(&self) -> &ResultSet {
        match self {
            Self::StepFailed { partial, .. } | Self::Cancelled { partial, .. } => partial,
        }
    }

    /// Consumes the error, returning the partial results.
    pub fn into_partial(self) -> ResultSet {
        match self {
            Self::StepFailed { partial, .. } | Self::Cancelled { partial, .. } => partial,
        }
    }

    /// Name of the step that failed, if the run failed rather than being cancelled.
    pub fn failed_step(&self) -> Option<&str> {
        match self {
            Self::StepFailed { step, .. } => Some(step),
            Self::Cancelled { .. } => None,
        }
    }

    /// Zero-based position at which the run stopped.
    pub const fn index(&self) -> usize {
        match self {
            Self::StepFailed { index, .. } | Self::Cancelled { index, .. } => *index,
        }
    }

    /// The provider error behind a failed step, if any.
    pub fn provider_error(&self) -> Option<&ProviderError> {
        match self {
            Self::StepFailed { source, .. } => source.provider_error(),
            Self::Cancelled { .. } => None,
        }
    }
}

/// Core error type for relay operations.
#[derive(Error, Debug)]
pub enum RelayError {
    /// Configuration errors
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    /// Agent prompt errors
    #[error("Agent error: {0}")]
    Agent(#[from] AgentError),

    /// Workflow definition errors
    #[error("Workflow definition error: {0}")]
    StepDefinition(#[from] StepDefinitionError),

    /// Workflow run errors
    #[error("Workflow error: {0}")]
    WorkflowRun(#[from] WorkflowRunError),
}

/// Result type alias for relay operations.
pub type Result<T> = std::result::Result<T, RelayError>;
