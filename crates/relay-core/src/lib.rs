//! Core of relay: configuration, agents and sequential workflows.
//!
//! - [`config`]: resolves a settings file or key/value set into an immutable
//!   [`Configuration`].
//! - [`agent`]: an [`Agent`] binds a configuration to a model client and
//!   answers single prompts.
//! - [`workflow`]: a [`Workflow`] runs named steps in order against one agent,
//!   feeding each step the completions of the steps before it.
//! - [`events`] and [`aggregator`]: progress events and the aggregated
//!   response emitted while a workflow runs.

pub mod agent;
pub mod aggregator;
pub mod config;
pub mod error;
pub mod events;
pub mod workflow;

pub use agent::Agent;
pub use aggregator::{AggregatedResponse, ChainResponseAggregator};
pub use config::{ConfigSource, Configuration, ConfigurationBuilder};
pub use error::{
    AgentError, ConfigurationError, RelayError, Result, StepDefinitionError, WorkflowRunError,
};
pub use events::{WorkflowEvent, send_event};
pub use workflow::{
    ContextLimit, ExecutionContext, ResultSet, RunState, Step, StepOutput, Workflow, WorkflowRun,
    compose_prompt,
};

pub use relay_abstraction::{
    Completion, GenerationParams, ModelClient, ProviderError, ProviderErrorKind, Usage,
};
pub use relay_models::ProviderKind;
