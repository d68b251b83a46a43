//! Sequential multi-step workflows.
//!
//! A [`Workflow`] owns an ordered list of [`Step`]s and shares one [`Agent`].
//! Running it sends each step's instruction, followed by the completions of
//! every earlier step, to the agent, and collects the completions into a
//! [`ResultSet`] in execution order.
//!
//! Steps never run concurrently: step *k* sees the output of steps `1..k`.
//! A failed step stops the run; the error names the step and carries the
//! results of the steps that completed before it.
//!
//! ```no_run
//! # async fn demo(agent: std::sync::Arc<relay_core::Agent>) -> relay_core::Result<()> {
//! use relay_core::Workflow;
//!
//! let mut workflow = Workflow::new("report", agent);
//! workflow
//!     .add_step("research", "Research renewable energy")?
//!     .add_step("analysis", "Analyse the data collected in the previous step")?;
//!
//! let results = workflow.run().await?;
//! for output in &results {
//!     println!("{}: {}", output.name, output.completion);
//! }
//! # Ok(())
//! # }
//! ```

mod context;
mod result;
mod run;

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::agent::Agent;
use crate::error::{StepDefinitionError, WorkflowRunError};

pub use context::{CONTEXT_HEADER, CONTEXT_SEPARATOR, ContextLimit, ExecutionContext, compose_prompt};
pub use result::{ResultSet, StepOutput};
pub use run::{RunState, WorkflowRun};

/// A named instruction inside a workflow. Immutable once added.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Step {
    name: String,
    instruction: String,
}

impl Step {
    /// Step name, unique within its workflow.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Instruction text.
    pub fn instruction(&self) -> &str {
        &self.instruction
    }
}

/// An ordered sequence of steps executed against one agent.
#[derive(Debug, Clone)]
pub struct Workflow {
    name: String,
    agent: Arc<Agent>,
    steps: Vec<Step>,
    context_limit: ContextLimit,
}

impl Workflow {
    /// Creates an empty workflow.
    pub fn new(name: impl Into<String>, agent: Arc<Agent>) -> Self {
        Self { name: name.into(), agent, steps: Vec::new(), context_limit: ContextLimit::Unbounded }
    }

    /// Sets the bound on context carried between steps.
    #[must_use]
    pub fn with_context_limit(mut self, limit: ContextLimit) -> Self {
        self.context_limit = limit;
        self
    }

    /// Appends a step.
    ///
    /// # Errors
    /// Rejects an empty name or instruction and a name already in use. A
    /// rejected step leaves the workflow unchanged.
    pub fn add_step(
        &mut self,
        name: impl Into<String>,
        instruction: impl Into<String>,
    ) -> Result<&mut Self, StepDefinitionError> {
        let name = name.into();
        let instruction = instruction.into();

        if name.trim().is_empty() {
            return Err(StepDefinitionError::EmptyName);
        }
        if instruction.trim().is_empty() {
            return Err(StepDefinitionError::EmptyInstruction(name));
        }
        if self.steps.iter().any(|s| s.name == name) {
            return Err(StepDefinitionError::DuplicateName(name));
        }

        debug!(workflow = %self.name, step = %name, position = self.steps.len(), "Step added");
        self.steps.push(Step { name, instruction });
        Ok(self)
    }

    /// Workflow name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Agent executing the steps.
    pub const fn agent(&self) -> &Arc<Agent> {
        &self.agent
    }

    /// Steps in insertion order.
    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    /// Step names in insertion order.
    pub fn step_names(&self) -> impl Iterator<Item = &str> {
        self.steps.iter().map(Step::name)
    }

    /// Number of steps.
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// Returns `true` if the workflow has no steps.
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Configured context bound.
    pub const fn context_limit(&self) -> ContextLimit {
        self.context_limit
    }

    /// Prepares a run that can be given a cancellation token or an event sink.
    pub fn runner(&self) -> WorkflowRun<'_> {
        WorkflowRun::new(self)
    }

    /// Runs every step in order with a fresh context.
    ///
    /// # Errors
    /// `WorkflowRunError::StepFailed` naming the first failing step, with the
    /// results of the steps before it.
    pub async fn run(&self) -> Result<ResultSet, WorkflowRunError> {
        self.runner().execute().await
    }
}
