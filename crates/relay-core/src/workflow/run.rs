//! A single execution of a workflow.

use std::time::Instant;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc::UnboundedSender;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::context::ExecutionContext;
use super::result::{ResultSet, StepOutput};
use super::Workflow;
use crate::aggregator::ChainResponseAggregator;
use crate::error::WorkflowRunError;
use crate::events::{WorkflowEvent, send_event};

/// Lifecycle of one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
    /// `execute` has not been called.
    NotStarted,
    /// Steps are being dispatched.
    Running,
    /// Every step completed.
    Completed,
    /// A step failed.
    Failed,
    /// The run was cancelled between steps.
    Cancelled,
}

impl RunState {
    /// Returns `true` for `Completed`, `Failed` and `Cancelled`.
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled)
    }
}

/// One run of a [`Workflow`], with optional cancellation and progress events.
///
/// Every call to [`WorkflowRun::execute`] starts again from the first step
/// with an empty context.
#[derive(Debug)]
pub struct WorkflowRun<'a> {
    workflow: &'a Workflow,
    cancel: Option<CancellationToken>,
    events: Option<UnboundedSender<WorkflowEvent>>,
    state: RunState,
}

impl<'a> WorkflowRun<'a> {
    pub(super) const fn new(workflow: &'a Workflow) -> Self {
        Self { workflow, cancel: None, events: None, state: RunState::NotStarted }
    }

    /// Checks `token` before dispatching each step.
    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    /// Sends progress events to `sender`.
    #[must_use]
    pub fn with_events(mut self, sender: UnboundedSender<WorkflowEvent>) -> Self {
        self.events = Some(sender);
        self
    }

    /// Current state.
    pub const fn state(&self) -> RunState {
        self.state
    }

    fn is_cancelled(&self) -> bool {
        self.cancel.as_ref().is_some_and(CancellationToken::is_cancelled)
    }

    /// Runs every step in order.
    ///
    /// # Errors
    /// `StepFailed` at the first failing step, `Cancelled` if the token fired
    /// before a step was dispatched. Both carry the results gathered so far.
    pub async fn execute(&mut self) -> Result<ResultSet, WorkflowRunError> {
        let workflow = self.workflow;
        let name = workflow.name();
        let total = workflow.len();
        let events = self.events.clone();

        info!(workflow = %name, step_count = total, "Starting workflow run");

        self.state = RunState::Running;
        let run_started = Instant::now();
        let mut context = ExecutionContext::new(workflow.context_limit());
        let mut results = ResultSet::default();
        let mut aggregator = ChainResponseAggregator::new(name, total);

        for (index, step) in workflow.steps().iter().enumerate() {
            if self.is_cancelled() {
                warn!(
                    workflow = %name,
                    next_step = %step.name(),
                    step_index = index,
                    completed = results.len(),
                    "Workflow run cancelled"
                );
                self.state = RunState::Cancelled;
                send_event(events.as_ref(), WorkflowEvent::Cancelled {
                    workflow: name.to_string(),
                    next_step: step.name().to_string(),
                    index,
                });
                return Err(WorkflowRunError::Cancelled {
                    next_step: step.name().to_string(),
                    index,
                    partial: results,
                });
            }

            send_event(events.as_ref(), WorkflowEvent::StepStart {
                workflow: name.to_string(),
                step: step.name().to_string(),
                index,
                total,
            });

            let prompt = context.prompt_for(step.instruction());

            debug!(
                workflow = %name,
                step = %step.name(),
                step_index = index,
                total_steps = total,
                prompt_len = prompt.len(),
                context_len = context.as_str().len(),
                "Executing workflow step"
            );

            send_event(events.as_ref(), WorkflowEvent::StepProgress {
                workflow: name.to_string(),
                step: step.name().to_string(),
                prompt_len: prompt.len(),
                context_truncated: context.was_truncated(),
            });

            let started_at = Utc::now();
            let step_started = Instant::now();

            let completion = match workflow.agent().complete(&prompt).await {
                Ok(completion) => completion,
                Err(source) => {
                    error!(
                        workflow = %name,
                        step = %step.name(),
                        step_index = index,
                        error = %source,
                        "Workflow step failed, stopping run"
                    );
                    self.state = RunState::Failed;
                    send_event(events.as_ref(), WorkflowEvent::Error {
                        workflow: name.to_string(),
                        step: step.name().to_string(),
                        index,
                        message: source.to_string(),
                    });
                    return Err(WorkflowRunError::StepFailed {
                        step: step.name().to_string(),
                        index,
                        source,
                        partial: results,
                    });
                }
            };

            let duration_ms = u64::try_from(step_started.elapsed().as_millis()).unwrap_or(u64::MAX);

            context.append(&completion.content);
            aggregator.add_response(step.name(), completion.content.as_str());

            send_event(events.as_ref(), WorkflowEvent::StepComplete {
                workflow: name.to_string(),
                step: step.name().to_string(),
                index,
                completion: completion.content.clone(),
                duration_ms,
            });

            info!(
                workflow = %name,
                step = %step.name(),
                step_index = index,
                duration_ms,
                "Workflow step completed"
            );

            results.push(StepOutput {
                name: step.name().to_string(),
                completion: completion.content,
                usage: completion.usage,
                started_at,
                duration_ms,
            });
        }

        self.state = RunState::Completed;
        if aggregator.should_send() {
            send_event(events.as_ref(), WorkflowEvent::ChainComplete(aggregator.take_aggregated()));
        }

        info!(
            workflow = %name,
            step_count = total,
            total_tokens = results.total_tokens(),
            duration_ms = u64::try_from(run_started.elapsed().as_millis()).unwrap_or(u64::MAX),
            "Workflow run completed"
        );

        Ok(results)
    }
}
