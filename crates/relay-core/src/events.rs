//! Progress events emitted while a workflow runs.
//!
//! Events serialize as `{"event": "<kind>", "data": {...}}`, the shape used by
//! server-sent event streams, so a front end can forward them unchanged.

use serde::Serialize;
use tokio::sync::mpsc::UnboundedSender;
use tracing::trace;

use crate::aggregator::AggregatedResponse;

/// A workflow progress event.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum WorkflowEvent {
    /// A step is about to be dispatched.
    StepStart {
        /// Workflow name.
        workflow: String,
        /// Step name.
        step: String,
        /// Zero-based step position.
        index: usize,
        /// Total number of steps.
        total: usize,
    },

    /// The effective prompt for a step was composed.
    StepProgress {
        /// Workflow name.
        workflow: String,
        /// Step name.
        step: String,
        /// Length of the composed prompt in bytes.
        prompt_len: usize,
        /// Whether older context was dropped to honor the context bound.
        context_truncated: bool,
    },

    /// A step completed.
    StepComplete {
        /// Workflow name.
        workflow: String,
        /// Step name.
        step: String,
        /// Zero-based step position.
        index: usize,
        /// Completion text.
        completion: String,
        /// Model call duration in milliseconds.
        duration_ms: u64,
    },

    /// Every step completed.
    ChainComplete(AggregatedResponse),

    /// A step failed and the run stopped.
    Error {
        /// Workflow name.
        workflow: String,
        /// Step name.
        step: String,
        /// Zero-based step position.
        index: usize,
        /// Error message.
        message: String,
    },

    /// The run was cancelled before a step.
    Cancelled {
        /// Workflow name.
        workflow: String,
        /// Step that was not started.
        next_step: String,
        /// Its zero-based position.
        index: usize,
    },
}

impl WorkflowEvent {
    /// Event kind as it appears in the `event` field.
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::StepStart { .. } => "step_start",
            Self::StepProgress { .. } => "step_progress",
            Self::StepComplete { .. } => "step_complete",
            Self::ChainComplete(_) => "chain_complete",
            Self::Error { .. } => "error",
            Self::Cancelled { .. } => "cancelled",
        }
    }
}

/// Sends `event` to `sender`, if there is one and it is still listening.
pub fn send_event(sender: Option<&UnboundedSender<WorkflowEvent>>, event: WorkflowEvent) {
    if let Some(sender) = sender {
        if sender.send(event).is_err() {
            trace!("Workflow event receiver dropped");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tokio::sync::mpsc;

    #[test]
    fn test_event_wire_shape() {
        let event = WorkflowEvent::StepStart {
            workflow: "wf".to_string(),
            step: "a".to_string(),
            index: 0,
            total: 2,
        };
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(
            value,
            json!({"event": "step_start", "data": {"workflow": "wf", "step": "a", "index": 0, "total": 2}})
        );
        assert_eq!(event.kind(), "step_start");
    }

    #[test]
    fn test_chain_complete_wire_shape() {
        let event = WorkflowEvent::ChainComplete(AggregatedResponse {
            chain: "wf".to_string(),
            responses: vec![("a".to_string(), "OK".to_string())],
        });
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value, json!({"event": "chain_complete", "data": {"chain": "wf", "responses": {"a": "OK"}}}));
    }

    #[test]
    fn test_send_event_without_subscriber() {
        send_event(None, WorkflowEvent::Cancelled {
            workflow: "wf".to_string(),
            next_step: "a".to_string(),
            index: 0,
        });
    }

    #[test]
    fn test_send_event_to_dropped_receiver() {
        let (tx, rx) = mpsc::unbounded_channel();
        drop(rx);
        send_event(Some(&tx), WorkflowEvent::Cancelled {
            workflow: "wf".to_string(),
            next_step: "a".to_string(),
            index: 0,
        });
    }

    #[test]
    fn test_send_event_delivers() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        send_event(Some(&tx), WorkflowEvent::Cancelled {
            workflow: "wf".to_string(),
            next_step: "a".to_string(),
            index: 0,
        });
        assert_eq!(rx.try_recv().map(|e| e.kind()), Ok("cancelled"));
    }
}
