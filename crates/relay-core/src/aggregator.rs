//! Aggregation of per-step responses for a whole workflow.

use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;

/// Collected responses of a completed chain of steps.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AggregatedResponse {
    /// Workflow name.
    pub chain: String,
    /// `(step, response)` pairs in the order they were recorded.
    #[serde(serialize_with = "serialize_ordered")]
    pub responses: Vec<(String, String)>,
}

impl AggregatedResponse {
    /// Response recorded for `step`.
    pub fn get(&self, step: &str) -> Option<&str> {
        self.responses.iter().find(|(name, _)| name == step).map(|(_, text)| text.as_str())
    }
}

fn serialize_ordered<S: Serializer>(
    responses: &[(String, String)],
    serializer: S,
) -> Result<S::Ok, S::Error> {
    let mut map = serializer.serialize_map(Some(responses.len()))?;
    for (name, text) in responses {
        map.serialize_entry(name, text)?;
    }
    map.end()
}

/// Collects step responses and reports when the chain is ready to be sent.
///
/// The aggregate is handed out at most once.
#[derive(Debug, Clone)]
pub struct ChainResponseAggregator {
    chain_name: String,
    total_steps: usize,
    responses: Vec<(String, String)>,
    completed: usize,
    sent: bool,
}

impl ChainResponseAggregator {
    /// Creates an aggregator expecting `total_steps` responses.
    pub fn new(chain_name: impl Into<String>, total_steps: usize) -> Self {
        Self {
            chain_name: chain_name.into(),
            total_steps,
            responses: Vec::with_capacity(total_steps),
            completed: 0,
            sent: false,
        }
    }

    /// Records a response. A repeated step name replaces the earlier text.
    pub fn add_response(&mut self, step: impl Into<String>, response: impl Into<String>) {
        let step = step.into();
        let response = response.into();
        match self.responses.iter_mut().find(|(name, _)| *name == step) {
            Some(entry) => entry.1 = response,
            None => self.responses.push((step, response)),
        }
        self.completed += 1;
    }

    /// Number of responses recorded so far.
    pub const fn completed(&self) -> usize {
        self.completed
    }

    /// `true` once every expected response arrived and the aggregate was not yet taken.
    pub const fn should_send(&self) -> bool {
        !self.sent && self.completed >= self.total_steps
    }

    /// Returns the aggregate and marks it as sent.
    pub fn take_aggregated(&mut self) -> AggregatedResponse {
        self.sent = true;
        AggregatedResponse { chain: self.chain_name.clone(), responses: self.responses.clone() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_aggregator_sends_once_when_complete() {
        let mut agg = ChainResponseAggregator::new("chain", 2);
        agg.add_response("a", "one");
        assert!(!agg.should_send());

        agg.add_response("b", "two");
        assert!(agg.should_send());

        let response = agg.take_aggregated();
        assert_eq!(response.chain, "chain");
        assert_eq!(response.get("a"), Some("one"));
        assert_eq!(response.get("b"), Some("two"));
        assert!(!agg.should_send());
    }

    #[test]
    fn test_aggregator_repeated_step_replaces_text() {
        let mut agg = ChainResponseAggregator::new("chain", 2);
        agg.add_response("a", "first");
        agg.add_response("a", "second");
        assert_eq!(agg.completed(), 2);
        assert!(agg.should_send());
        assert_eq!(agg.take_aggregated().responses, vec![("a".to_string(), "second".to_string())]);
    }

    #[test]
    fn test_empty_chain_is_ready_immediately() {
        let agg = ChainResponseAggregator::new("empty", 0);
        assert!(agg.should_send());
    }

    #[test]
    fn test_aggregated_response_json_keeps_order() {
        let mut agg = ChainResponseAggregator::new("c", 2);
        agg.add_response("second", "2");
        agg.add_response("first", "1");
        let json = serde_json::to_string(&agg.take_aggregated()).unwrap();
        assert_eq!(json, r#"{"chain":"c","responses":{"second":"2","first":"1"}}"#);
    }
}
