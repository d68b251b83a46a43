//! Per-run workflow results.

use chrono::{DateTime, Utc};
use relay_abstraction::Usage;
use serde::ser::{Serialize, SerializeMap, Serializer};

/// Output of one completed step.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct StepOutput {
    /// Step name.
    pub name: String,
    /// Completion text returned for the step.
    pub completion: String,
    /// Token usage, when the provider reported it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usage: Option<Usage>,
    /// Timestamp when the step was dispatched.
    pub started_at: DateTime<Utc>,
    /// Duration of the model call in milliseconds.
    pub duration_ms: u64,
}

/// Ordered mapping from step name to completion, in execution order.
///
/// Created fresh for every run. Serializes as a JSON object whose keys keep
/// execution order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResultSet {
    outputs: Vec<StepOutput>,
}

impl ResultSet {
    pub(crate) fn push(&mut self, output: StepOutput) {
        self.outputs.push(output);
    }

    /// Completion text for `name`.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.output(name).map(|o| o.completion.as_str())
    }

    /// Full output record for `name`.
    pub fn output(&self, name: &str) -> Option<&StepOutput> {
        self.outputs.iter().find(|o| o.name == name)
    }

    /// Outputs in execution order.
    pub fn iter(&self) -> std::slice::Iter<'_, StepOutput> {
        self.outputs.iter()
    }

    /// Step names in execution order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.outputs.iter().map(|o| o.name.as_str())
    }

    /// `(name, completion)` pairs in execution order.
    pub fn entries(&self) -> impl Iterator<Item = (&str, &str)> {
        self.outputs.iter().map(|o| (o.name.as_str(), o.completion.as_str()))
    }

    /// Number of completed steps.
    pub fn len(&self) -> usize {
        self.outputs.len()
    }

    /// Returns `true` if no step completed.
    pub fn is_empty(&self) -> bool {
        self.outputs.is_empty()
    }

    /// Returns `true` if every one of `step_count` steps completed.
    pub fn is_complete(&self, step_count: usize) -> bool {
        self.outputs.len() == step_count
    }

    /// Sum of reported token usage across steps.
    pub fn total_tokens(&self) -> u32 {
        self.outputs.iter().filter_map(|o| o.usage).map(|u| u.total_tokens).sum()
    }

    /// Output records, consuming the set.
    pub fn into_outputs(self) -> Vec<StepOutput> {
        self.outputs
    }
}

impl<'a> IntoIterator for &'a ResultSet {
    type Item = &'a StepOutput;
    type IntoIter = std::slice::Iter<'a, StepOutput>;

    fn into_iter(self) -> Self::IntoIter {
        self.outputs.iter()
    }
}

impl Serialize for ResultSet {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.outputs.len()))?;
        for output in &self.outputs {
            map.serialize_entry(&output.name, &output.completion)?;
        }
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn output(name: &str, completion: &str, tokens: Option<u32>) -> StepOutput {
        StepOutput {
            name: name.to_string(),
            completion: completion.to_string(),
            usage: tokens.map(|t| Usage { prompt_tokens: 0, completion_tokens: t, total_tokens: t }),
            started_at: Utc::now(),
            duration_ms: 0,
        }
    }

    #[test]
    fn test_result_set_keeps_insertion_order() {
        let mut results = ResultSet::default();
        results.push(output("zeta", "1", None));
        results.push(output("alpha", "2", None));
        results.push(output("mid", "3", None));

        assert_eq!(results.names().collect::<Vec<_>>(), vec!["zeta", "alpha", "mid"]);
        assert_eq!(results.get("alpha"), Some("2"));
        assert_eq!(results.get("missing"), None);
        assert!(results.is_complete(3));
        assert!(!results.is_complete(4));
    }

    #[test]
    fn test_result_set_serializes_as_ordered_object() {
        let mut results = ResultSet::default();
        results.push(output("zeta", "1", None));
        results.push(output("alpha", "2", None));

        let json = serde_json::to_string(&results).unwrap();
        assert_eq!(json, r#"{"zeta":"1","alpha":"2"}"#);
    }

    #[test]
    fn test_total_tokens_skips_missing_usage() {
        let mut results = ResultSet::default();
        results.push(output("a", "x", Some(5)));
        results.push(output("b", "y", None));
        results.push(output("c", "z", Some(7)));
        assert_eq!(results.total_tokens(), 12);
    }
}
