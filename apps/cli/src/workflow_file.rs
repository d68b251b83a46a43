//! Workflow definition files.
//!
//! ```toml
//! name = "energy-report"
//! max_context_chars = 8000
//!
//! [[steps]]
//! name = "research"
//! instruction = "Research renewable energy"
//!
//! [[steps]]
//! name = "analysis"
//! instruction = "Analyse the data collected in the previous step"
//! ```

use anyhow::{Context, bail};
use relay_core::{Agent, ContextLimit, Workflow};
use serde::Deserialize;
use std::path::Path;
use std::sync::Arc;

/// A workflow as written on disk.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WorkflowFile {
    /// Workflow name.
    pub name: String,
    /// Optional bound on context carried between steps.
    #[serde(default)]
    pub max_context_chars: Option<usize>,
    /// Steps in execution order.
    #[serde(default)]
    pub steps: Vec<StepEntry>,
}

/// One `[[steps]]` entry.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StepEntry {
    /// Step name.
    pub name: String,
    /// Instruction text.
    pub instruction: String,
}

impl WorkflowFile {
    /// Loads a TOML or YAML workflow file.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read workflow file: {}", path.display()))?;

        let extension =
            path.extension().and_then(|e| e.to_str()).map(str::to_lowercase).unwrap_or_default();

        let file: Self = match extension.as_str() {
            "toml" => toml::from_str(&content)
                .with_context(|| format!("Failed to parse workflow file: {}", path.display()))?,
            "yaml" | "yml" => serde_yaml::from_str(&content)
                .with_context(|| format!("Failed to parse workflow file: {}", path.display()))?,
            other => bail!("Unsupported workflow file format '{}' (expected toml, yaml or yml)", other),
        };

        if file.steps.is_empty() {
            bail!("Workflow '{}' has no steps", file.name);
        }
        Ok(file)
    }

    /// Builds the workflow, rejecting duplicate or blank steps.
    pub fn into_workflow(self, agent: Arc<Agent>) -> anyhow::Result<Workflow> {
        let limit = self.max_context_chars.map_or(ContextLimit::Unbounded, ContextLimit::MaxChars);
        let mut workflow = Workflow::new(self.name, agent).with_context_limit(limit);
        for step in self.steps {
            workflow.add_step(step.name, step.instruction)?;
        }
        Ok(workflow)
    }
}
