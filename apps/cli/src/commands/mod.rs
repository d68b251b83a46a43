//! Subcommand implementations.

pub mod check;
pub mod prompt;
pub mod run;

use anyhow::Context;
use relay_core::{Agent, Configuration};
use std::path::Path;

/// Name the CLI gives its agent.
const AGENT_NAME: &str = "relay";

/// Resolves the configuration file and builds the agent from it.
pub fn load_agent(config_path: &Path) -> anyhow::Result<Agent> {
    let config = Configuration::from_file(config_path)
        .with_context(|| format!("Invalid configuration: {}", config_path.display()))?;
    let agent = Agent::new(AGENT_NAME, config)
        .with_context(|| format!("Failed to create agent from {}", config_path.display()))?;
    Ok(agent)
}
