//! Prompt command implementation.

use std::path::Path;

use super::load_agent;

/// Sends `text` to the configured agent and prints the completion.
pub async fn execute(config_path: &Path, text: &str) -> anyhow::Result<()> {
    let agent = load_agent(config_path)?;
    let completion = agent.prompt(text).await?;
    println!("{}", completion);
    Ok(())
}
