//! Check command implementation.
//!
//! Resolves a configuration and prints what an agent would use, without
//! contacting the provider.

use anyhow::Context;
use colored::Colorize;
use relay_core::Configuration;
use std::path::Path;

/// Validates the configuration file and prints a summary.
pub fn execute(config_path: &Path) -> anyhow::Result<()> {
    let config = Configuration::from_file(config_path)
        .with_context(|| format!("Invalid configuration: {}", config_path.display()))?;

    println!("{}", "relay check".bold().cyan());
    println!();
    println!("  {} Provider: {}", "•".dimmed(), config.provider().to_string().cyan());
    println!("  {} Model: {}", "•".dimmed(), config.model().cyan());
    if let Some(endpoint) = config.endpoint() {
        println!("  {} Endpoint: {}", "•".dimmed(), endpoint);
    }
    if let Some(azure) = config.azure() {
        if let Some(resource) = &azure.resource_name {
            println!("  {} Azure resource: {}", "•".dimmed(), resource);
        }
        let auth = if azure.use_default_credential { "default credential" } else { "api key" };
        println!("  {} Azure auth: {}", "•".dimmed(), auth);
    }

    let credential = if !config.requires_credential() {
        "not required".dimmed()
    } else if config.has_credential() {
        "configured".green()
    } else {
        "missing".red()
    };
    println!("  {} Credential: {}", "•".dimmed(), credential);

    let params = config.params();
    println!(
        "  {} Params: temperature={} top_p={} max_tokens={}",
        "•".dimmed(),
        params.temperature.map_or_else(|| "-".to_string(), |t| t.to_string()),
        params.top_p.map_or_else(|| "-".to_string(), |p| p.to_string()),
        params.max_tokens.map_or_else(|| "-".to_string(), |m| m.to_string()),
    );
    println!();
    println!("{}", "Configuration is valid".green());
    Ok(())
}
