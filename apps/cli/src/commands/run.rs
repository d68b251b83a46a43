//! Run command implementation.
//!
//! Loads a workflow definition, runs it against the configured agent and
//! prints each step's completion in execution order.

use anyhow::Context;
use colored::Colorize;
use relay_core::{ResultSet, WorkflowRunError};
use std::path::Path;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use super::load_agent;
use crate::workflow_file::WorkflowFile;

/// Executes the run command.
pub async fn execute(config_path: &Path, workflow_path: &Path, json: bool) -> anyhow::Result<()> {
    let agent = Arc::new(load_agent(config_path)?);
    let workflow = WorkflowFile::load(workflow_path)?
        .into_workflow(agent)
        .with_context(|| format!("Invalid workflow: {}", workflow_path.display()))?;

    if !json {
        println!("{}", format!("relay run: {}", workflow.name()).bold().cyan());
        println!("  {} Steps: {}", "•".dimmed(), workflow.len());
        println!();
    }

    let token = CancellationToken::new();
    let ctrl_c = {
        let token = token.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("Interrupt received, cancelling before the next step");
                token.cancel();
            }
        })
    };

    let result = workflow.runner().with_cancellation(token).execute().await;
    ctrl_c.abort();

    match result {
        Ok(results) => {
            if json {
                println!("{}", serde_json::to_string_pretty(&results)?);
            } else {
                print_results(&results);
                println!("{}", format!("Completed {} step(s)", results.len()).green());
            }
            Ok(())
        }
        Err(err) => {
            report_failure(&err, json)?;
            Err(err.into())
        }
    }
}

fn print_results(results: &ResultSet) {
    for output in results {
        println!("{} {}", "▸".cyan(), output.name.bold());
        println!("{}", output.completion);
        println!();
    }
}

fn report_failure(err: &WorkflowRunError, json: bool) -> anyhow::Result<()> {
    match err {
        WorkflowRunError::StepFailed { step, .. } => {
            eprintln!("{} step '{}' failed", "✗".red(), step);
        }
        WorkflowRunError::Cancelled { next_step, .. } => {
            eprintln!("{} cancelled before step '{}'", "✗".yellow(), next_step);
        }
    }

    let partial = err.partial();
    if partial.is_empty() {
        return Ok(());
    }

    if json {
        println!("{}", serde_json::to_string_pretty(partial)?);
    } else {
        println!("{}", format!("Completed before stopping ({}):", partial.len()).dimmed());
        println!();
        print_results(partial);
    }
    Ok(())
}
