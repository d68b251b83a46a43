//! Relay CLI - run agent prompts and multi-step workflows from the terminal.
//!
//! This CLI provides a `relay` command that loads an agent configuration file
//! and either sends a single prompt or runs a workflow definition against it.

mod commands;
mod workflow_file;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use commands::{check, prompt, run};

/// Relay - sequential agent workflows over OpenAI-compatible models
#[derive(Parser, Debug)]
#[command(
    name = "relay",
    author,
    version,
    about = "Relay - sequential agent workflows",
    long_about = "Relay binds an agent to a model provider and runs multi-step workflows where every step sees the output of the steps before it."
)]
struct Args {
    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "warn", global = true)]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Send one prompt to the configured agent
    Prompt {
        /// Agent configuration file (.toml, .yaml or .yml)
        #[arg(short, long)]
        config: PathBuf,

        /// Prompt text
        text: String,
    },

    /// Run a workflow definition
    ///
    /// Steps run in order; each step receives the completions of the steps
    /// before it. Ctrl-C cancels before the next step is dispatched.
    Run {
        /// Agent configuration file (.toml, .yaml or .yml)
        #[arg(short, long)]
        config: PathBuf,

        /// Workflow definition file (.toml, .yaml or .yml)
        #[arg(short, long)]
        workflow: PathBuf,

        /// Print the results as a JSON object
        #[arg(long)]
        json: bool,
    },

    /// Resolve and validate a configuration without calling the model
    Check {
        /// Agent configuration file (.toml, .yaml or .yml)
        #[arg(short, long)]
        config: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let level = match args.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .without_time()
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    match args.command {
        Command::Prompt { config, text } => prompt::execute(&config, &text).await,
        Command::Run { config, workflow, json } => run::execute(&config, &workflow, json).await,
        Command::Check { config } => check::execute(&config),
    }
}
