//! fusion - Falcon Fusion workflow tooling
//!
//! Main entry point for the fusion CLI.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context as _, Result};
use clap::{Parser, Subcommand};
use console::Style;

mod commands;

use commands::{actions, auth, definitions, execute, import, triggers, validate};

// ─────────────────────────────────────────────────────────────────────────────
// CLI Structure
// ─────────────────────────────────────────────────────────────────────────────

/// fusion - search, validate, import and run Falcon Fusion workflows
#[derive(Parser)]
#[command(name = "fusion")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output as JSON (for scripting)
    #[arg(long, global = true)]
    pub json: bool,

    /// Path to a .env file holding CS_CLIENT_ID / CS_CLIENT_SECRET
    #[arg(long, global = true, value_name = "PATH")]
    pub env_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Search and browse the action catalog
    Actions(actions::ActionsArgs),

    /// Show workflow trigger types
    Triggers(triggers::TriggersArgs),

    /// Query existing workflow definitions
    Definitions(definitions::DefinitionsArgs),

    /// Validate workflow documents without importing them
    Validate(validate::ValidateArgs),

    /// Import workflow documents
    Import(import::ImportArgs),

    /// Execute a workflow definition
    Execute(execute::ExecuteArgs),

    /// Credential checks
    Auth(auth::AuthArgs),
}

// ─────────────────────────────────────────────────────────────────────────────
// Main
// ─────────────────────────────────────────────────────────────────────────────

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Keep the guard alive so buffered file logs are flushed on exit.
    let _guard = init_tracing(cli.verbose);

    match run(cli) {
        Ok(code) => code,
        Err(e) => {
            let red = Style::new().red();
            eprintln!("{} {:#}", red.apply_to("Error:"), e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<ExitCode> {
    fusion_config::load_env_file(cli.env_file.as_deref()).context("Failed to load .env file")?;

    let loaded = fusion_config::load_config(None);
    for warning in &loaded.warnings {
        tracing::warn!("{}", warning);
    }
    tracing::debug!(sources = ?loaded.loaded_from(), "Configuration loaded");

    let ctx = commands::Context::new(loaded.config, cli.json, cli.verbose);

    let result = match cli.command {
        Commands::Actions(args) => actions::run(args, &ctx),
        Commands::Triggers(args) => triggers::run(args, &ctx),
        Commands::Definitions(args) => definitions::run(args, &ctx),
        Commands::Validate(args) => validate::run(args, &ctx),
        Commands::Import(args) => import::run(args, &ctx),
        Commands::Execute(args) => execute::run(args, &ctx),
        Commands::Auth(args) => auth::run(args, &ctx),
    };
    ctx.finish_progress();
    result
}

/// Console layer on stderr plus a rotating JSON file under the config dir.
fn init_tracing(verbose: bool) -> tracing_appender::non_blocking::WorkerGuard {
    let filter = if verbose {
        "fusion=debug,fusion_client=debug,fusion_domain=debug,fusion_oauth=debug,fusion_config=debug,info"
    } else {
        "fusion=info,warn"
    };

    let log_dir = fusion_config::xdg_config_dir()
        .map(|d| d.join("logs"))
        .unwrap_or_else(|| PathBuf::from("logs"));
    let file_appender = tracing_appender::rolling::daily(&log_dir, "fusion.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    use tracing_subscriber::prelude::*;
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(verbose)
                .with_writer(std::io::stderr)
                .with_filter(tracing_subscriber::EnvFilter::new(filter)),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_writer(non_blocking)
                .with_filter(tracing_subscriber::EnvFilter::new(
                    "fusion=trace,fusion_client=trace,fusion_domain=trace,fusion_oauth=debug,fusion_config=debug,info",
                )),
        )
        .init();

    guard
}
