//! Definitions command - query existing workflow definitions.
//!
//! `check-name` and `check-files` exit 0 when a duplicate exists and 1 when
//! none does, so scripts can write `if fusion definitions check-name X; then`.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context as _, Result};
use clap::{Args, Subcommand};
use console::{Style, style};
use fusion_client::Definition;

use super::{Context, print_header, print_json, truncate};

/// Arguments for the definitions command.
#[derive(Args, Debug)]
pub struct DefinitionsArgs {
    #[command(subcommand)]
    pub command: DefinitionsCommand,
}

#[derive(Subcommand, Debug)]
pub enum DefinitionsCommand {
    /// List all workflow definitions
    List,

    /// Definitions whose name contains a term
    Search {
        /// Term to look for (case-insensitive)
        term: String,
    },

    /// Check whether a workflow name is taken (exit 0 when it is)
    CheckName {
        /// Workflow name
        name: String,
    },

    /// Check local documents for name clashes (exit 0 when any clash)
    CheckFiles {
        /// Workflow YAML files
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },

    /// Export a definition as YAML
    Export {
        /// Definition ID
        id: String,

        /// Write to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

/// Run the definitions command.
pub fn run(args: DefinitionsArgs, ctx: &Context) -> Result<ExitCode> {
    match args.command {
        DefinitionsCommand::List => cmd_list(ctx),
        DefinitionsCommand::Search { term } => cmd_search(&term, ctx),
        DefinitionsCommand::CheckName { name } => cmd_check_name(&name, ctx),
        DefinitionsCommand::CheckFiles { files } => cmd_check_files(&files, ctx),
        DefinitionsCommand::Export { id, output } => cmd_export(&id, output, ctx),
    }
}

fn cmd_list(ctx: &Context) -> Result<ExitCode> {
    let services = ctx.services()?;
    let (definitions, complete) = services.definitions().list()?;

    if ctx.json_output {
        print_json(&definitions)?;
    } else {
        print_definitions(&format!("{} workflow(s)", definitions.len()), &definitions);
        if !complete {
            eprintln!(
                "{}",
                Style::new().yellow().apply_to("Note: the listing is incomplete.")
            );
        }
    }
    Ok(ExitCode::SUCCESS)
}

fn cmd_search(term: &str, ctx: &Context) -> Result<ExitCode> {
    let services = ctx.services()?;
    let found = services.definitions().search(term)?;

    if ctx.json_output {
        print_json(&found)?;
    } else if found.is_empty() {
        println!("{}", Style::new().dim().apply_to(format!("No workflows matching '{}'", term)));
    } else {
        print_definitions(&format!("{} workflow(s) matching '{}'", found.len(), term), &found);
    }
    Ok(ExitCode::SUCCESS)
}

fn print_definitions(title: &str, definitions: &[Definition]) {
    let dim = Style::new().dim();
    print_header(title);
    for definition in definitions {
        let state = match definition.enabled {
            Some(true) => style("enabled").green(),
            Some(false) => style("disabled").yellow(),
            None => style("unknown").dim(),
        };
        println!("  {}  {}", style(truncate(&definition.name, 60)).cyan(), state);
        println!(
            "    {}  {}",
            dim.apply_to(&definition.id),
            dim.apply_to(definition.trigger_type().unwrap_or("-"))
        );
    }
}

fn cmd_check_name(name: &str, ctx: &Context) -> Result<ExitCode> {
    let services = ctx.services()?;
    let matches = services.definitions().find_by_exact_name(name)?;

    if ctx.json_output {
        print_json(&serde_json::json!({
            "name": name,
            "exists": !matches.is_empty(),
            "matches": matches,
        }))?;
    } else if matches.is_empty() {
        println!("Name available: '{}'", name);
    } else {
        let red = Style::new().red();
        for existing in &matches {
            println!(
                "{} '{}' already exists (ID: {})",
                red.apply_to("DUPLICATE:"),
                existing.name,
                existing.id
            );
        }
    }

    Ok(if matches.is_empty() {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    })
}

fn cmd_check_files(files: &[PathBuf], ctx: &Context) -> Result<ExitCode> {
    let services = ctx.services()?;
    let check = services.definitions().check_documents(files)?;

    if ctx.json_output {
        print_json(&check)?;
    } else {
        let red = Style::new().red();
        let dim = Style::new().dim();
        for duplicate in &check.duplicates {
            println!(
                "  {} {}: '{}' already exists (ID: {})",
                red.apply_to("DUPLICATE"),
                duplicate.file,
                duplicate.name,
                duplicate.existing_id
            );
        }
        for clean in &check.clean {
            println!("  {} {}: '{}'", Style::new().green().apply_to("OK"), clean.file, clean.name);
        }
        for skipped in &check.skipped {
            println!("  {} {}: no top-level name found", dim.apply_to("SKIPPED"), skipped);
        }
        if !check.complete {
            eprintln!(
                "{}",
                Style::new()
                    .yellow()
                    .apply_to("Note: the listing was incomplete; some duplicates may be missed.")
            );
        }
    }

    Ok(if check.has_duplicates() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn cmd_export(id: &str, output: Option<PathBuf>, ctx: &Context) -> Result<ExitCode> {
    let services = ctx.services()?;
    let yaml = services.definitions().export(id)?;

    match output {
        Some(path) => {
            std::fs::write(&path, &yaml)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            if ctx.json_output {
                print_json(&serde_json::json!({"id": id, "path": path.display().to_string()}))?;
            } else {
                println!("Exported {} to {}", id, path.display());
            }
        }
        None => print!("{}", yaml),
    }
    Ok(ExitCode::SUCCESS)
}
