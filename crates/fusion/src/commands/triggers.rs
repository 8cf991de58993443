//! Triggers command - workflow trigger types.

use std::process::ExitCode;

use anyhow::{Result, anyhow};
use clap::{Args, Subcommand};
use console::{Style, style};
use fusion_domain::{TriggerCatalog, TriggerSource};

use super::{Context, print_header, print_json, truncate};

/// Arguments for the triggers command.
#[derive(Args, Debug)]
pub struct TriggersArgs {
    #[command(subcommand)]
    pub command: TriggersCommand,
}

#[derive(Subcommand, Debug)]
pub enum TriggersCommand {
    /// List known trigger types
    List,

    /// Show one trigger type with a YAML example
    Show {
        /// Trigger type name (case-insensitive)
        trigger_type: String,
    },
}

/// Run the triggers command.
pub fn run(args: TriggersArgs, ctx: &Context) -> Result<ExitCode> {
    let catalog = load_catalog(ctx);
    match args.command {
        TriggersCommand::List => cmd_list(&catalog, ctx),
        TriggersCommand::Show { trigger_type } => cmd_show(&catalog, &trigger_type, ctx),
    }
}

/// Discovered catalog, or the built-ins when no connection can be made.
fn load_catalog(ctx: &Context) -> TriggerCatalog {
    match ctx.services() {
        Ok(services) => services.triggers(),
        Err(e) => {
            tracing::warn!(error = %e, "Cannot reach the API, showing built-in trigger types only");
            TriggerCatalog::built_in()
        }
    }
}

fn cmd_list(catalog: &TriggerCatalog, ctx: &Context) -> Result<ExitCode> {
    if ctx.json_output {
        print_json(&catalog.triggers)?;
        return Ok(ExitCode::SUCCESS);
    }

    let dim = Style::new().dim();
    print_header("Trigger types");
    for trigger in &catalog.triggers {
        let source = match trigger.source {
            TriggerSource::BuiltIn => "",
            TriggerSource::Api => " [api]",
        };
        println!("  {}{}", style(&trigger.name).cyan(), dim.apply_to(source));
        if !trigger.description.is_empty() {
            println!("    {}", dim.apply_to(truncate(&trigger.description, 90)));
        }
    }
    Ok(ExitCode::SUCCESS)
}

fn cmd_show(catalog: &TriggerCatalog, name: &str, ctx: &Context) -> Result<ExitCode> {
    let trigger = catalog.find(name).ok_or_else(|| {
        anyhow!(
            "Unknown trigger type '{}'. Known types: {}",
            name,
            catalog.names().join(", ")
        )
    })?;

    if ctx.json_output {
        print_json(trigger)?;
        return Ok(ExitCode::SUCCESS);
    }

    let dim = Style::new().dim();
    print_header(&trigger.name);
    if !trigger.description.is_empty() {
        println!("  {}", trigger.description);
    }
    if let Some(id) = &trigger.api_id {
        println!("  {} {}", dim.apply_to("ID:"), id);
    }
    match &trigger.yaml_example {
        Some(yaml) => {
            println!();
            println!("{}", style("Example").bold());
            for line in yaml.lines() {
                println!("  {}", line);
            }
        }
        None => println!("  {}", dim.apply_to("(no example available)")),
    }
    Ok(ExitCode::SUCCESS)
}
