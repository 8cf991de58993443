//! Execute command - run a workflow definition and optionally wait for it.

use std::io::IsTerminal;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context as _, Result};
use clap::Args;
use console::{Style, Term, style};
use fusion_domain::{
    DomainError, DomainServices, ExecutionStatus, PollOutcome, collect_params, parse_params_json,
};
use serde_json::{Map, Value};

use super::{Context, print_json};

/// Arguments for the execute command.
#[derive(Args, Debug)]
pub struct ExecuteArgs {
    /// Definition ID
    pub definition_id: String,

    /// Parameters as a JSON object; prompted from the schema when omitted
    #[arg(short, long)]
    pub params: Option<String>,

    /// Poll until the execution finishes
    #[arg(short, long)]
    pub wait: bool,

    /// Seconds to wait before giving up (default from config, 120)
    #[arg(long)]
    pub timeout: Option<u64>,

    /// Seconds between status checks (default from config, 5)
    #[arg(long)]
    pub interval: Option<u64>,
}

/// Run the execute command.
pub fn run(args: ExecuteArgs, ctx: &Context) -> Result<ExitCode> {
    let services = ctx.services()?;
    let params = match &args.params {
        Some(raw) => parse_params_json(raw)?,
        None if std::io::stdin().is_terminal() => prompt_params(&services, &args.definition_id)?,
        None => Map::new(),
    };

    let dim = Style::new().dim();
    if !ctx.json_output {
        println!("  Executing workflow {}", args.definition_id);
        println!("  Parameters: {}", serde_json::to_string_pretty(&params)?);
    }

    let mut poller = services.poller();
    if !ctx.json_output {
        poller = poller.with_observer(Arc::new(|status: &str, elapsed: Duration| {
            eprintln!("    Status: {} ({}s elapsed)", status, elapsed.as_secs());
        }));
    }

    let mut handle = poller
        .submit(&args.definition_id, &params)
        .context("Execution FAILED")?;

    if !args.wait {
        if ctx.json_output {
            print_json(&serde_json::json!({
                "execution_id": handle.execution_id,
                "definition_id": handle.definition_id,
                "status": handle.status,
            }))?;
        } else {
            println!("  Execution ID: {}", handle.execution_id);
            println!();
            println!("  {}", dim.apply_to("Execution submitted. Use --wait to poll for results."));
        }
        return Ok(ExitCode::SUCCESS);
    }

    let settings = ctx.poll_settings(args.timeout, args.interval);
    if !ctx.json_output {
        println!("  Execution ID: {}", handle.execution_id);
        println!();
        println!("  Polling for results (timeout: {}s)...", settings.timeout.as_secs());
    }

    match poller.poll(&mut handle, settings) {
        PollOutcome::Terminal(result) => {
            if ctx.json_output {
                print_json(&result)?;
            } else {
                let status = match handle.status {
                    ExecutionStatus::Completed => style(result.status.as_str()).green(),
                    _ => style(result.status.as_str()).red(),
                };
                println!();
                println!("  Execution {}", status);
                if let Some(output) = result.output.as_ref().filter(|o| !is_empty_json(o)) {
                    println!("  Output:");
                    println!("{}", serde_json::to_string_pretty(output)?);
                }
            }
            Ok(if handle.status == ExecutionStatus::Completed {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            })
        }
        PollOutcome::TimedOut { checks, elapsed } => {
            if ctx.json_output {
                print_json(&serde_json::json!({
                    "execution_id": handle.execution_id,
                    "status": handle.status,
                    "checks": checks,
                    "elapsed_secs": elapsed.as_secs(),
                }))?;
            } else {
                println!(
                    "  Timeout after {}s; execution may still be running.",
                    settings.timeout.as_secs()
                );
            }
            Ok(ExitCode::FAILURE)
        }
    }
}

/// Prompt for each declared parameter, or for raw JSON without a schema.
fn prompt_params(services: &DomainServices, definition_id: &str) -> Result<Map<String, Value>> {
    let term = Term::stderr();
    let schema = match services.definitions().parameter_schema(definition_id) {
        Ok(schema) => schema,
        Err(DomainError::NotFound(_)) => Default::default(),
        Err(e) => {
            tracing::warn!(error = %e, "Could not load the parameter schema");
            Default::default()
        }
    };

    if schema.is_empty() {
        term.write_line("  No parameter schema found. Enter JSON manually:")?;
        term.write_str("  > ")?;
        let raw = term.read_line()?;
        return Ok(parse_params_json(&raw)?);
    }

    term.write_line("")?;
    term.write_line("  Enter parameter values (leave blank for optional fields):")?;
    term.write_line("")?;
    let params = collect_params(&schema, |prompt| {
        term.write_str(&format!("  {}", prompt)).ok()?;
        term.read_line().ok()
    })?;
    Ok(params)
}

fn is_empty_json(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Object(map) => map.is_empty(),
        Value::Array(items) => items.is_empty(),
        _ => false,
    }
}
