//! Auth command - credential checks.

use std::process::ExitCode;

use anyhow::Result;
use clap::{Args, Subcommand};
use console::Style;
use fusion_oauth::{ClientCredentialsProvider, TokenProvider, mask_secret};
use serde::Serialize;

use super::{Context, print_json};

/// Arguments for the auth command.
#[derive(Args, Debug)]
pub struct AuthArgs {
    #[command(subcommand)]
    pub command: AuthCommand,
}

#[derive(Subcommand, Debug)]
pub enum AuthCommand {
    /// Resolve credentials and request a bearer token
    Check,
}

/// Auth check output for JSON.
#[derive(Debug, Serialize)]
struct CheckOutput {
    client_id: String,
    base_url: String,
    authenticated: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

/// Run the auth command.
pub fn run(args: AuthArgs, ctx: &Context) -> Result<ExitCode> {
    match args.command {
        AuthCommand::Check => cmd_check(ctx),
    }
}

fn cmd_check(ctx: &Context) -> Result<ExitCode> {
    let credentials = fusion_config::resolve_credentials(&ctx.config)?;
    let client_id = mask_secret(&credentials.client_id);
    let base_url = credentials.base_url.clone();

    let provider = ClientCredentialsProvider::new(credentials)?;
    let outcome = provider.access_token();

    if ctx.json_output {
        print_json(&CheckOutput {
            client_id,
            base_url,
            authenticated: outcome.is_ok(),
            error: outcome.as_ref().err().map(|e| e.to_string()),
        })?;
    } else {
        let dim = Style::new().dim();
        println!("  {} {}", dim.apply_to("Client ID:"), client_id);
        println!("  {} {}", dim.apply_to("Base URL: "), base_url);
        match &outcome {
            Ok(_) => println!("  {}", Style::new().green().apply_to("Authentication OK")),
            Err(e) => println!(
                "  {} {}",
                Style::new().red().apply_to("Authentication FAILED:"),
                e
            ),
        }
    }

    Ok(if outcome.is_ok() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}
