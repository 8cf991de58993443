//! Validate command - preflight and remote dry-run without importing.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::Args;
use console::{Style, style};
use fusion_domain::{ValidationReport, preflight_path};

use super::{Context, print_json};

/// Arguments for the validate command.
#[derive(Args, Debug)]
pub struct ValidateArgs {
    /// Workflow YAML files
    #[arg(required = true)]
    pub files: Vec<PathBuf>,

    /// Only run local checks; no credentials needed
    #[arg(long)]
    pub preflight_only: bool,
}

/// Run the validate command.
pub fn run(args: ValidateArgs, ctx: &Context) -> Result<ExitCode> {
    let reports: Vec<ValidationReport> = if args.preflight_only {
        args.files.iter().map(|path| preflight_path(path)).collect()
    } else {
        let validation = ctx.services()?.validation();
        args.files
            .iter()
            .map(|path| validation.validate_path(path, false))
            .collect()
    };

    if ctx.json_output {
        print_json(&reports)?;
    } else {
        for report in &reports {
            print_report(report);
        }
    }

    Ok(if reports.iter().all(|r| r.passed) {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn print_report(report: &ValidationReport) {
    let verdict = if report.passed {
        Style::new().green().apply_to("PASS")
    } else {
        Style::new().red().apply_to("FAIL")
    };
    println!();
    println!("  {} {}", style(&report.file).bold(), verdict);
    for message in report.messages() {
        println!("    {}", message);
    }
}
