//! Import command - duplicate check, validation and import for a batch.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::Args;
use console::{Style, style};
use fusion_domain::{BatchReport, ImportItem, ImportOptions, ImportStatus, IndexStatus};

use super::{Context, print_json};

/// Arguments for the import command.
#[derive(Args, Debug)]
pub struct ImportArgs {
    /// Workflow YAML files, imported in order
    #[arg(required = true)]
    pub files: Vec<PathBuf>,

    /// Import without the preflight and remote dry-run
    #[arg(long)]
    pub skip_validate: bool,

    /// Import even when a workflow with the same name exists
    #[arg(long)]
    pub skip_duplicate_check: bool,
}

/// Run the import command. Exits 1 when any item is a duplicate or failed.
pub fn run(args: ImportArgs, ctx: &Context) -> Result<ExitCode> {
    let services = ctx.services()?;
    let options = ImportOptions {
        skip_validate: args.skip_validate,
        skip_duplicate_check: args.skip_duplicate_check,
    };
    let report = services.importer().run(&args.files, options);

    if ctx.json_output {
        print_json(&report)?;
    } else {
        print_index_status(&report.index);
        for item in &report.items {
            print_item(item);
        }
        print_summary(&report);
    }

    Ok(if report.has_failures() {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    })
}

fn print_index_status(index: &IndexStatus) {
    let yellow = Style::new().yellow();
    match index {
        IndexStatus::Skipped => {}
        IndexStatus::Fresh { count, complete } => {
            println!("  Found {} existing workflow(s)", count);
            if !complete {
                eprintln!(
                    "  {}",
                    yellow.apply_to("WARNING: listing incomplete; some duplicates may be missed")
                );
            }
        }
        IndexStatus::Unavailable { reason } => {
            eprintln!(
                "  {}",
                yellow.apply_to(format!("WARNING: Could not fetch existing workflows: {}", reason))
            );
            eprintln!("  Duplicate check disabled for this batch");
        }
    }
}

fn print_item(item: &ImportItem) {
    let red = Style::new().red();
    println!();
    println!("  {}", style(&item.file).bold());
    for message in &item.messages {
        println!("    {}", message);
    }
    match item.status {
        ImportStatus::Imported => println!(
            "    {} ID: {}",
            Style::new().green().apply_to("Imported"),
            item.resulting_id.as_deref().unwrap_or("?")
        ),
        ImportStatus::Duplicate => {
            println!(
                "    {} '{}' already exists (ID: {})",
                red.apply_to("DUPLICATE:"),
                item.source_name.as_deref().unwrap_or(&item.file),
                item.existing_id.as_deref().unwrap_or("?")
            );
            println!("    Skipping; delete or rename the existing workflow first");
        }
        ImportStatus::ValidationFailed | ImportStatus::ImportFailed => println!(
            "    {} {}",
            red.apply_to(format!("{}:", item.status)),
            item.reason.as_deref().unwrap_or("")
        ),
        ImportStatus::Pending => {}
    }
}

fn print_summary(report: &BatchReport) {
    let dim = Style::new().dim();
    println!();
    println!("{}", dim.apply_to("─".repeat(50)));

    let imported: Vec<&ImportItem> = report
        .items
        .iter()
        .filter(|i| i.status == ImportStatus::Imported)
        .collect();
    if !imported.is_empty() {
        println!("  Imported ({}):", imported.len());
        for item in imported {
            println!("    {} → {}", item.file, item.resulting_id.as_deref().unwrap_or("?"));
        }
    }

    if report.duplicates() > 0 {
        println!("  Skipped, duplicate ({}):", report.duplicates());
        for item in report.items.iter().filter(|i| i.status == ImportStatus::Duplicate) {
            println!("    {}", item.file);
        }
    }

    if report.failed() > 0 {
        println!("  Failed ({}):", report.failed());
        for item in report.items.iter().filter(|i| i.status.is_failure()) {
            println!("    {}: {}", item.file, item.status);
        }
    }
}
