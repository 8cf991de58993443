//! Actions command - search and browse the action catalog.

use std::process::ExitCode;

use anyhow::Result;
use clap::{Args, Subcommand};
use console::{Style, style};
use fusion_client::CatalogEntry;
use fusion_domain::{SearchQuery, SearchResult, VendorListing};
use serde::Serialize;

use super::{Context, print_header, print_json, truncate, warn_incomplete};

/// Arguments for the actions command.
#[derive(Args, Debug)]
pub struct ActionsArgs {
    #[command(subcommand)]
    pub command: ActionsCommand,
}

#[derive(Subcommand, Debug)]
pub enum ActionsCommand {
    /// Search actions by name
    Search {
        /// Name or words from the name
        query: String,

        /// Only actions from this vendor
        #[arg(long)]
        vendor: Option<String>,

        /// Only actions with a matching use case
        #[arg(long)]
        use_case: Option<String>,
    },

    /// Show full details of one action
    Details {
        /// Action ID
        id: String,
    },

    /// Browse the catalog a page at a time
    List {
        /// Page size
        #[arg(short, long, default_value = "25")]
        limit: usize,

        /// Entries to skip
        #[arg(short, long, default_value = "0")]
        offset: usize,

        /// Only actions from this vendor
        #[arg(long)]
        vendor: Option<String>,

        /// Only actions with a matching use case
        #[arg(long)]
        use_case: Option<String>,
    },

    /// List vendors with action counts and use cases
    Vendors {
        /// Only vendors with a matching use case
        #[arg(long)]
        use_case: Option<String>,
    },

    /// All actions from one vendor
    Vendor {
        /// Vendor name
        name: String,

        /// Only actions with a matching use case
        #[arg(long)]
        use_case: Option<String>,
    },

    /// Actions whose use cases match a term
    UseCase {
        /// Use case term
        term: String,

        /// Only actions from this vendor
        #[arg(long)]
        vendor: Option<String>,
    },

    /// Delete the local catalog cache
    ClearCache,
}

/// Run the actions command.
pub fn run(args: ActionsArgs, ctx: &Context) -> Result<ExitCode> {
    match args.command {
        ActionsCommand::Search {
            query,
            vendor,
            use_case,
        } => {
            let query = SearchQuery::name(query)
                .with_vendor(vendor)
                .with_use_case(use_case);
            cmd_search(&query, ctx)
        }
        ActionsCommand::Details { id } => cmd_details(&id, ctx),
        ActionsCommand::List {
            limit,
            offset,
            vendor,
            use_case,
        } => cmd_list(limit, offset, vendor, use_case, ctx),
        ActionsCommand::Vendors { use_case } => cmd_vendors(use_case.as_deref(), ctx),
        ActionsCommand::Vendor { name, use_case } => {
            cmd_search(&SearchQuery::vendor(name).with_use_case(use_case), ctx)
        }
        ActionsCommand::UseCase { term, vendor } => {
            cmd_search(&SearchQuery::use_case(term).with_vendor(vendor), ctx)
        }
        ActionsCommand::ClearCache => cmd_clear_cache(ctx),
    }
}

/// Search output for JSON.
#[derive(Debug, Serialize)]
struct SearchOutput<'a> {
    tier: String,
    complete: bool,
    count: usize,
    results: &'a [CatalogEntry],
}

fn cmd_search(query: &SearchQuery, ctx: &Context) -> Result<ExitCode> {
    let services = ctx.services()?;
    let result = services.search().search(query)?;
    ctx.finish_progress();

    if ctx.json_output {
        print_json(&SearchOutput {
            tier: result.tier.to_string(),
            complete: result.complete,
            count: result.entries.len(),
            results: &result.entries,
        })?;
        return Ok(ExitCode::SUCCESS);
    }

    print_search_result(query, &result, ctx);
    warn_incomplete(result.complete);
    Ok(ExitCode::SUCCESS)
}

fn print_search_result(query: &SearchQuery, result: &SearchResult, ctx: &Context) {
    let dim = Style::new().dim();
    if ctx.verbose {
        println!("{}", dim.apply_to(format!("Resolved via {} lookup", result.tier)));
    }
    if result.entries.is_empty() {
        println!("{}", dim.apply_to(format!("No actions found for {}", describe(query))));
        return;
    }

    print_header(&format!("{} action(s) for {}", result.entries.len(), describe(query)));
    for entry in &result.entries {
        print_entry_line(entry);
    }
}

fn describe(query: &SearchQuery) -> String {
    let mut parts = Vec::new();
    if let Some(text) = &query.text {
        parts.push(format!("'{}'", text));
    }
    if let Some(vendor) = &query.vendor {
        parts.push(format!("vendor '{}'", vendor));
    }
    if let Some(use_case) = &query.use_case {
        parts.push(format!("use case '{}'", use_case));
    }
    parts.join(", ")
}

fn print_entry_line(entry: &CatalogEntry) {
    let dim = Style::new().dim();
    let lock = if entry.has_permission { "" } else { " [no permission]" };
    println!(
        "  {}  {}{}",
        style(truncate(&entry.name, 60)).cyan(),
        dim.apply_to(format!("({})", entry.vendor_or_unknown())),
        Style::new().red().apply_to(lock)
    );
    println!("    {}", dim.apply_to(&entry.id));
}

fn cmd_details(id: &str, ctx: &Context) -> Result<ExitCode> {
    let services = ctx.services()?;
    let entry = services.search().details(id)?;

    if ctx.json_output {
        print_json(&entry)?;
        return Ok(ExitCode::SUCCESS);
    }

    let dim = Style::new().dim();
    print_header(&entry.name);
    println!("  {} {}", dim.apply_to("ID:        "), entry.id);
    println!("  {} {}", dim.apply_to("Vendor:    "), entry.vendor_or_unknown());
    if !entry.category.is_empty() {
        println!("  {} {}", dim.apply_to("Category:  "), entry.category);
    }
    println!(
        "  {} {}",
        dim.apply_to("Plugin:    "),
        if entry.is_plugin() { "yes" } else { "no" }
    );
    if let Some(class) = entry.class() {
        println!("  {} {} (needs version_constraint)", dim.apply_to("Class:     "), class);
    }
    println!(
        "  {} {}",
        dim.apply_to("Permission:"),
        if entry.has_permission { "granted" } else { "missing" }
    );
    if !entry.use_cases.is_empty() {
        println!("  {} {}", dim.apply_to("Use cases: "), entry.use_cases.join(", "));
    }
    if !entry.description.is_empty() {
        println!();
        println!("  {}", entry.description);
    }

    if let Some(properties) = entry.properties.as_ref().filter(|p| !p.is_empty()) {
        println!();
        println!("{}", style("Input fields").bold());
        for (name, field) in properties {
            let required = if field.required { " (required)" } else { "" };
            println!(
                "  {} {}{}",
                style(name).cyan(),
                dim.apply_to(field.field_type.as_deref().unwrap_or("string")),
                style(required).yellow()
            );
            if let Some(description) = field.description.as_deref().filter(|d| !d.is_empty()) {
                println!("    {}", dim.apply_to(truncate(description, 100)));
            }
        }
    }
    Ok(ExitCode::SUCCESS)
}

/// Page output for JSON.
#[derive(Debug, Serialize)]
struct PageOutput<'a> {
    total: usize,
    offset: usize,
    limit: usize,
    results: &'a [CatalogEntry],
}

fn cmd_list(
    limit: usize,
    offset: usize,
    vendor: Option<String>,
    use_case: Option<String>,
    ctx: &Context,
) -> Result<ExitCode> {
    let services = ctx.services()?;
    let search = services.search();

    let (entries, total, complete) = match use_case.as_deref().filter(|u| !u.trim().is_empty()) {
        Some(use_case) => {
            let found = search.search_by_use_case(use_case, vendor.as_deref())?;
            let total = found.entries.len();
            let entries = found.entries.into_iter().skip(offset).take(limit).collect();
            (entries, total, found.complete)
        }
        None => {
            let page = search.list(limit, offset, vendor.as_deref())?;
            (page.entries, page.total, true)
        }
    };
    ctx.finish_progress();

    if ctx.json_output {
        print_json(&PageOutput {
            total,
            offset,
            limit,
            results: &entries,
        })?;
        return Ok(ExitCode::SUCCESS);
    }

    let dim = Style::new().dim();
    if entries.is_empty() {
        println!("{}", dim.apply_to(format!("No actions at offset {} (total {})", offset, total)));
    } else {
        print_header(&format!(
            "Actions {}-{} of {}",
            offset + 1,
            offset + entries.len(),
            total
        ));
        for entry in &entries {
            print_entry_line(entry);
        }
        if offset + entries.len() < total {
            println!();
            println!(
                "{}",
                dim.apply_to(format!("Next page: --offset {}", offset + entries.len()))
            );
        }
    }
    warn_incomplete(complete);
    Ok(ExitCode::SUCCESS)
}

fn cmd_vendors(use_case: Option<&str>, ctx: &Context) -> Result<ExitCode> {
    let services = ctx.services()?;
    let listing = services.search().list_vendors(use_case)?;
    ctx.finish_progress();

    if ctx.json_output {
        print_json(&listing.vendors)?;
        return Ok(ExitCode::SUCCESS);
    }

    print_vendor_listing(&listing);
    warn_incomplete(listing.complete);
    Ok(ExitCode::SUCCESS)
}

fn print_vendor_listing(listing: &VendorListing) {
    let dim = Style::new().dim();
    print_header(&format!(
        "{} vendor(s), {} action(s)",
        listing.vendors.len(),
        listing.total_actions()
    ));
    for vendor in &listing.vendors {
        let lock = if vendor.has_permission { "" } else { " [no permission]" };
        println!(
            "  {} {}{}",
            style(&vendor.vendor).cyan(),
            dim.apply_to(format!("({})", vendor.count)),
            Style::new().red().apply_to(lock)
        );
        if !vendor.use_cases.is_empty() {
            let use_cases: Vec<&str> = vendor.use_cases.iter().map(String::as_str).collect();
            println!("    {}", dim.apply_to(truncate(&use_cases.join(", "), 100)));
        }
    }
}

fn cmd_clear_cache(ctx: &Context) -> Result<ExitCode> {
    let cache = ctx.config.cache();
    let store = fusion_client::CacheStore::new(cache.cache_file(), cache.ttl());
    let removed = store.clear();

    if ctx.json_output {
        print_json(&serde_json::json!({
            "path": store.path().display().to_string(),
            "removed": removed,
        }))?;
    } else if removed {
        println!("Cache cleared: {}", store.path().display());
    } else {
        println!("No cache file at {}", store.path().display());
    }
    Ok(ExitCode::SUCCESS)
}
