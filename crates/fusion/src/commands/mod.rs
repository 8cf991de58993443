//! CLI command handlers.

pub mod actions;
pub mod auth;
pub mod definitions;
pub mod execute;
pub mod import;
pub mod triggers;
pub mod validate;

use std::sync::Arc;

use anyhow::{Context as _, Result};
use console::Style;
use fusion_client::{CacheStore, FalconClient, FetchPolicy, PageProgress, ProgressFn};
use fusion_config::FusionConfig;
use fusion_domain::{DomainServices, PollSettings};
use fusion_oauth::ClientCredentialsProvider;
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use serde::Serialize;

/// Shared context for all commands.
#[derive(Debug)]
pub struct Context {
    /// Merged configuration.
    pub config: FusionConfig,
    /// Output as JSON for scripting.
    pub json_output: bool,
    /// Verbose output enabled.
    pub verbose: bool,
    progress: ProgressBar,
}

impl Context {
    pub fn new(config: FusionConfig, json_output: bool, verbose: bool) -> Self {
        let progress = if json_output {
            ProgressBar::hidden()
        } else {
            let bar = ProgressBar::with_draw_target(Some(0), ProgressDrawTarget::stderr());
            bar.set_style(
                ProgressStyle::with_template("  {msg} [{bar:30}] {pos}/{len}")
                    .unwrap_or_else(|_| ProgressStyle::default_bar())
                    .progress_chars("=> "),
            );
            bar.set_message("Fetching catalog");
            bar
        };

        Self {
            config,
            json_output,
            verbose,
            progress,
        }
    }

    /// Authenticated client built from the resolved credentials.
    pub fn connect(&self) -> Result<FalconClient> {
        let credentials = fusion_config::resolve_credentials(&self.config)?;
        tracing::debug!(
            client_id = %fusion_oauth::mask_secret(&credentials.client_id),
            base_url = %credentials.base_url,
            "Connecting"
        );
        let base_url = credentials.base_url.clone();
        let provider = ClientCredentialsProvider::new(credentials)?;

        FalconClient::builder()
            .base_url(base_url)
            .token_provider(Arc::new(provider))
            .timeout(self.config.api().timeout())
            .build()
            .context("Failed to build API client")
    }

    /// Domain services over a fresh connection, with the catalog cache and
    /// fetch policy from the configuration.
    pub fn services(&self) -> Result<DomainServices> {
        let client = self.connect()?;
        let cache = self.config.cache();
        let fetch = self.config.fetch();
        let policy = FetchPolicy {
            page_size: fetch.page_size,
            max_attempts: fetch.max_attempts,
            backoff: fetch.backoff(),
        };

        let activities = client
            .activities()
            .with_cache(CacheStore::new(cache.cache_file(), cache.ttl()))
            .with_policy(policy)
            .with_progress(self.progress_fn());
        let definitions = client.definitions().with_policy(policy);

        Ok(DomainServices::new(
            activities,
            definitions,
            client.executions(),
        ))
    }

    /// Poll settings from the configuration, overridden by flags.
    pub fn poll_settings(&self, timeout_secs: Option<u64>, interval_secs: Option<u64>) -> PollSettings {
        let execute = self.config.execute();
        PollSettings {
            timeout: std::time::Duration::from_secs(timeout_secs.unwrap_or(execute.timeout_secs)),
            interval: std::time::Duration::from_secs(
                interval_secs.unwrap_or(execute.interval_secs).max(1),
            ),
        }
    }

    pub fn finish_progress(&self) {
        self.progress.finish_and_clear();
    }

    fn progress_fn(&self) -> ProgressFn {
        let bar = self.progress.clone();
        Arc::new(move |p: PageProgress| {
            bar.set_length(p.total as u64);
            bar.set_position(p.fetched as u64);
        })
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Output helpers
// ─────────────────────────────────────────────────────────────────────────────

pub(crate) fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

pub(crate) fn print_header(title: &str) {
    let dim = Style::new().dim();
    println!("{}", console::style(title).bold());
    println!("{}", dim.apply_to("─".repeat(50)));
}

/// Note on stderr that a listing was built from a partial catalog.
pub(crate) fn warn_incomplete(complete: bool) {
    if !complete {
        let yellow = Style::new().yellow();
        eprintln!(
            "{}",
            yellow.apply_to("Note: the catalog could not be fetched completely; results may be missing entries.")
        );
    }
}

pub(crate) fn truncate(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_chars.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}
