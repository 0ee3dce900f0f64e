// src/main.rs
// =============================================================================
// This is the entry point of our CLI application.
//
// What happens here:
// 1. Parse command-line arguments using clap
// 2. Set up logging for the chosen output mode
// 3. Dispatch to the appropriate subcommand handler
// 4. Exit with proper code (0 = ran, 1 = broken links / invalid resource, 2 = error)
//
// A run that finds broken links still succeeded: those links are recorded in
// the table and the summary. Exit code 2 means the run couldn't happen at
// all (unreadable table, missing column, failed rewrite, ...).
// =============================================================================

mod checker; // src/checker/ - probing links with retries
mod cli; // src/cli.rs - command-line parsing
mod config; // src/config.rs - HTTP settings from flags/env
mod dataset; // src/dataset/ - the CSV resource table
mod error; // src/error.rs - errors that stop a run
mod github; // src/github/ - GitHub URLs, licenses, commits
mod validate; // src/validate/ - row validation and run summaries

use anyhow::{Context, Result};
use chrono::Local;
use clap::Parser;
use std::num::NonZeroUsize;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use checker::{ReqwestTransport, Transport};
use cli::{Cli, Commands, HttpArgs};
use config::HttpConfig;
use dataset::{Dataset, Overrides, ResourceRecord};
use validate::{CheckReport, RunOptions, RunSummary, Validator};

// Who reads our output
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OutputMode {
    /// A person at a terminal: progress prose on stdout
    Human,
    /// CI: stdout is reserved for JSON, diagnostics and the report go to stderr
    Automation,
}

#[tokio::main]
async fn main() {
    let exit_code = match run().await {
        Ok(code) => code,
        Err(e) => {
            // {:#} prints the whole context chain on one line
            eprintln!("Error: {:#}", e);
            2
        }
    };

    std::process::exit(exit_code);
}

async fn run() -> Result<i32> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Validate {
            csv,
            overrides,
            max_links,
            github_action,
            min_delay,
            max_delay,
            fail_on_broken,
            http,
        } => {
            let mode = if github_action {
                OutputMode::Automation
            } else {
                OutputMode::Human
            };
            init_tracing(mode);
            let options = RunOptions {
                max_links,
                row_delay: (min_delay, max_delay),
            };
            handle_validate(&csv, &overrides, &http, &options, mode, fail_on_broken).await
        }
        Commands::Check {
            url,
            secondary,
            json,
            http,
        } => {
            init_tracing(if json {
                OutputMode::Automation
            } else {
                OutputMode::Human
            });
            handle_check(url, secondary, json, &http).await
        }
        Commands::Id {
            name,
            link,
            category,
        } => {
            println!("{}", dataset::generate_resource_id(&name, &link, &category));
            Ok(0)
        }
    }
}

// Human mode shows progress at info level on stdout; automation mode keeps
// stdout clean and only lets warnings through to stderr. RUST_LOG wins over both.
fn init_tracing(mode: OutputMode) {
    let default_level = match mode {
        OutputMode::Human => "info",
        OutputMode::Automation => "warn",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let registry = tracing_subscriber::registry().with(filter);
    match mode {
        OutputMode::Human => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(false)
                    .without_time()
                    .with_level(false)
                    .with_writer(std::io::stdout),
            )
            .init(),
        OutputMode::Automation => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(false)
                    .with_writer(std::io::stderr),
            )
            .init(),
    }
}

fn build_validator(http: &HttpArgs) -> Result<Validator> {
    let config = HttpConfig::from(http);
    debug!(api_base = %config.api_base, authenticated = config.github_token.is_some(), "http config");
    let transport: Arc<dyn Transport> =
        Arc::new(ReqwestTransport::new(&config).context("building HTTP client")?);
    Ok(Validator::new(transport, config.endpoints(), config.retry))
}

// Handles the 'validate' subcommand
//
// Load -> validate row by row -> rewrite the whole table once -> report.
// Nothing is written until every row has been processed.
async fn handle_validate(
    csv: &Path,
    overrides_path: &Path,
    http: &HttpArgs,
    options: &RunOptions,
    mode: OutputMode,
    fail_on_broken: bool,
) -> Result<i32> {
    let started = Local::now();
    info!(
        "Starting link validation at: {}",
        started.format("%Y-%m-%d %H:%M:%S")
    );
    if let Some(max) = options.max_links.map(NonZeroUsize::get) {
        info!("Limiting validation to {} links", max);
    }

    let dataset = Dataset::load(csv).with_context(|| format!("loading {}", csv.display()))?;
    debug!(columns = ?dataset.schema().headers(), "table columns");
    if dataset.is_empty() {
        warn!("{} has no resource rows", csv.display());
    } else {
        info!("Loaded {} resources from {}", dataset.len(), csv.display());
    }
    let overrides = Overrides::load(overrides_path)?;
    if !overrides.is_empty() {
        info!("Loaded {} override(s) from {}", overrides.len(), overrides_path.display());
    }

    let validator = build_validator(http)?;
    let result = validate::run(&validator, dataset.records(), &overrides, options).await;
    debug!(repositories = validator.licenses().cached(), "license lookups this run");
    if result.limit_reached() {
        info!("{} row(s) left unchecked by --max-links", result.unvalidated);
    }

    let rewritten = dataset::rewrite(csv, &result.updates)
        .with_context(|| format!("writing {}", csv.display()))?;

    let summary = RunSummary::new(&result, started, Local::now());
    let report = validate::render_report(&summary, rewritten.records());
    match mode {
        // JSON for the workflow on stdout, the readable version in the job log
        OutputMode::Automation => {
            println!("{}", summary.to_json()?);
            eprint!("{}", report);
        }
        OutputMode::Human => {
            println!();
            print!("{}", report);
        }
    }

    if fail_on_broken && !summary.broken_links.is_empty() {
        Ok(1) // Exit code 1 = broken links found
    } else {
        Ok(0)
    }
}

// Handles the 'check' subcommand
async fn handle_check(url: String, secondary: Option<String>, json: bool, http: &HttpArgs) -> Result<i32> {
    let validator = build_validator(http)?;
    let record = ResourceRecord {
        id: "check".to_string(),
        display_name: url.clone(),
        primary_link: url,
        secondary_link: secondary.clone().unwrap_or_default(),
        ..ResourceRecord::default()
    };

    info!("Validating resource: {}", record.primary_link);
    let outcome = validator.validate_row(1, &record, None).await;
    let report = CheckReport::new(&outcome, secondary);

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print!("{}", report.render());
    }

    Ok(if report.valid { 0 } else { 1 })
}
