//! Sumi-Sift main entry point
//!
//! Command-line shell over the library: loads an engine configuration and a
//! scrape job, runs it, and prints the result as JSON.

use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;
use sumi_sift::config::{load_config_with_hash, load_request, EngineConfig};
use sumi_sift::run::{RunOptions, RunOrchestrator, ScrapeRequest};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

/// Sumi-Sift: a polite, schema-driven web extractor
///
/// Sumi-Sift fetches pages while respecting robots.txt and per-origin rate
/// limits, extracts the fields described by a schema recipe, scores every
/// item for quality, and follows pagination up to the job's limits.
#[derive(Parser, Debug)]
#[command(name = "sumi-sift")]
#[command(version)]
#[command(about = "A polite, schema-driven web extractor", long_about = None)]
struct Cli {
    /// Path to TOML engine configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Path to TOML job file (target URL, strategy and recipe)
    #[arg(value_name = "JOB")]
    job: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Validate config and job and show what would be scraped without fetching
    #[arg(long)]
    dry_run: bool,

    /// Stop the run after this many seconds and print the partial result
    #[arg(long, value_name = "SECS")]
    deadline: Option<u64>,

    /// Pretty-print the JSON result
    #[arg(long)]
    pretty: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let config = match load_config_with_hash(&cli.config) {
        Ok((cfg, hash)) => {
            tracing::info!("Configuration loaded successfully (hash: {})", hash);
            cfg
        }
        Err(e) => {
            tracing::error!("Failed to load configuration: {}", e);
            return Err(e.into());
        }
    };

    tracing::info!("Loading job from: {}", cli.job.display());
    let request = match load_request(&cli.job) {
        Ok(request) => request,
        Err(e) => {
            tracing::error!("Failed to load job: {}", e);
            return Err(e.into());
        }
    };

    if cli.dry_run {
        handle_dry_run(&config, &request);
        return Ok(());
    }

    handle_run(config, &request, cli.deadline, cli.pretty).await
}

/// Sets up the logging/tracing subscriber based on verbosity level
///
/// Logs go to stderr so stdout carries only the JSON result.
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("sumi_sift=info,warn"),
            1 => EnvFilter::new("sumi_sift=debug,info"),
            2 => EnvFilter::new("sumi_sift=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Handles the --dry-run mode: shows the validated plan
fn handle_dry_run(config: &EngineConfig, request: &ScrapeRequest) {
    let strategy = &request.strategy;

    println!("=== Sumi-Sift Dry Run ===\n");

    println!("User Agent:");
    println!("  Name: {}", config.user_agent.crawler_name);
    println!("  Version: {}", config.user_agent.crawler_version);
    println!("  Contact URL: {}", config.user_agent.contact_url);
    println!("  Contact Email: {}", config.user_agent.contact_email);

    println!("\nCompliance:");
    println!("  Respect robots.txt: {}", config.compliance.respect_robots_txt);
    println!(
        "  Default crawl delay: {}ms",
        config.compliance.default_crawl_delay_ms
    );

    println!("\nRate Limit:");
    println!(
        "  Delay: {}ms (min {}ms, max {}ms)",
        config.rate_limit.initial_delay_ms,
        config.rate_limit.min_delay_ms,
        config.rate_limit.max_delay_ms
    );
    println!(
        "  Max concurrent per origin: {}",
        config.rate_limit.max_concurrent_per_origin
    );

    println!("\nJob:");
    println!("  Target: {}", request.target_url);
    println!("  Type: {:?}", strategy.scrape_type);
    println!(
        "  Pagination: {}",
        if strategy.pagination_enabled {
            format!("up to {} pages", strategy.max_pages)
        } else {
            "off".to_string()
        }
    );
    println!("  Max results: {}", request.effective_max_results());

    println!(
        "\nRecipe '{}' v{} ({} fields):",
        request.recipe.name,
        request.recipe.version,
        request.recipe.fields.len()
    );
    for field in &request.recipe.fields {
        println!(
            "  - {} ({:?}{}, weight {}): {}",
            field.name,
            field.field_type,
            if field.required { ", required" } else { "" },
            field.weight,
            field.selector
        );
    }

    println!("\nQuality:");
    println!("  Minimum score: {}", config.quality.min_quality_score);
    println!("  Filtering: {}", config.quality.enable_quality_filtering);

    println!("\n✓ Configuration is valid");
    println!("✓ Job is valid");
}

/// Handles the main scrape operation
async fn handle_run(
    config: EngineConfig,
    request: &ScrapeRequest,
    deadline: Option<u64>,
    pretty: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let orchestrator = RunOrchestrator::from_config(config)?;

    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupt received, stopping run");
            on_signal.cancel();
        }
    });

    let mut options = RunOptions::default().with_cancel(cancel);
    if let Some(secs) = deadline {
        options = options.with_deadline(Duration::from_secs(secs));
    }

    let result = match orchestrator.run(request, options).await {
        Ok(result) => result,
        Err(e) => {
            tracing::error!("Run failed: {}", e);
            return Err(e.into());
        }
    };

    let json = if pretty {
        serde_json::to_string_pretty(&result)?
    } else {
        serde_json::to_string(&result)?
    };
    println!("{}", json);

    Ok(())
}
