//! Holdings-Harvest main entry point
//!
//! This is the command-line interface for the Holdings-Harvest crawler.

use clap::Parser;
use holdings_harvest::config::{load_config_with_hash, validate, Config};
use holdings_harvest::crawler::Coordinator;
use holdings_harvest::output::{export_records, generate_markdown_report, print_report};
use holdings_harvest::PageUrl;
use std::path::{Path, PathBuf};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

/// Holdings-Harvest: an archival holdings crawler
///
/// Holdings-Harvest walks the paginated listings of an archives portal,
/// extracts one record per fond, deduplicates them and writes the result
/// as a spreadsheet.
#[derive(Parser, Debug)]
#[command(name = "holdings-harvest")]
#[command(version)]
#[command(about = "An archival holdings crawler", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Override the seed listing URL
    #[arg(long, value_name = "URL")]
    seed: Option<String>,

    /// Override the page bound
    #[arg(long, value_name = "N")]
    max_pages: Option<u32>,

    /// Override the number of concurrent fetches
    #[arg(long, value_name = "N")]
    concurrency: Option<u32>,

    /// Override the spreadsheet path (.csv or .tsv)
    #[arg(short, long, value_name = "PATH")]
    output: Option<PathBuf>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Validate config and show what would be crawled without actually crawling
    #[arg(long)]
    dry_run: bool,
}

impl Cli {
    /// Applies command-line overrides on top of the loaded configuration
    fn apply_overrides(&self, config: &mut Config) {
        if let Some(seed) = &self.seed {
            config.site.seed = seed.clone();
        }
        if let Some(max_pages) = self.max_pages {
            config.crawler.max_pages = Some(max_pages);
        }
        if let Some(concurrency) = self.concurrency {
            config.crawler.max_concurrent_fetches = concurrency;
        }
        if let Some(output) = &self.output {
            config.output.spreadsheet_path = output.display().to_string();
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    // Load and validate configuration
    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (mut config, config_hash) = match load_config_with_hash(&cli.config) {
        Ok((cfg, hash)) => {
            tracing::info!("Configuration loaded successfully (hash: {})", hash);
            (cfg, hash)
        }
        Err(e) => {
            tracing::error!("Failed to load configuration: {}", e);
            return Err(e.into());
        }
    };

    cli.apply_overrides(&mut config);
    validate(&config)?;

    if cli.dry_run {
        handle_dry_run(&config);
    } else {
        handle_crawl(&config, config_hash).await?;
    }

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("holdings_harvest=info,warn"),
            1 => EnvFilter::new("holdings_harvest=debug,info"),
            2 => EnvFilter::new("holdings_harvest=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Handles the --dry-run mode: shows the effective configuration
fn handle_dry_run(config: &Config) {
    println!("=== Holdings-Harvest Dry Run ===\n");

    println!("Site:");
    println!("  Seed: {}", config.site.seed);
    for pattern in &config.site.allowed_domains {
        println!("  Allowed: {}", pattern);
    }

    println!("\nCrawler Configuration:");
    println!(
        "  Max concurrent fetches: {}",
        config.crawler.max_concurrent_fetches
    );
    println!("  Request timeout: {}ms", config.crawler.request_timeout_ms);
    println!(
        "  Minimum request interval: {}ms",
        config.crawler.min_request_interval_ms
    );
    match config.crawler.max_pages {
        Some(max) => println!("  Max pages: {}", max),
        None => println!("  Max pages: unbounded"),
    }
    match config.crawler.max_depth {
        Some(max) => println!("  Max depth: {}", max),
        None => println!("  Max depth: unbounded"),
    }
    println!("  Sort records: {}", config.crawler.sort_records);

    println!("\nRetry:");
    println!("  Max retries: {}", config.retry.max_retries);
    println!(
        "  Backoff: {}ms doubling, capped at {}ms",
        config.retry.base_delay_ms, config.retry.max_delay_ms
    );

    println!("\nUser Agent:");
    println!("  {}", config.user_agent.header_value());

    println!("\nExtractor:");
    println!("  Items: {}", config.extractor.item_selector);
    println!("  Next page: {}", config.extractor.next_page.join(" | "));
    println!("  Detail links: {}", config.extractor.detail_links.join(" | "));
    println!("  Dedup key: {:?}", config.records.dedup_key);

    println!("\nOutput:");
    println!("  Spreadsheet: {}", config.output.spreadsheet_path);
    if let Some(summary) = &config.output.summary_path {
        println!("  Summary: {}", summary);
    }

    println!("\n✓ Configuration is valid");
}

/// Handles the main crawl operation
async fn handle_crawl(
    config: &Config,
    config_hash: String,
) -> Result<(), Box<dyn std::error::Error>> {
    let cancel = CancellationToken::new();

    // Ctrl-C stops the crawl; whatever was collected is still exported
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::warn!("Interrupt received, stopping crawl");
                cancel.cancel();
            }
        });
    }

    let seed = PageUrl::parse(&config.site.seed)?;
    let coordinator = Coordinator::from_config(config)
        .map_err(|e| {
            tracing::error!("Failed to set up crawl: {}", e);
            e
        })?
        .with_cancellation(cancel)
        .with_config_hash(config_hash);

    let outcome = coordinator.run(seed).await;

    let spreadsheet = Path::new(&config.output.spreadsheet_path);
    let written = export_records(&outcome.records, spreadsheet)?;
    tracing::info!("Wrote {} records to {}", written, spreadsheet.display());

    if let Some(summary_path) = &config.output.summary_path {
        generate_markdown_report(&outcome.report, Path::new(summary_path))?;
        tracing::info!("Report written to {}", summary_path);
    }

    print_report(&outcome.report);

    if outcome.report.has_failures() {
        tracing::warn!(
            "{} pages failed permanently; their records are missing from the export:",
            outcome.report.failed_pages.len()
        );
        for page in &outcome.report.failed_pages {
            tracing::warn!("  {} ({}, {} attempts)", page.url, page.kind, page.attempts);
        }
    }

    Ok(())
}
