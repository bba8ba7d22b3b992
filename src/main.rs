//! Boligscrape main entry point
//!
//! This is the command-line interface for the listing crawler.

use anyhow::Context;
use boligscrape::config::load_config_with_hash;
use boligscrape::crawler::{crawl, rebuild_from_checkpoint, RunReport};
use boligscrape::output::{print_null_rates, NullRates, RawDataset};
use clap::Parser;
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

/// Boligscrape: apartment listing crawler
///
/// Discovers every listing-index page, fetches each listing's detail page and
/// writes one row per listing to a dated raw CSV dataset.
#[derive(Parser, Debug)]
#[command(name = "boligscrape")]
#[command(version)]
#[command(about = "Crawl rental listings into a raw CSV dataset", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Validate config and show what would be crawled without actually crawling
    #[arg(long, conflicts_with_all = ["stats", "from_checkpoint"])]
    dry_run: bool,

    /// Print the null-rate report of an existing dataset and exit
    #[arg(long, value_name = "CSV", conflicts_with_all = ["dry_run", "from_checkpoint"])]
    stats: Option<PathBuf>,

    /// Rebuild the dataset from a page checkpoint instead of crawling
    #[arg(long, value_name = "CSV", conflicts_with_all = ["dry_run", "stats"])]
    from_checkpoint: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, config_hash) = load_config_with_hash(&cli.config).inspect_err(|e| {
        tracing::error!("Failed to load configuration: {}", e);
    })?;
    tracing::info!("Configuration loaded successfully (hash: {})", config_hash);

    if cli.dry_run {
        handle_dry_run(&config);
    } else if let Some(path) = cli.stats {
        handle_stats(&path)?;
    } else if let Some(path) = cli.from_checkpoint {
        handle_rebuild(&config, &path).await?;
    } else {
        handle_crawl(config).await?;
    }

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("boligscrape=info,warn"),
            1 => EnvFilter::new("boligscrape=debug,info"),
            2 => EnvFilter::new("boligscrape=trace,debug"),
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
fn handle_dry_run(config: &boligscrape::Config) {
    println!("=== Boligscrape Dry Run ===\n");

    println!("Site:");
    println!("  Base URL: {}", config.site.base_url);
    println!("  Page size: {}", config.site.page_size);
    println!("  Sentinel selector: {}", config.site.sentinel_selector);
    println!("  Listing selector: {}", config.site.listing_selector);

    println!("\nCrawler:");
    println!("  Max index pages: {}", config.crawler.max_pages);
    println!(
        "  Concurrency: {}",
        config.crawler.effective_concurrency()
    );
    println!(
        "  Timeouts: connect {}s, request {}s",
        config.crawler.connect_timeout_secs, config.crawler.request_timeout_secs
    );

    println!("\nUser Agent:");
    println!(
        "  {}",
        boligscrape::crawler::format_user_agent(&config.user_agent)
    );

    println!("\nOutput:");
    println!("  Raw dir: {}", config.output.raw_dir);
    println!("  Stats dir: {}", config.output.stats_dir);
    println!(
        "  Page checkpoint: {}",
        if config.output.write_page_checkpoint { "yes" } else { "no" }
    );

    println!("\n✓ Configuration is valid");
}

/// Handles the --stats mode: prints null rates of an existing dataset
fn handle_stats(path: &std::path::Path) -> anyhow::Result<()> {
    println!("Dataset: {}\n", path.display());
    let dataset = RawDataset::read_path(path)
        .with_context(|| format!("Failed to read dataset {}", path.display()))?;
    print_null_rates(&NullRates::from_dataset(&dataset));
    Ok(())
}

/// Handles the --from-checkpoint mode
async fn handle_rebuild(
    config: &boligscrape::Config,
    checkpoint: &std::path::Path,
) -> anyhow::Result<()> {
    let today = chrono::Local::now().date_naive();
    match rebuild_from_checkpoint(config, checkpoint, today).await {
        Ok(report) => {
            print_report(&report);
            Ok(())
        }
        Err(e) => {
            tracing::error!("Rebuild failed: {}", e);
            Err(e.into())
        }
    }
}

/// Handles the main crawl operation
async fn handle_crawl(config: boligscrape::Config) -> anyhow::Result<()> {
    tracing::info!("Starting crawl of {}", config.site.base_url);

    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupt received, finishing in-flight requests");
            on_signal.cancel();
        }
    });

    match crawl(config, cancel).await {
        Ok(report) => {
            print_report(&report);
            Ok(())
        }
        Err(e) => {
            tracing::error!("Crawl failed: {}", e);
            Err(e.into())
        }
    }
}

fn print_report(report: &RunReport) {
    println!("\n=== Run Summary ===");
    println!("  State: {}", report.state);
    println!("  Index pages: {}", report.index_pages);
    println!("  Detail links: {}", report.links);
    println!(
        "  Fetched: {} ({} failed)",
        report.fetched,
        report.fetch_failures.len()
    );
    println!("  Records: {}", report.records);
    println!("  Field failures: {}", report.field_failures.len());
    if let Some(paths) = &report.dataset {
        println!("  Dataset: {}", paths.dated.display());
        println!("  Latest: {}", paths.latest.display());
    }
    if let Some(path) = &report.null_rates {
        println!("  Null rates: {}", path.display());
    }
}
