//! Sitemapper main entry point
//!
//! This is the command-line interface for the sitemapper crawler.

use anyhow::Context;
use clap::Parser;
use sitemapper::config::{load_config_with_hash, Config, OutputFormat};
use sitemapper::crawler::crawl;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Sitemapper: a bounded-concurrency sitemap generator
///
/// Sitemapper crawls every in-site page reachable from a root URL, probes
/// referenced images, and writes an XML sitemap or a plain URL list.
#[derive(Parser, Debug)]
#[command(name = "sitemapper")]
#[command(version)]
#[command(about = "A bounded-concurrency sitemap generator", long_about = None)]
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
    #[arg(long)]
    dry_run: bool,

    /// Write the sitemap here instead of the configured path
    #[arg(short, long, value_name = "PATH")]
    output: Option<PathBuf>,

    /// Output format: xml or txt
    #[arg(short, long, value_name = "FORMAT")]
    format: Option<OutputFormat>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    // Load and validate configuration
    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (mut config, hash) = load_config_with_hash(&cli.config).map_err(|e| {
        tracing::error!("Failed to load configuration: {}", e);
        e
    })?;
    tracing::info!("Configuration loaded successfully (hash: {})", hash);

    if let Some(path) = cli.output {
        config.output.path = path.to_string_lossy().into_owned();
    }
    if let Some(format) = cli.format {
        config.output.format = format;
    }

    if cli.dry_run {
        handle_dry_run(&config);
        return Ok(());
    }

    handle_crawl(config).await
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("sitemapper=info,warn"),
            1 => EnvFilter::new("sitemapper=debug,info"),
            2 => EnvFilter::new("sitemapper=trace,debug"),
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

/// Handles the --dry-run mode: shows the validated configuration
fn handle_dry_run(config: &Config) {
    println!("=== Sitemapper Dry Run ===\n");

    println!("Crawler Configuration:");
    println!("  Root URL: {}", config.crawler.root_url);
    println!("  Max tasks: {}", config.crawler.max_tasks);
    println!("  Verify SSL: {}", config.crawler.verify_ssl);
    println!("  Request timeout: {}s", config.crawler.request_timeout);
    println!("  Extractor: {:?}", config.crawler.extractor);
    println!(
        "  Images: {} (probe timeout {}s, this domain only: {})",
        config.crawler.find_images, config.crawler.probe_timeout, config.crawler.images_this_domain
    );
    if !config.crawler.headers.is_empty() {
        println!("  Extra headers:");
        for name in config.crawler.headers.keys() {
            println!("    * {}", name);
        }
    }

    println!("\nFilters:");
    println!("  Excluded URL patterns: {}", config.filters.exclude_urls.len());
    println!("  Excluded image patterns: {}", config.filters.exclude_images.len());
    for root in &config.filters.image_root_urls {
        println!("  Image root: {}", root);
    }

    println!("\nMetadata:");
    for entry in &config.changefreq {
        println!("  changefreq {} -> {}", entry.pattern, entry.value);
    }
    for entry in &config.priority {
        println!("  priority {} -> {}", entry.pattern, entry.value);
    }

    println!("\nOutput:");
    println!("  Path: {}", config.output.path);
    println!("  Format: {}", config.output.format.as_str());
    println!("  Timezone offset: {:+}h", config.output.timezone_offset);

    println!("\n✓ Configuration is valid");
    println!("✓ Would start crawling at {}", config.crawler.root_url);
}

/// Handles the main crawl operation
async fn handle_crawl(config: Config) -> anyhow::Result<()> {
    let output = config.output.path.clone();

    let report = match crawl(config).await {
        Ok(report) => report,
        Err(e) => {
            tracing::error!("Crawl failed: {}", e);
            return Err(e).context("crawl did not produce a sitemap");
        }
    };

    println!("Sitemap written to {}", output);
    println!("  done:      {}", report.done);
    println!("  ok:        {}", report.ok);
    println!("  images:    {}", report.images);
    println!("  queued:    {}", report.queued);
    println!("  in flight: {}", report.in_flight);

    Ok(())
}
