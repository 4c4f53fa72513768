//! Seen main entry point
//!
//! This is the command-line interface for the Seen crawling engine.

use clap::Parser;
use seen::config::{build_parsers, load_config_with_hash, Config};
use seen::output::{print_summary, JsonLinesSink};
use seen::Spider;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// Seen: a small concurrent crawling engine
///
/// Seen starts from the configured root URLs, fetches pages with a pool of
/// workers, extracts items with the configured parsers and follows the links
/// it discovers until nothing is left to crawl.
#[derive(Parser, Debug)]
#[command(name = "seen")]
#[command(version = "1.0.0")]
#[command(about = "A small concurrent crawling engine", long_about = None)]
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
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, config_hash) = match load_config_with_hash(&cli.config) {
        Ok((cfg, hash)) => {
            tracing::info!("Configuration loaded successfully (hash: {})", hash);
            (cfg, hash)
        }
        Err(e) => {
            tracing::error!("Failed to load configuration: {}", e);
            return Err(e.into());
        }
    };

    if cli.dry_run {
        handle_dry_run(&config);
    } else {
        handle_crawl(config, config_hash).await?;
    }

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
///
/// Logs go to stderr so that items written to stdout stay parseable.
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("seen=info,warn"),
            1 => EnvFilter::new("seen=debug,info"),
            2 => EnvFilter::new("seen=trace,debug"),
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

/// Handles the --dry-run mode: shows the session that would run
fn handle_dry_run(config: &Config) {
    let spider = &config.spider;

    println!("=== Seen Dry Run ===\n");

    println!("Spider Configuration:");
    println!("  Concurrency: {}", spider.concurrency);
    println!("  Max tries: {}", spider.max_tries);
    println!("  Timeout: {}s", spider.timeout);
    println!("  Interval: {}ms", spider.interval);
    println!("  Method: {:?}", spider.method);
    println!(
        "  Fetch strategy: {}",
        if spider.use_browser { "browser" } else { "direct" }
    );

    println!("\nRoots ({}):", spider.roots.len());
    for root in &spider.roots {
        println!("  - {}", root);
    }

    if spider.url_limit.is_empty() {
        println!("\nURL limit: none");
    } else {
        let mut hosts: Vec<_> = spider.url_limit.iter().collect();
        hosts.sort();
        println!("\nURL limit ({}):", hosts.len());
        for host in hosts {
            println!("  - {}", host);
        }
    }

    println!("\nParsers ({}):", config.parsers.len());
    for entry in &config.parsers {
        let item = entry
            .item
            .as_ref()
            .map(|item| format!("item '{}' ({} fields)", item.name, item.fields.len()))
            .unwrap_or_else(|| "no item".to_string());
        println!(
            "  - contains: {:?}, pattern: {:?}, json: {}, {}",
            entry.contains, entry.pattern, entry.json, item
        );
    }

    println!("\nOutput:");
    match &config.output.items_path {
        Some(path) => println!("  Items: {}", path),
        None => println!("  Items: stdout"),
    }

    println!("\n✓ Configuration is valid");
    println!(
        "✓ Would start crawling with {} root URLs",
        spider.roots.len()
    );
}

/// Handles the main crawl operation
async fn handle_crawl(
    config: Config,
    config_hash: String,
) -> Result<(), Box<dyn std::error::Error>> {
    let sink = Arc::new(match &config.output.items_path {
        Some(path) => JsonLinesSink::open(Path::new(path))?,
        None => JsonLinesSink::stdout(),
    });

    let parsers = build_parsers(&config.parsers, &sink.save_step())?;
    tracing::info!(
        "Roots: {}, Parsers: {}, Concurrency: {}",
        config.spider.roots.len(),
        parsers.len(),
        config.spider.concurrency
    );

    let spider = Spider::new(config.spider)
        .parsers(parsers)
        .config_hash(config_hash)
        .on_url_failed(|failed| tracing::debug!("url_failed_handler: {}", failed));

    match spider.crawl().await {
        Ok(summary) => {
            if summary.interrupted {
                tracing::warn!("Crawl interrupted");
            } else {
                tracing::info!("Crawl completed successfully");
            }
            print_summary(&summary);
            Ok(())
        }
        Err(e) => {
            tracing::error!("Crawl failed: {}", e);
            Err(e.into())
        }
    }
}
