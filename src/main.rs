//! crawl-chain main entry point
//!
//! This is the command-line interface for running crawl recipes.

use clap::Parser;
use crawl_chain::config::{load_config, Config, StepConfig};
use crawl_chain::crawler::crawl;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// crawl-chain: lazily chained page crawling
///
/// Runs the chains described in a TOML recipe: each starts from a page, selects and
/// extracts values, and optionally follows links to run the rest of the chain on the
/// linked pages. Every reported value is printed on its own line.
#[derive(Parser, Debug)]
#[command(name = "crawl-chain")]
#[command(version)]
#[command(about = "Run chained crawl recipes", long_about = None)]
struct Cli {
    /// Path to TOML recipe file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Validate the recipe and show the chains without fetching anything
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading recipe from: {}", cli.config.display());
    let config = match load_config(&cli.config) {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("Failed to load recipe: {}", e);
            return Err(e.into());
        }
    };

    if cli.dry_run {
        handle_dry_run(&config);
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
            0 => EnvFilter::new("crawl_chain=info,warn"),
            1 => EnvFilter::new("crawl_chain=debug,info"),
            2 => EnvFilter::new("crawl_chain=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    // Logs go to stderr so stdout carries only results
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Handles the --dry-run mode: shows the validated recipe
fn handle_dry_run(config: &Config) {
    println!("=== crawl-chain Dry Run ===\n");

    println!("Crawler Configuration:");
    println!("  Concurrency: {}", config.crawler.concurrency);
    println!("  Timeout: {}s", config.crawler.timeout_secs);

    println!("\nHeaders ({}):", config.headers.len());
    for (name, value) in &config.headers {
        println!("  {}: {}", name, value);
    }

    println!("\nChains ({}):", config.start.len());
    for entry in &config.start {
        println!("  - {}", entry.url);
        let mut depth = 2;
        for step in &entry.steps {
            println!("{:indent$}* {}", "", step, indent = depth * 2);
            if *step == StepConfig::Click {
                depth += 1;
            }
        }
        println!("{:indent$}* report", "", indent = depth * 2);
    }

    println!("\n✓ Recipe is valid");
}

/// Handles the main crawl operation
async fn handle_crawl(config: Config) -> Result<(), Box<dyn std::error::Error>> {
    let outcome = match crawl(config).await {
        Ok(outcome) => outcome,
        Err(e) => {
            tracing::error!("Crawl failed: {}", e);
            return Err(e.into());
        }
    };

    for failure in &outcome.failures {
        tracing::warn!("Failed page {}: {}", failure.url, failure.error);
    }

    for result in &outcome.results {
        println!("{}", result);
    }

    tracing::info!(
        "Crawl completed with {} results ({} failed pages)",
        outcome.results.len(),
        outcome.failures.len()
    );
    Ok(())
}
