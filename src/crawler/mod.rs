//! Crawler module for chained page fetching and extraction
//!
//! This module contains the job-chain engine, including:
//! - The crawler that owns shared state and collects results
//! - Jobs and their per-page queues of steps
//! - Scheduling under a global concurrency limit
//! - HTTP fetching and HTML parsing
//! - Running chains described by a recipe configuration

mod coordinator;
mod fetcher;
mod job;
mod parser;
mod recipe;
mod scheduler;

pub use coordinator::{
    Crawler, CrawlerOptions, JobFailure, DEFAULT_CONCURRENCY, DEFAULT_TIMEOUT, MAX_CONCURRENCY,
};
pub use fetcher::{build_headers, build_http_client, Fetch, HttpFetcher};
pub use job::Job;
pub use parser::{parse_selector, Document, Element};
pub use recipe::{apply_steps, run_recipe, CrawlOutcome};

use crate::config::Config;
use crate::CrawlError;

/// Runs a complete recipe crawl
///
/// This is the main entry point for configured crawls. It will:
/// 1. Build an HTTP client with the configured headers and timeout
/// 2. Start one root job per `[[start]]` entry and queue its steps
/// 3. Wait until every page has been fetched and processed
/// 4. Return the reported results along with any failed pages
///
/// # Arguments
///
/// * `config` - The validated recipe configuration
///
/// # Returns
///
/// * `Ok(CrawlOutcome)` - Crawl drained
/// * `Err(CrawlError)` - The crawler could not be built
pub async fn crawl(config: Config) -> Result<CrawlOutcome, CrawlError> {
    run_recipe(&config).await
}
