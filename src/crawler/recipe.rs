//! Running configured recipes
//!
//! A recipe is the declarative form of a chain: the `[[start]]` entries of a
//! [`Config`] each name a root page and the steps to queue on it. Steps after a `click`
//! are queued on every clicked page, and whatever each chain ends with is reported.

use crate::config::{Config, StepConfig};
use crate::crawler::{Crawler, Job, JobFailure};
use crate::state::{FromValue, Value};
use crate::CrawlError;

/// Everything a recipe run produced
#[derive(Debug, Clone)]
pub struct CrawlOutcome {
    /// Reported values, in the order they were reported
    pub results: Vec<String>,

    /// Jobs whose chain failed
    pub failures: Vec<JobFailure>,
}

/// Runs every chain of a validated configuration to completion
///
/// # Arguments
///
/// * `config` - The recipe configuration
///
/// # Returns
///
/// * `Ok(CrawlOutcome)` - The crawl drained; individual page failures are in `failures`
/// * `Err(CrawlError)` - The crawler could not be built
pub async fn run_recipe(config: &Config) -> Result<CrawlOutcome, CrawlError> {
    let crawler: Crawler<String> = Crawler::new(config.options())?;

    tracing::info!(
        "Running {} chains with concurrency {}",
        config.start.len(),
        crawler.concurrency()
    );
    for entry in &config.start {
        apply_steps(crawler.start(entry.url.as_str()), &entry.steps);
    }

    let results = crawler.results().await;
    let failures = crawler.failures().await;
    tracing::info!(
        "Crawl finished: {} results, {} failed pages",
        results.len(),
        failures.len()
    );

    Ok(CrawlOutcome { results, failures })
}

/// Queues configured steps on `job` and reports what the chain ends with
///
/// At a `click`, the remaining steps are queued on every clicked page instead and the
/// parent job reports nothing itself.
pub fn apply_steps<T>(job: Job<T>, steps: &[StepConfig]) -> Job<T>
where
    T: FromValue + Clone + Send + 'static,
{
    let mut job = job;

    for (index, step) in steps.iter().enumerate() {
        job = match step {
            StepConfig::Find(selector) => job.find(selector.as_str()),
            StepConfig::TextContent => job.text_content(),
            StepConfig::Attr(name) => job.attr(name.as_str()),
            StepConfig::Resolve => job.resolve(),
            StepConfig::Trim => job.map(trim),
            StepConfig::Contains(needle) => {
                let needle = needle.clone();
                job.filter(move |value| value.text().is_some_and(|text| text.contains(&needle)))
            }
            StepConfig::Click => {
                let rest = steps[index + 1..].to_vec();
                return job.click().for_each_job(move |page| {
                    apply_steps(page, &rest);
                });
            }
        };
    }

    job.report()
}

fn trim<T>(value: Value<T>) -> Value<T> {
    match value {
        Value::Text(text) => Value::Text(text.trim().to_string()),
        other => other,
    }
}
