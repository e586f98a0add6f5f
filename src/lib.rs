//! crawl-chain: lazily chained page crawling
//!
//! This crate lets a caller describe a chain of fetch-and-extract steps starting from a
//! URL, fan out into child pages by "clicking" matched links, and collect every leaf
//! result into one list while a fixed number of steps run concurrently.
//!
//! ```no_run
//! use crawl_chain::crawler::{Crawler, CrawlerOptions};
//!
//! # async fn example() -> crawl_chain::Result<()> {
//! let crawler: Crawler<String> = Crawler::new(CrawlerOptions::default())?;
//! crawler
//!     .start("https://example.com/")
//!     .find("a")
//!     .click()
//!     .for_each_job(|page| {
//!         page.find("h1").text_content().report();
//!     });
//!
//! for title in crawler.results().await {
//!     println!("{}", title);
//! }
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod crawler;
pub mod state;
pub mod url;

use thiserror::Error;

/// Main error type for crawler construction and recipe runs
#[derive(Debug, Error)]
pub enum CrawlError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors raised by a step of a job's chain
///
/// These surface only when something awaits the failing job.
#[derive(Debug, Clone, Error)]
pub enum JobError {
    #[error("Cannot run `{operation}` on {found} results (expected {expected})")]
    State {
        operation: &'static str,
        expected: &'static str,
        found: state::ResultKind,
    },

    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error("Invalid selector `{selector}`: {message}")]
    Selector { selector: String, message: String },

    #[error("Cannot report a {kind} value as a result")]
    Unreportable { kind: &'static str },

    #[error("Closure passed to `{operation}` panicked: {message}")]
    Panicked {
        operation: &'static str,
        message: String,
    },
}

impl JobError {
    /// Returns true if the job ran an operation its current state does not allow
    pub fn is_state_error(&self) -> bool {
        matches!(self, Self::State { .. })
    }
}

/// Errors raised while downloading a page
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    #[error("Invalid URL {url}: {message}")]
    InvalidUrl { url: String, message: String },

    #[error("HTTP error for {url}: {message}")]
    Http { url: String, message: String },

    #[error("HTTP {status} for {url}")]
    Status { url: String, status: u16 },

    #[error("Request timeout for {url}")]
    Timeout { url: String },
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),

    #[error("Invalid selector in config: {0}")]
    InvalidSelector(String),

    #[error("Invalid header `{name}`: {message}")]
    InvalidHeader { name: String, message: String },
}

/// URL-specific errors
#[derive(Debug, Error)]
pub enum UrlError {
    #[error("Failed to parse URL: {0}")]
    Parse(String),

    #[error("Invalid base URL: {0}")]
    InvalidBase(String),
}

/// Result type alias for crawl-chain operations
pub type Result<T> = std::result::Result<T, CrawlError>;

/// Result type alias for job steps
pub type JobResult<T> = std::result::Result<T, JobError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for URL operations
pub type UrlResult<T> = std::result::Result<T, UrlError>;

// Re-export commonly used types
pub use config::Config;
pub use crawler::{Crawler, CrawlerOptions, Job, JobFailure};
pub use state::{FromValue, Payload, ResultKind, Value};
pub use url::{resolve_url, try_resolve};
