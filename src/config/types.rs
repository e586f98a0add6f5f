use crate::crawler::{CrawlerOptions, DEFAULT_CONCURRENCY, DEFAULT_TIMEOUT};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

/// Main configuration structure for crawl-chain recipes
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub crawler: CrawlerConfig,

    /// Headers sent with every request
    #[serde(default)]
    pub headers: BTreeMap<String, String>,

    /// Root pages and the chain of steps to run on each
    #[serde(default)]
    pub start: Vec<StartEntry>,
}

impl Config {
    /// Returns the crawler options described by this configuration
    pub fn options(&self) -> CrawlerOptions {
        CrawlerOptions {
            headers: self.headers.clone(),
            concurrency: self.crawler.concurrency,
            timeout: Duration::from_secs(self.crawler.timeout_secs),
        }
    }
}

/// Crawler behavior configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlerConfig {
    /// Maximum number of steps running at once
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    /// Timeout for a single request (seconds)
    #[serde(rename = "timeout-secs", default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            concurrency: default_concurrency(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_concurrency() -> usize {
    DEFAULT_CONCURRENCY
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT.as_secs()
}

/// A root page and the steps run against it
#[derive(Debug, Clone, Deserialize)]
pub struct StartEntry {
    pub url: String,

    /// Steps after a `click` apply to every clicked page
    #[serde(default)]
    pub steps: Vec<StepConfig>,
}

/// One step of a configured chain
///
/// Unit steps are written as strings (`"click"`), steps with an argument as inline
/// tables (`{ find = "main a" }`).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StepConfig {
    /// Select elements with a CSS selector
    Find(String),

    /// Take the text of each element
    TextContent,

    /// Take an attribute of each element
    Attr(String),

    /// Follow the `href` of each element
    Click,

    /// Resolve each string against the page URL
    Resolve,

    /// Trim surrounding whitespace from each string
    Trim,

    /// Keep entries whose text contains the given needle
    Contains(String),
}

impl fmt::Display for StepConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Find(selector) => write!(f, "find {:?}", selector),
            Self::TextContent => write!(f, "text-content"),
            Self::Attr(name) => write!(f, "attr {:?}", name),
            Self::Click => write!(f, "click"),
            Self::Resolve => write!(f, "resolve"),
            Self::Trim => write!(f, "trim"),
            Self::Contains(needle) => write!(f, "contains {:?}", needle),
        }
    }
}
