//! Configuration module for crawl recipes
//!
//! This module handles loading, parsing, and validating TOML recipe files. A recipe names
//! the root pages to start from and the chain of steps to run on each; validation checks
//! every chain against the result-state transitions before anything is fetched.
//!
//! # Example
//!
//! ```no_run
//! use crawl_chain::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("recipe.toml")).unwrap();
//! println!("Crawler will run {} steps at once", config.crawler.concurrency);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{Config, CrawlerConfig, StartEntry, StepConfig};

// Re-export parser functions
pub use parser::{load_config, parse_config};
