//! HTTP fetcher implementation
//!
//! This module handles all page downloads for the crawler, including:
//! - Building one HTTP client per crawler with its default headers and timeouts
//! - GET requests returning the page body
//! - Error classification (timeouts, invalid URLs, HTTP status codes)
//!
//! Jobs only see the [`Fetch`] trait, so tests and embedders can swap the transport.

use crate::crawler::CrawlerOptions;
use crate::{ConfigError, CrawlError, FetchError};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::Client;
use std::collections::BTreeMap;
use std::time::Duration;

/// Downloads page bodies for jobs
#[async_trait]
pub trait Fetch: Send + Sync {
    /// Fetches `url` and returns the response body as text
    async fn get(&self, url: &str) -> Result<String, FetchError>;
}

/// [`Fetch`] implementation backed by a shared `reqwest` client
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    /// Wraps an already configured client
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Builds a fetcher from crawler options
    pub fn from_options(options: &CrawlerOptions) -> Result<Self, CrawlError> {
        Ok(Self::new(build_http_client(options)?))
    }
}

#[async_trait]
impl Fetch for HttpFetcher {
    async fn get(&self, url: &str) -> Result<String, FetchError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| classify_error(url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        response.text().await.map_err(|e| classify_error(url, e))
    }
}

/// Builds an HTTP client with the crawler's headers and timeouts
///
/// # Arguments
///
/// * `options` - The crawler options
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(CrawlError)` - A header is invalid or the client failed to build
///
/// # Example
///
/// ```no_run
/// use crawl_chain::crawler::{build_http_client, CrawlerOptions};
///
/// let options = CrawlerOptions::default().header("accept-language", "en");
/// let client = build_http_client(&options).unwrap();
/// ```
pub fn build_http_client(options: &CrawlerOptions) -> Result<Client, CrawlError> {
    let headers = build_headers(&options.headers)?;

    Ok(Client::builder()
        .default_headers(headers)
        .timeout(options.timeout)
        .connect_timeout(Duration::from_secs(10))
        .gzip(true)
        .brotli(true)
        .build()?)
}

/// Converts header strings into a header map, rejecting invalid names and values
pub fn build_headers(configured: &BTreeMap<String, String>) -> Result<HeaderMap, ConfigError> {
    let mut headers = HeaderMap::new();

    for (name, value) in configured {
        let header_name =
            HeaderName::from_bytes(name.as_bytes()).map_err(|e| ConfigError::InvalidHeader {
                name: name.clone(),
                message: e.to_string(),
            })?;
        let header_value = HeaderValue::from_str(value).map_err(|e| ConfigError::InvalidHeader {
            name: name.clone(),
            message: e.to_string(),
        })?;
        headers.insert(header_name, header_value);
    }

    Ok(headers)
}

/// Maps a reqwest error onto the fetch error kinds jobs report
fn classify_error(url: &str, error: reqwest::Error) -> FetchError {
    if error.is_timeout() {
        FetchError::Timeout {
            url: url.to_string(),
        }
    } else if error.is_builder() {
        FetchError::InvalidUrl {
            url: url.to_string(),
            message: error.to_string(),
        }
    } else if let Some(status) = error.status() {
        FetchError::Status {
            url: url.to_string(),
            status: status.as_u16(),
        }
    } else {
        FetchError::Http {
            url: url.to_string(),
            message: error.to_string(),
        }
    }
}
