//! Crawler coordinator - owns everything jobs share
//!
//! The crawler holds the scheduler that bounds concurrent steps, the fetch client every
//! download goes through, and the receiving end of the result sink. Jobs report leaf
//! values and failures by sending them to the sink; the crawler drains the sink into
//! its accumulator whenever results are requested.

use crate::crawler::fetcher::{Fetch, HttpFetcher};
use crate::crawler::job::Job;
use crate::crawler::scheduler::Scheduler;
use crate::{ConfigError, CrawlError, JobError};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

/// Number of steps allowed to run at once unless configured otherwise
pub const DEFAULT_CONCURRENCY: usize = 2;

/// Upper bound on the configurable concurrency
pub const MAX_CONCURRENCY: usize = 100;

/// Per-request timeout unless configured otherwise
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Options shared by every job of a crawler
#[derive(Debug, Clone)]
pub struct CrawlerOptions {
    /// Headers sent with every request
    pub headers: BTreeMap<String, String>,

    /// Maximum number of steps running at once across all jobs
    pub concurrency: usize,

    /// Timeout for a single request
    pub timeout: Duration,
}

impl Default for CrawlerOptions {
    fn default() -> Self {
        Self {
            headers: BTreeMap::new(),
            concurrency: DEFAULT_CONCURRENCY,
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl CrawlerOptions {
    /// Adds a header sent with every request
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Sets the concurrency limit
    pub fn concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }

    /// Sets the per-request timeout
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.concurrency < 1 || self.concurrency > MAX_CONCURRENCY {
            return Err(ConfigError::Validation(format!(
                "concurrency must be between 1 and {}, got {}",
                MAX_CONCURRENCY, self.concurrency
            )));
        }
        Ok(())
    }
}

/// A job whose chain failed, as recorded by the crawler
#[derive(Debug, Clone)]
pub struct JobFailure {
    /// URL of the failed job
    pub url: String,

    /// The first error raised by one of its steps
    pub error: JobError,
}

/// Message sent from a job to its crawler
pub(crate) enum Report<T> {
    Leaf(T),
    Failed(JobFailure),
}

/// State shared by every job of one crawler
pub(crate) struct Context<T> {
    pub(crate) scheduler: Scheduler,
    pub(crate) fetcher: Arc<dyn Fetch>,
    sink: UnboundedSender<Report<T>>,
}

impl<T> Context<T> {
    /// Sends a report to the crawler; reports sent after the crawler is gone are dropped
    pub(crate) fn send(&self, report: Report<T>) {
        if self.sink.send(report).is_err() {
            tracing::trace!("Crawler dropped, discarding report");
        }
    }
}

/// Entry point for chained crawls
///
/// `T` is the type of leaf results collected by [`Crawler::results`]; jobs convert the
/// values they report into it through [`crate::FromValue`].
pub struct Crawler<T> {
    context: Arc<Context<T>>,
    inbox: Mutex<UnboundedReceiver<Report<T>>>,
    results: Mutex<Vec<T>>,
    failures: Mutex<Vec<JobFailure>>,
}

impl<T: Clone + Send + 'static> Crawler<T> {
    /// Creates a crawler fetching over HTTP
    ///
    /// # Returns
    ///
    /// * `Ok(Crawler)` - Ready to start jobs
    /// * `Err(CrawlError)` - Invalid options or the HTTP client failed to build
    pub fn new(options: CrawlerOptions) -> Result<Self, CrawlError> {
        let fetcher = HttpFetcher::from_options(&options)?;
        Self::with_fetcher(options, Arc::new(fetcher))
    }

    /// Creates a crawler downloading pages through `fetcher`
    ///
    /// Headers and timeout in `options` only apply to fetchers built from them.
    pub fn with_fetcher(
        options: CrawlerOptions,
        fetcher: Arc<dyn Fetch>,
    ) -> Result<Self, CrawlError> {
        options.validate()?;

        let (sink, inbox) = mpsc::unbounded_channel();
        tracing::debug!("Creating crawler with concurrency {}", options.concurrency);

        Ok(Self {
            context: Arc::new(Context {
                scheduler: Scheduler::new(options.concurrency),
                fetcher,
                sink,
            }),
            inbox: Mutex::new(inbox),
            results: Mutex::new(Vec::new()),
            failures: Mutex::new(Vec::new()),
        })
    }

    /// Starts a root job for `url`
    ///
    /// The download is queued immediately; nothing has necessarily run when this returns.
    /// Must be called from within a Tokio runtime.
    pub fn start(&self, url: impl Into<String>) -> Job<T> {
        let url = url.into();
        tracing::info!("Starting job for {}", url);
        Job::spawn(Arc::clone(&self.context), url)
    }

    /// Waits until every queued step has finished and returns all reported results
    ///
    /// Results appear in the order reports completed, not the order pages were found.
    /// Failed jobs contribute nothing; see [`Crawler::failures`].
    pub async fn results(&self) -> Vec<T> {
        self.context.scheduler.wait_idle().await;
        self.collect();
        lock(&self.results).clone()
    }

    /// Waits until every queued step has finished and returns every failed job
    pub async fn failures(&self) -> Vec<JobFailure> {
        self.context.scheduler.wait_idle().await;
        self.collect();
        lock(&self.failures).clone()
    }

    /// Returns the number of queued steps that have not finished
    pub fn pending(&self) -> usize {
        self.context.scheduler.pending()
    }

    /// Returns the concurrency limit
    pub fn concurrency(&self) -> usize {
        self.context.scheduler.capacity()
    }

    /// Moves every report waiting in the sink into the accumulators
    fn collect(&self) {
        let mut inbox = lock(&self.inbox);
        while let Ok(report) = inbox.try_recv() {
            match report {
                Report::Leaf(value) => lock(&self.results).push(value),
                Report::Failed(failure) => lock(&self.failures).push(failure),
            }
        }
    }
}

/// Locks a mutex, recovering the data if a panicking step poisoned it
pub(crate) fn lock<V>(mutex: &Mutex<V>) -> MutexGuard<'_, V> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
