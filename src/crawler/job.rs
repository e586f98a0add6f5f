//! Jobs - lazily chained steps against one page
//!
//! A [`Job`] is a handle to one page. Chain calls only queue a step; a single worker
//! task per job drains the queue in order, taking a permit from the crawler's scheduler
//! for every step it runs. Each queued step also holds a pending slot in both the job's
//! counter and the crawler's counter until it has finished, which is what `wait` and
//! `Crawler::results` await.
//!
//! The first failing step marks the job failed. Later steps are skipped, but still
//! release their slots so nothing waiting on the crawler hangs.

use crate::crawler::coordinator::{lock, Context, JobFailure, Report};
use crate::crawler::parser::Document;
use crate::crawler::scheduler::{PendingCount, PendingSlot};
use crate::state::{FromValue, Payload, ResultKind, Value};
use crate::url::try_resolve;
use crate::{JobError, JobResult};
use std::fmt;
use std::future::Future;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

type MapFn<T> = Box<dyn FnMut(Value<T>) -> Value<T> + Send>;
type FilterFn<T> = Box<dyn FnMut(&Value<T>) -> bool + Send>;
type ReplaceFn<T> = Box<dyn FnOnce(Vec<Value<T>>) -> Value<T> + Send>;
type JobFn<T> = Box<dyn FnMut(Job<T>) + Send>;

/// One queued operation of a job's chain
enum Step<T> {
    Download,
    Find(String),
    TextContent,
    Attr(String),
    Click,
    Resolve,
    Map(MapFn<T>),
    Filter(FilterFn<T>),
    Replace(ReplaceFn<T>),
    ForEachJob(JobFn<T>),
    Report(fn(Value<T>) -> Option<T>),
}

impl<T> Step<T> {
    fn name(&self) -> &'static str {
        match self {
            Self::Download => "download",
            Self::Find(_) => "find",
            Self::TextContent => "text_content",
            Self::Attr(_) => "attr",
            Self::Click => "click",
            Self::Resolve => "resolve",
            Self::Map(_) => "map",
            Self::Filter(_) => "filter",
            Self::Replace(_) => "replace",
            Self::ForEachJob(_) => "for_each_job",
            Self::Report(_) => "report",
        }
    }
}

/// A step together with the pending slots it holds until it finishes
struct Queued<T> {
    step: Step<T>,
    job_slot: PendingSlot,
    crawl_slot: PendingSlot,
}

/// State owned by a job's worker and shared with its handles
struct JobCore<T> {
    url: String,
    context: Arc<Context<T>>,
    payload: Mutex<Payload<T>>,
    failure: Mutex<Option<JobError>>,
    pending: PendingCount,
}

impl<T: Clone + Send + 'static> JobCore<T> {
    fn has_failed(&self) -> bool {
        lock(&self.failure).is_some()
    }

    fn fail(&self, error: JobError) {
        tracing::warn!("Job {} failed: {}", self.url, error);
        *lock(&self.failure) = Some(error.clone());
        self.context.send(Report::Failed(JobFailure {
            url: self.url.clone(),
            error,
        }));
    }

    async fn download(&self) -> JobResult<()> {
        let body = self.context.fetcher.get(&self.url).await?;
        tracing::debug!("Downloaded {} ({} bytes)", self.url, body.len());

        *lock(&self.payload) = Payload::Document(Document::new(self.url.clone(), body));
        Ok(())
    }

    async fn execute(&self, step: Step<T>) -> JobResult<()> {
        match step {
            Step::Download => self.download().await,
            Step::Find(selector) => self.update(|payload| payload.find(&selector)),
            Step::TextContent => self.update(Payload::text_content),
            Step::Attr(name) => self.update(|payload| payload.attr(&name)),
            Step::Resolve => self.update(|payload| payload.resolve(&self.url)),
            Step::Map(f) => self.transform("map", |payload| payload.map(f)),
            Step::Filter(keep) => self.transform("filter", |payload| payload.filter(keep)),
            Step::Replace(f) => self.transform("replace", |payload| {
                payload.replace(f);
                Ok(())
            }),
            Step::Click => self.click(),
            Step::ForEachJob(f) => self.for_each_job(f),
            Step::Report(convert) => self.report(convert),
        }
    }

    /// Applies a built-in transition to the payload under its lock
    fn update<F>(&self, f: F) -> JobResult<()>
    where
        F: FnOnce(&mut Payload<T>) -> JobResult<()>,
    {
        f(&mut lock(&self.payload))
    }

    /// Applies a transition that runs caller code
    ///
    /// The closure works on a copy with the lock released, so it may inspect this job.
    /// The payload is only replaced once the closure has returned successfully.
    fn transform<F>(&self, operation: &'static str, f: F) -> JobResult<()>
    where
        F: FnOnce(&mut Payload<T>) -> JobResult<()>,
    {
        let mut payload = lock(&self.payload).clone();
        guarded(operation, || f(&mut payload))??;

        *lock(&self.payload) = payload;
        Ok(())
    }

    fn click(&self) -> JobResult<()> {
        let hrefs = lock(&self.payload).hrefs()?;

        let mut children = Vec::with_capacity(hrefs.len());
        for href in hrefs {
            match try_resolve(&self.url, &href) {
                Ok(url) => children.push(Job::spawn(Arc::clone(&self.context), url.into())),
                Err(e) => tracing::debug!("Skipping link {:?} on {}: {}", href, self.url, e),
            }
        }

        tracing::debug!("Clicked {} links on {}", children.len(), self.url);
        *lock(&self.payload) = Payload::Jobs(children);
        Ok(())
    }

    fn for_each_job(&self, mut f: JobFn<T>) -> JobResult<()> {
        let jobs = match &*lock(&self.payload) {
            Payload::Jobs(jobs) => jobs.clone(),
            other => {
                return Err(JobError::State {
                    operation: "for_each_job",
                    expected: ResultKind::Jobs.as_str(),
                    found: other.kind(),
                })
            }
        };

        guarded("for_each_job", || {
            for job in jobs {
                f(job);
            }
        })
    }

    fn report(&self, convert: fn(Value<T>) -> Option<T>) -> JobResult<()> {
        let values = lock(&self.payload).to_values();

        let mut leaves = Vec::with_capacity(values.len());
        for value in values {
            let kind = value.kind_name();
            let leaf = guarded("report", || convert(value))?;
            leaves.push(leaf.ok_or(JobError::Unreportable { kind })?);
        }

        tracing::debug!("Reporting {} results from {}", leaves.len(), self.url);
        for leaf in leaves {
            self.context.send(Report::Leaf(leaf));
        }
        Ok(())
    }
}

/// Runs caller code, turning a panic into a job error
fn guarded<R>(operation: &'static str, f: impl FnOnce() -> R) -> JobResult<R> {
    panic::catch_unwind(AssertUnwindSafe(f)).map_err(|cause| {
        let message = if let Some(text) = cause.downcast_ref::<&str>() {
            text.to_string()
        } else if let Some(text) = cause.downcast_ref::<String>() {
            text.clone()
        } else {
            "unknown panic".to_string()
        };
        JobError::Panicked { operation, message }
    })
}

/// Drains a job's step queue until every handle to the job is gone
async fn run<T: Clone + Send + 'static>(
    core: Arc<JobCore<T>>,
    mut steps: UnboundedReceiver<Queued<T>>,
) {
    while let Some(Queued {
        step,
        job_slot,
        crawl_slot,
    }) = steps.recv().await
    {
        if core.has_failed() {
            tracing::trace!("Skipping {} on failed job {}", step.name(), core.url);
        } else {
            let _permit = core.context.scheduler.acquire().await;
            tracing::debug!("Running {} on {}", step.name(), core.url);

            if let Err(error) = core.execute(step).await {
                core.fail(error);
            }
        }

        // The crawler-wide slot goes last so a drained crawler implies drained jobs
        drop(job_slot);
        drop(crawl_slot);
    }

    tracing::trace!("Worker for {} finished", core.url);
}

/// Handle to one page and its chain of queued steps
///
/// Chain methods queue a step and return the handle, so a whole chain can be described
/// before anything has been downloaded. Handles are cheap to clone and all clones refer
/// to the same job.
pub struct Job<T> {
    core: Arc<JobCore<T>>,
    steps: UnboundedSender<Queued<T>>,
}

impl<T: Clone + Send + 'static> Job<T> {
    /// Creates a job for `url` and queues its download
    pub(crate) fn spawn(context: Arc<Context<T>>, url: String) -> Self {
        let (steps, receiver) = mpsc::unbounded_channel();
        let core = Arc::new(JobCore {
            url,
            context,
            payload: Mutex::new(Payload::Empty),
            failure: Mutex::new(None),
            pending: PendingCount::new(),
        });
        tokio::spawn(run(Arc::clone(&core), receiver));

        let job = Self { core, steps };
        job.enqueue(Step::Download);
        job
    }

    fn enqueue(&self, step: Step<T>) {
        tracing::trace!("Queueing {} on {}", step.name(), self.core.url);

        let queued = Queued {
            step,
            job_slot: self.core.pending.track(),
            crawl_slot: self.core.context.scheduler.submit(),
        };
        if self.steps.send(queued).is_err() {
            tracing::warn!("Worker for {} is gone, dropping step", self.core.url);
        }
    }

    /// Selects the elements matching a CSS selector (Document -> ElementSet)
    pub fn find(self, selector: impl Into<String>) -> Self {
        self.enqueue(Step::Find(selector.into()));
        self
    }

    /// Replaces each element with its text content (ElementSet -> StringList)
    pub fn text_content(self) -> Self {
        self.enqueue(Step::TextContent);
        self
    }

    /// Replaces each element with the value of an attribute (ElementSet -> StringList)
    ///
    /// Elements without the attribute are dropped.
    pub fn attr(self, name: impl Into<String>) -> Self {
        self.enqueue(Step::Attr(name.into()));
        self
    }

    /// Starts a child job for every element's `href` (ElementSet -> JobList)
    ///
    /// Links are resolved against this job's URL; links that do not resolve are skipped.
    pub fn click(self) -> Self {
        self.enqueue(Step::Click);
        self
    }

    /// Resolves every string against this job's URL (StringList -> StringList)
    pub fn resolve(self) -> Self {
        self.enqueue(Step::Resolve);
        self
    }

    /// Transforms every item of a list; the new state is inferred from the output
    pub fn map<F>(self, f: F) -> Self
    where
        F: FnMut(Value<T>) -> Value<T> + Send + 'static,
    {
        self.enqueue(Step::Map(Box::new(f)));
        self
    }

    /// Keeps the items of a list for which `keep` returns true
    pub fn filter<F>(self, keep: F) -> Self
    where
        F: FnMut(&Value<T>) -> bool + Send + 'static,
    {
        self.enqueue(Step::Filter(Box::new(keep)));
        self
    }

    /// Replaces the whole result with the value `f` builds from it
    ///
    /// `f` receives the current result as a list (a document or a single custom value
    /// becomes a list of one, an empty job an empty list).
    pub fn replace<F>(self, f: F) -> Self
    where
        F: FnOnce(Vec<Value<T>>) -> Value<T> + Send + 'static,
    {
        self.enqueue(Step::Replace(Box::new(f)));
        self
    }

    /// Runs `f` on every child job once `click` has produced them
    ///
    /// `f` runs as a step of this job, so steps it queues on the children are counted
    /// by the crawler before this step finishes.
    pub fn for_each_job<F>(self, f: F) -> Self
    where
        F: FnMut(Job<T>) + Send + 'static,
    {
        self.enqueue(Step::ForEachJob(Box::new(f)));
        self
    }

    /// Queues reporting of the current result to the crawler without waiting
    pub fn report(self) -> Self
    where
        T: FromValue,
    {
        self.enqueue(Step::Report(T::from_value));
        self
    }

    /// Reports the current result to the crawler and waits for the job to drain
    ///
    /// The report is queued when this is called, not when the future is first polled,
    /// so `Crawler::results` accounts for it even if the future is never awaited.
    pub fn result(&self) -> impl Future<Output = JobResult<Job<T>>> + Send + 'static
    where
        T: FromValue,
    {
        let job = self.clone().report();
        async move {
            job.wait().await?;
            Ok(job)
        }
    }

    /// Waits for the job to drain and returns its result as a list
    ///
    /// Calling it again without queueing more steps returns the same values.
    pub async fn get(&self) -> JobResult<Vec<Value<T>>> {
        self.wait().await?;
        let values = lock(&self.core.payload).to_values();
        Ok(values)
    }

    /// Waits for the job to drain and calls `f` with every item of its list result
    pub async fn each<F>(&self, mut f: F) -> JobResult<Job<T>>
    where
        F: FnMut(Value<T>),
    {
        self.wait().await?;

        let payload = lock(&self.core.payload).clone();
        if !payload.is_list() {
            return Err(JobError::State {
                operation: "each",
                expected: "list",
                found: payload.kind(),
            });
        }

        for value in payload.into_values() {
            f(value);
        }
        Ok(self.clone())
    }

    /// Waits until every queued step has finished
    ///
    /// # Returns
    ///
    /// * `Ok(())` - Every step succeeded
    /// * `Err(JobError)` - The first step that failed
    pub async fn wait(&self) -> JobResult<()> {
        self.core.pending.wait_idle().await;

        let failure = lock(&self.core.failure).clone();
        match failure {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }
}

impl<T> Job<T> {
    /// Returns the page URL
    pub fn url(&self) -> &str {
        &self.core.url
    }

    /// Returns the kind of the current result
    ///
    /// Queued steps that have not run yet are not reflected.
    pub fn kind(&self) -> ResultKind {
        lock(&self.core.payload).kind()
    }

    /// Returns the number of queued steps that have not finished
    pub fn pending(&self) -> usize {
        self.core.pending.get()
    }
}

impl<T> Clone for Job<T> {
    fn clone(&self) -> Self {
        Self {
            core: Arc::clone(&self.core),
            steps: self.steps.clone(),
        }
    }
}

impl<T> PartialEq for Job<T> {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.core, &other.core)
    }
}

impl<T> fmt::Debug for Job<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Job").field("url", &self.core.url).finish()
    }
}
