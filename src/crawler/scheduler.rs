//! Scheduler for bounding concurrent steps and detecting drain
//!
//! This module handles:
//! - Global concurrency limiting via a semaphore shared by every job of a crawler
//! - Counting pending steps, both per job and per crawler
//! - Awaiting the moment a pending count reaches zero

use std::sync::Arc;
use tokio::sync::{watch, OwnedSemaphorePermit, Semaphore};

/// A counter of pending work with an awaitable "drained" signal
///
/// Each unit of work holds a [`PendingSlot`] from [`PendingCount::track`]; dropping the
/// slot releases it. Waiters observe the count through a watch channel, so a wait that
/// starts after the count already reached zero returns immediately.
#[derive(Debug, Clone)]
pub(crate) struct PendingCount {
    count: Arc<watch::Sender<usize>>,
}

impl PendingCount {
    /// Creates a counter at zero
    pub(crate) fn new() -> Self {
        let (count, _) = watch::channel(0);
        Self {
            count: Arc::new(count),
        }
    }

    /// Registers one unit of pending work
    pub(crate) fn track(&self) -> PendingSlot {
        self.count.send_modify(|count| *count += 1);
        PendingSlot {
            count: Arc::clone(&self.count),
        }
    }

    /// Returns the number of pending units
    pub(crate) fn get(&self) -> usize {
        *self.count.borrow()
    }

    /// Waits until no unit is pending
    pub(crate) async fn wait_idle(&self) {
        let mut updates = self.count.subscribe();
        // The sender lives in `self`, so the channel cannot close while we wait.
        let _ = updates.wait_for(|count| *count == 0).await;
    }
}

impl Default for PendingCount {
    fn default() -> Self {
        Self::new()
    }
}

/// One unit of pending work, released on drop
#[derive(Debug)]
pub(crate) struct PendingSlot {
    count: Arc<watch::Sender<usize>>,
}

impl Drop for PendingSlot {
    fn drop(&mut self) {
        self.count.send_modify(|count| *count = count.saturating_sub(1));
    }
}

/// Scheduler shared by all jobs of one crawler
///
/// The scheduler coordinates:
/// - The global concurrency limit (at most `capacity` steps run at once)
/// - The global pending count used by `Crawler::results`
#[derive(Debug)]
pub(crate) struct Scheduler {
    /// Global semaphore for limiting concurrently running steps
    permits: Arc<Semaphore>,

    /// Number of permits the semaphore started with
    capacity: usize,

    /// Steps submitted but not finished, across every job
    pending: PendingCount,
}

impl Scheduler {
    /// Creates a new scheduler allowing `capacity` concurrent steps
    pub(crate) fn new(capacity: usize) -> Self {
        Self {
            permits: Arc::new(Semaphore::new(capacity)),
            capacity,
            pending: PendingCount::new(),
        }
    }

    /// Registers a newly queued step
    pub(crate) fn submit(&self) -> PendingSlot {
        self.pending.track()
    }

    /// Waits for a free concurrency slot
    ///
    /// Returns `None` only if the semaphore was closed, which the scheduler never does.
    pub(crate) async fn acquire(&self) -> Option<OwnedSemaphorePermit> {
        Arc::clone(&self.permits).acquire_owned().await.ok()
    }

    /// Returns the configured concurrency limit
    pub(crate) fn capacity(&self) -> usize {
        self.capacity
    }

    /// Returns the number of steps currently holding a permit
    #[cfg(test)]
    fn running(&self) -> usize {
        self.capacity - self.permits.available_permits()
    }

    /// Returns the number of submitted steps that have not finished
    pub(crate) fn pending(&self) -> usize {
        self.pending.get()
    }

    /// Waits until every submitted step has finished
    pub(crate) async fn wait_idle(&self) {
        self.pending.wait_idle().await
    }
}
