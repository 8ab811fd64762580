//! Asynchronous action queue.
//!
//! - [`Job`]: a named, zero-argument action producing an error on failure.
//! - [`ActionQueue`]: the enqueue contract dispatchers are written against.
//! - [`JobQueue`]: bounded multi-worker runner backed by a Tokio channel.

mod queue;

use std::fmt;
use std::future::Future;

use futures::future::BoxFuture;

pub use queue::{JobQueue, JobQueueConfig};

/// Future returned by a job action.
pub type JobFuture = BoxFuture<'static, anyhow::Result<()>>;

/// A zero-argument operation run once by a worker.
pub type JobAction = Box<dyn FnOnce() -> JobFuture + Send>;

/// A named unit of work.
pub struct Job {
    pub name: String,
    pub action: JobAction,
}

impl Job {
    pub fn new<F, Fut>(name: impl Into<String>, action: F) -> Self
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        Self {
            name: name.into(),
            action: Box::new(move || Box::pin(action())),
        }
    }
}

impl fmt::Debug for Job {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Job").field("name", &self.name).finish_non_exhaustive()
    }
}

/// Accepts jobs for asynchronous execution.
///
/// `enqueue` never waits for the job to run and never blocks on a full
/// queue; it reports [`QueueError::Full`] instead.
pub trait ActionQueue: Send + Sync {
    fn enqueue(&self, job: Job) -> Result<(), QueueError>;
}

/// Errors from enqueueing a job.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum QueueError {
    /// No free slot in the queue.
    #[error("Job queue is full, rejected job {0}")]
    Full(String),

    /// The queue has been shut down.
    #[error("Job queue is closed, rejected job {0}")]
    Closed(String),
}
