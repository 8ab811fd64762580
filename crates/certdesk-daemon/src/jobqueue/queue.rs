//! Bounded multi-worker job runner.
//!
//! Workers share one receiver; each job runs in its own task so a panic
//! inside an action is reported and the worker keeps going.

use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use super::{ActionQueue, Job, QueueError};

/// Default number of worker tasks.
const DEFAULT_WORKERS: usize = 4;

/// Default number of jobs that may wait for a worker.
const DEFAULT_CAPACITY: usize = 256;

/// Sizing for a [`JobQueue`]. Zero values fall back to the defaults.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JobQueueConfig {
    pub workers: usize,
    pub capacity: usize,
}

impl Default for JobQueueConfig {
    fn default() -> Self {
        Self {
            workers: DEFAULT_WORKERS,
            capacity: DEFAULT_CAPACITY,
        }
    }
}

pub struct JobQueue {
    sender: Mutex<Option<mpsc::Sender<Job>>>,
    workers: Mutex<Vec<JoinHandle<()>>>,
    worker_count: usize,
    capacity: usize,
}

impl JobQueue {
    /// Spawn the worker tasks. Must be called from within a Tokio runtime.
    pub fn start(config: JobQueueConfig) -> Self {
        let worker_count = if config.workers == 0 {
            DEFAULT_WORKERS
        } else {
            config.workers
        };
        let capacity = if config.capacity == 0 {
            DEFAULT_CAPACITY
        } else {
            config.capacity
        };

        let (tx, rx) = mpsc::channel::<Job>(capacity);
        let rx = Arc::new(tokio::sync::Mutex::new(rx));

        let workers = (0..worker_count)
            .map(|worker| tokio::spawn(worker_loop(worker, Arc::clone(&rx))))
            .collect();

        info!(workers = worker_count, capacity, "Job queue started");

        Self {
            sender: Mutex::new(Some(tx)),
            workers: Mutex::new(workers),
            worker_count,
            capacity,
        }
    }

    pub const fn worker_count(&self) -> usize {
        self.worker_count
    }

    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Stop accepting jobs and wait for queued jobs to finish.
    pub async fn shutdown(&self) {
        drop(
            self.sender
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .take(),
        );

        let handles =
            std::mem::take(&mut *self.workers.lock().unwrap_or_else(PoisonError::into_inner));
        for handle in handles {
            if let Err(e) = handle.await {
                warn!(error = %e, "Job worker exited abnormally");
            }
        }

        info!("Job queue stopped");
    }
}

impl ActionQueue for JobQueue {
    fn enqueue(&self, job: Job) -> Result<(), QueueError> {
        let guard = self.sender.lock().unwrap_or_else(PoisonError::into_inner);
        let Some(sender) = guard.as_ref() else {
            return Err(QueueError::Closed(job.name));
        };

        sender.try_send(job).map_err(|e| match e {
            TrySendError::Full(job) => QueueError::Full(job.name),
            TrySendError::Closed(job) => QueueError::Closed(job.name),
        })
    }
}

async fn worker_loop(worker: usize, rx: Arc<tokio::sync::Mutex<mpsc::Receiver<Job>>>) {
    loop {
        let next = rx.lock().await.recv().await;
        let Some(job) = next else {
            break;
        };
        run_job(worker, job).await;
    }
    debug!(worker, "Job worker stopped");
}

async fn run_job(worker: usize, job: Job) {
    let Job { name, action } = job;
    debug!(worker, job = %name, "Running job");

    match tokio::spawn(action()).await {
        Ok(Ok(())) => debug!(worker, job = %name, "Job completed"),
        Ok(Err(e)) => error!(worker, job = %name, error = %format!("{e:#}"), "Job failed"),
        Err(e) => error!(worker, job = %name, error = %e, "Job aborted"),
    }
}

#[cfg(test)]
#[allow(clippy::panic, clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use tokio::sync::oneshot;

    use super::*;

    const WAIT: Duration = Duration::from_secs(5);

    #[tokio::test]
    async fn zero_config_uses_defaults() {
        let queue = JobQueue::start(JobQueueConfig {
            workers: 0,
            capacity: 0,
        });
        assert_eq!(queue.worker_count(), DEFAULT_WORKERS);
        assert_eq!(queue.capacity(), DEFAULT_CAPACITY);
        queue.shutdown().await;
    }

    #[tokio::test]
    async fn enqueued_jobs_run() {
        let queue = JobQueue::start(JobQueueConfig::default());
        let counter = Arc::new(AtomicUsize::new(0));

        for _ in 0..10 {
            let counter = Arc::clone(&counter);
            queue
                .enqueue(Job::new("Count", move || async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                }))
                .unwrap();
        }

        tokio::time::timeout(WAIT, queue.shutdown()).await.unwrap();
        assert_eq!(counter.load(Ordering::SeqCst), 10);
    }

    #[tokio::test]
    async fn full_queue_rejects_without_blocking() {
        let queue = JobQueue::start(JobQueueConfig {
            workers: 1,
            capacity: 1,
        });

        let (started_tx, started_rx) = oneshot::channel::<()>();
        let (release_tx, release_rx) = oneshot::channel::<()>();
        queue
            .enqueue(Job::new("Blocker", move || async move {
                let _ = started_tx.send(());
                let _ = release_rx.await;
                Ok(())
            }))
            .unwrap();
        tokio::time::timeout(WAIT, started_rx).await.unwrap().unwrap();

        queue
            .enqueue(Job::new("Waiting", || async { Ok(()) }))
            .unwrap();
        let err = queue
            .enqueue(Job::new("Overflow", || async { Ok(()) }))
            .unwrap_err();
        assert_eq!(err, QueueError::Full("Overflow".into()));

        release_tx.send(()).unwrap();
        tokio::time::timeout(WAIT, queue.shutdown()).await.unwrap();
    }

    #[tokio::test]
    async fn closed_queue_rejects_jobs() {
        let queue = JobQueue::start(JobQueueConfig::default());
        queue.shutdown().await;

        let err = queue
            .enqueue(Job::new("Late", || async { Ok(()) }))
            .unwrap_err();
        assert_eq!(err, QueueError::Closed("Late".into()));
    }

    #[tokio::test]
    async fn failing_and_panicking_jobs_do_not_stop_worker() {
        let queue = JobQueue::start(JobQueueConfig {
            workers: 1,
            capacity: 8,
        });
        let (done_tx, done_rx) = oneshot::channel::<()>();

        queue
            .enqueue(Job::new("Fails", || async { Err(anyhow::anyhow!("boom")) }))
            .unwrap();
        queue
            .enqueue(Job::new("Panics", || async {
                let fail = true;
                assert!(!fail, "worker must survive");
                Ok(())
            }))
            .unwrap();
        queue
            .enqueue(Job::new("Succeeds", move || async move {
                let _ = done_tx.send(());
                Ok(())
            }))
            .unwrap();

        tokio::time::timeout(WAIT, done_rx).await.unwrap().unwrap();
        queue.shutdown().await;
    }

    #[test]
    fn job_debug_shows_name() {
        let job = Job::new("RequestCertificate", || async { Ok(()) });
        assert!(format!("{job:?}").contains("RequestCertificate"));
    }
}
