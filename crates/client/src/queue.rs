//! Named FIFO work queues over the tokio runtime.

use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::mpsc;

type Job = Box<dyn FnOnce() + Send + 'static>;

/// A FIFO work queue backed by the runtime's thread pool.
///
/// Jobs on one queue run in submission order; independent queues are
/// unordered relative to each other. `dispatch` never blocks the caller.
/// Jobs should be short; long work belongs on a spawned task.
#[derive(Clone)]
pub struct WorkQueue {
    label: &'static str,
    jobs: mpsc::UnboundedSender<Job>,
    runtime: Handle,
}

impl WorkQueue {
    /// Create a queue and start draining it.
    ///
    /// # Panics
    ///
    /// Panics if called outside a tokio runtime.
    pub fn new(label: &'static str) -> Self {
        let (jobs, mut rx) = mpsc::unbounded_channel::<Job>();
        let runtime = Handle::current();
        runtime.spawn(async move {
            while let Some(job) = rx.recv().await {
                job();
            }
        });
        Self {
            label,
            jobs,
            runtime,
        }
    }

    /// Enqueue a job to run after everything already queued.
    pub fn dispatch(&self, job: impl FnOnce() + Send + 'static) {
        if self.jobs.send(Box::new(job)).is_err() {
            tracing::debug!(queue = self.label, "dropping job for stopped queue");
        }
    }

    /// Enqueue a job once `delay` has elapsed.
    ///
    /// The calling thread returns immediately; the job takes its place in
    /// the queue's FIFO order at the moment the delay expires.
    pub fn dispatch_after(&self, delay: Duration, job: impl FnOnce() + Send + 'static) {
        if delay.is_zero() {
            self.dispatch(job);
            return;
        }
        let jobs = self.jobs.clone();
        let label = self.label;
        self.runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            if jobs.send(Box::new(job)).is_err() {
                tracing::debug!(queue = label, "dropping delayed job for stopped queue");
            }
        });
    }

    /// The queue's label.
    pub fn label(&self) -> &'static str {
        self.label
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};
    use std::time::Instant;
    use tokio::sync::oneshot;

    #[tokio::test]
    async fn test_fifo_order() {
        let queue = WorkQueue::new("test");
        let seen = Arc::new(Mutex::new(Vec::new()));
        let (tx, rx) = oneshot::channel();

        for i in 0..10 {
            let seen = seen.clone();
            queue.dispatch(move || seen.lock().unwrap().push(i));
        }
        queue.dispatch(move || {
            let _ = tx.send(());
        });

        rx.await.unwrap();
        assert_eq!(*seen.lock().unwrap(), (0..10).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn test_dispatch_after_waits() {
        let queue = WorkQueue::new("test");
        let (tx, rx) = oneshot::channel();
        let start = Instant::now();

        queue.dispatch_after(Duration::from_millis(50), move || {
            let _ = tx.send(start.elapsed());
        });

        let elapsed = rx.await.unwrap();
        assert!(elapsed >= Duration::from_millis(50));
    }

    #[tokio::test]
    async fn test_zero_delay_runs_inline_order() {
        let queue = WorkQueue::new("test");
        let seen = Arc::new(Mutex::new(Vec::new()));
        let (tx, rx) = oneshot::channel();

        let s = seen.clone();
        queue.dispatch(move || s.lock().unwrap().push("first"));
        let s = seen.clone();
        queue.dispatch_after(Duration::ZERO, move || s.lock().unwrap().push("second"));
        queue.dispatch(move || {
            let _ = tx.send(());
        });

        rx.await.unwrap();
        assert_eq!(*seen.lock().unwrap(), vec!["first", "second"]);
    }
}
