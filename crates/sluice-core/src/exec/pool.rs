//! Fixed-width worker pool for action callables.

use std::future::Future;
use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio_util::task::TaskTracker;

use crate::exec::task::ActionTask;
use crate::types::ExecutionStatus;

/// A fixed pool of workers running action callables off the engine task.
///
/// Width defaults to hardware parallelism. `submit` enqueues a callable
/// to run exactly once; a submitted task stays `NotStarted` until a
/// worker slot frees up. There are no priorities and no cancellation of
/// running callables; shutdown lets in-flight work complete.
#[derive(Debug, Clone)]
pub struct WorkerPool {
    semaphore: Arc<Semaphore>,
    tracker: TaskTracker,
    width: usize,
}

impl WorkerPool {
    pub fn new(width: usize) -> Self {
        let width = width.max(1);
        Self {
            semaphore: Arc::new(Semaphore::new(width)),
            tracker: TaskTracker::new(),
            width,
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    /// Enqueue `work`; `task` observes the execution lifecycle.
    pub fn submit<F>(&self, task: &ActionTask, work: F)
    where
        F: Future<Output = ExecutionStatus> + Send + 'static,
    {
        let task = task.clone();
        let semaphore = Arc::clone(&self.semaphore);
        self.tracker.spawn(async move {
            let Ok(_permit) = semaphore.acquire_owned().await else {
                return;
            };
            task.mark_running();
            let status = work.await;
            task.complete(status);
        });
    }

    /// Drain the pool: wait for every submitted callable to finish.
    pub async fn shutdown(&self) {
        self.tracker.close();
        self.tracker.wait().await;
    }
}

impl Default for WorkerPool {
    fn default() -> Self {
        let width = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(4);
        Self::new(width)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn test_submitted_work_runs_exactly_once() {
        let pool = WorkerPool::new(2);
        let runs = Arc::new(AtomicUsize::new(0));

        let task = ActionTask::new();
        let counter = Arc::clone(&runs);
        pool.submit(&task, async move {
            counter.fetch_add(1, Ordering::SeqCst);
            ExecutionStatus::Success
        });

        pool.shutdown().await;
        assert_eq!(runs.load(Ordering::SeqCst), 1);
        assert_eq!(task.probe(), ExecutionStatus::Success);
    }

    #[tokio::test]
    async fn test_width_bounds_concurrency() {
        let pool = WorkerPool::new(2);
        let active = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let tasks: Vec<ActionTask> = (0..8).map(|_| ActionTask::new()).collect();
        for task in &tasks {
            let active = Arc::clone(&active);
            let peak = Arc::clone(&peak);
            pool.submit(task, async move {
                let now = active.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(20)).await;
                active.fetch_sub(1, Ordering::SeqCst);
                ExecutionStatus::Success
            });
        }

        pool.shutdown().await;
        assert!(peak.load(Ordering::SeqCst) <= 2);
        for task in &tasks {
            assert_eq!(task.probe(), ExecutionStatus::Success);
        }
    }

    #[tokio::test]
    async fn test_shutdown_lets_in_flight_work_complete() {
        let pool = WorkerPool::new(1);
        let task = ActionTask::new();
        pool.submit(&task, async {
            tokio::time::sleep(Duration::from_millis(30)).await;
            ExecutionStatus::Failure
        });

        pool.shutdown().await;
        assert_eq!(task.probe(), ExecutionStatus::Failure);
    }
}
