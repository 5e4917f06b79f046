//! One-shot task latch over an action execution.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio::sync::Notify;

use crate::types::ExecutionStatus;

#[derive(Debug, Clone, Copy)]
enum TaskState {
    NotStarted,
    Running,
    Done(ExecutionStatus),
}

#[derive(Debug)]
struct Shared {
    state: Mutex<TaskState>,
    done: Notify,
}

/// A one-shot latch over a callable producing an outcome.
///
/// States progress `NotStarted -> Running -> Done(outcome)` and never
/// regress. The outcome is stored under the latch mutex before the done
/// signal fires, so any probe that observes completion also observes the
/// stored outcome.
#[derive(Debug, Clone)]
pub struct ActionTask {
    shared: Arc<Shared>,
}

impl ActionTask {
    pub fn new() -> Self {
        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(TaskState::NotStarted),
                done: Notify::new(),
            }),
        }
    }

    /// Non-blocking status probe.
    ///
    /// Returns [`ExecutionStatus::NotStarted`] while queued, the stored
    /// outcome once done, and [`ExecutionStatus::QueryTimeout`] while the
    /// callable is still running.
    pub fn probe(&self) -> ExecutionStatus {
        self.settled().unwrap_or(ExecutionStatus::QueryTimeout)
    }

    /// Status probe that waits up to `timeout` for a running callable to
    /// complete. A queued task returns `NotStarted` immediately.
    pub async fn probe_timeout(&self, timeout: Duration) -> ExecutionStatus {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            let notified = self.shared.done.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if let Some(status) = self.settled() {
                return status;
            }
            if tokio::time::timeout_at(deadline, notified).await.is_err() {
                return ExecutionStatus::QueryTimeout;
            }
        }
    }

    pub(crate) fn mark_running(&self) {
        let mut state = self.lock_state();
        if matches!(*state, TaskState::NotStarted) {
            *state = TaskState::Running;
        }
    }

    pub(crate) fn complete(&self, status: ExecutionStatus) {
        {
            let mut state = self.lock_state();
            *state = TaskState::Done(status);
        }
        self.shared.done.notify_waiters();
    }

    /// `None` while the callable is running, otherwise the probe result.
    fn settled(&self) -> Option<ExecutionStatus> {
        match *self.lock_state() {
            TaskState::NotStarted => Some(ExecutionStatus::NotStarted),
            TaskState::Running => None,
            TaskState::Done(status) => Some(status),
        }
    }

    fn lock_state(&self) -> MutexGuard<'_, TaskState> {
        // The critical sections only move an enum; a poisoned lock still
        // holds a coherent state.
        self.shared
            .state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Default for ActionTask {
    fn default() -> Self {
        Self::new()
    }
}
