//! Per-place action dispatch bookkeeping.

use std::collections::VecDeque;
use std::sync::Arc;

use crate::action::Action;
use crate::error::EngineError;
use crate::exec::pool::WorkerPool;
use crate::exec::task::ActionTask;
use crate::token::{Token, TokenId};
use crate::types::ExecutionStatus;

/// Outcome reported for one token at the end of an epoch's collect pass.
#[derive(Debug, Clone, Copy)]
pub struct ExecutionResult {
    pub token_id: TokenId,
    pub status: ExecutionStatus,
}

struct ExecutionUnit {
    token: Arc<Token>,
    task: ActionTask,
    delayed_epochs: u32,
}

/// Dispatches one task per busy token and collects outcomes per epoch.
///
/// Two FIFO lists back the bookkeeping: `current_epoch` holds this
/// epoch's submissions, `delayed` carries tasks that did not finish in
/// the epoch they were submitted. A token with an entry in `delayed` is
/// never redispatched, which guarantees at most one outstanding task per
/// token while letting actions span arbitrarily many epochs.
pub struct ActionDispatcher {
    action: Arc<dyn Action>,
    pool: WorkerPool,
    current_epoch: VecDeque<ExecutionUnit>,
    delayed: VecDeque<ExecutionUnit>,
}

impl ActionDispatcher {
    pub fn new(action: Arc<dyn Action>, pool: WorkerPool) -> Self {
        Self {
            action,
            pool,
            current_epoch: VecDeque::new(),
            delayed: VecDeque::new(),
        }
    }

    pub fn kind(&self) -> &str {
        self.action.kind()
    }

    /// Submit one task for every busy token not already carried in
    /// `delayed`. The previous epoch must have been fully collected.
    pub fn dispatch(&mut self, busy: &[Arc<Token>]) -> Result<(), EngineError> {
        if !self.current_epoch.is_empty() {
            return Err(EngineError::Invariant(
                "dispatch called before the previous epoch was collected".to_string(),
            ));
        }

        for token in busy {
            if self.is_delayed(token.id()) {
                continue;
            }

            let task = ActionTask::new();
            let action = Arc::clone(&self.action);
            let input = Arc::clone(token);
            self.pool
                .submit(&task, async move { action.execute(input).await });
            self.current_epoch.push_back(ExecutionUnit {
                token: Arc::clone(token),
                task,
                delayed_epochs: 0,
            });
        }
        Ok(())
    }

    /// Emit a result for every task that has finished executing; move the
    /// rest of this epoch's submissions to the delayed list.
    ///
    /// A finished task's outcome may itself be a non-completed kind
    /// (`IN_PROGRESS` from a polling action): it is still emitted, the
    /// place keeps the token busy, and the next dispatch issues a fresh
    /// query for it.
    pub fn collect(&mut self) -> Vec<ExecutionResult> {
        let mut results = Vec::with_capacity(self.delayed.len() + self.current_epoch.len());

        let mut still_delayed = VecDeque::with_capacity(self.delayed.len());
        while let Some(mut unit) = self.delayed.pop_front() {
            match finished_status(&unit.task) {
                Some(status) => results.push(ExecutionResult {
                    token_id: unit.token.id(),
                    status,
                }),
                None => {
                    unit.delayed_epochs += 1;
                    still_delayed.push_back(unit);
                }
            }
        }
        self.delayed = still_delayed;

        while let Some(mut unit) = self.current_epoch.pop_front() {
            match finished_status(&unit.task) {
                Some(status) => results.push(ExecutionResult {
                    token_id: unit.token.id(),
                    status,
                }),
                None => {
                    unit.delayed_epochs += 1;
                    self.delayed.push_back(unit);
                }
            }
        }

        results
    }

    pub fn delayed_count(&self) -> usize {
        self.delayed.len()
    }

    fn is_delayed(&self, token_id: TokenId) -> bool {
        self.delayed.iter().any(|unit| unit.token.id() == token_id)
    }
}

/// `Some(outcome)` once the task has finished executing.
fn finished_status(task: &ActionTask) -> Option<ExecutionStatus> {
    match task.probe() {
        ExecutionStatus::NotStarted | ExecutionStatus::QueryTimeout => None,
        status => Some(status),
    }
}
