//! Action abstraction.
//!
//! An action is the user-supplied behaviour associated with a place. The
//! engine dispatches one execution per busy token and only ever sees the
//! reported outcome kind; everything else (I/O, polling external systems,
//! internal retry) is the implementation's business.

use std::sync::Arc;

use async_trait::async_trait;

use crate::token::Token;
use crate::types::ExecutionStatus;

/// The contract between the engine and action implementations.
///
/// `execute` runs on a worker, must not touch net state, and reports one
/// outcome kind per invocation. Returning [`ExecutionStatus::InProgress`]
/// keeps the token busy; the engine issues a fresh `execute` call for the
/// same token on the next epoch, so polling implementations treat every
/// invocation as a new query against whatever external state they manage.
#[async_trait]
pub trait Action: Send + Sync {
    /// Registered implementation kind, e.g. `"timer"`.
    fn kind(&self) -> &str;

    /// Run one unit of work for `token` and report the outcome.
    async fn execute(&self, token: Arc<Token>) -> ExecutionStatus;
}
