//! Outcome kinds shared across the engine.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Result kind of one action execution on one token.
///
/// The first three kinds are *completed*: they move a token from `busy`
/// to `available` and are the routing signal for input-arc filters. The
/// remaining kinds describe executions that have not produced a routable
/// outcome yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExecutionStatus {
    /// Action completed successfully, or the token sits in a passive place.
    Success,
    /// Action completed reporting a domain failure.
    Failure,
    /// Action execution itself went wrong.
    Error,
    /// Action is still in progress and did not finish within this epoch.
    InProgress,
    /// Status probe did not observe a completion within its timeout.
    QueryTimeout,
    /// Task is queued on the worker pool but has not started yet.
    NotStarted,
}

impl ExecutionStatus {
    /// Whether this kind transfers a token from `busy` to `available`.
    pub fn is_completed(self) -> bool {
        matches!(self, Self::Success | Self::Failure | Self::Error)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Success => "SUCCESS",
            Self::Failure => "FAILURE",
            Self::Error => "ERROR",
            Self::InProgress => "IN_PROGRESS",
            Self::QueryTimeout => "QUERY_TIMEOUT",
            Self::NotStarted => "NOT_STARTED",
        }
    }

    pub fn from_str(raw: &str) -> Option<Self> {
        match raw {
            "SUCCESS" => Some(Self::Success),
            "FAILURE" => Some(Self::Failure),
            "ERROR" => Some(Self::Error),
            "IN_PROGRESS" => Some(Self::InProgress),
            "QUERY_TIMEOUT" => Some(Self::QueryTimeout),
            "NOT_STARTED" => Some(Self::NotStarted),
            _ => None,
        }
    }
}

impl fmt::Display for ExecutionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Small set of [`ExecutionStatus`] kinds, used by input-arc outcome
/// filters and availability queries. An empty set means "any outcome".
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatusSet(u8);

impl StatusSet {
    pub const fn empty() -> Self {
        Self(0)
    }

    pub fn of(statuses: &[ExecutionStatus]) -> Self {
        statuses.iter().copied().collect()
    }

    pub fn insert(&mut self, status: ExecutionStatus) {
        self.0 |= Self::bit(status);
    }

    pub fn contains(self, status: ExecutionStatus) -> bool {
        self.0 & Self::bit(status) != 0
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    fn bit(status: ExecutionStatus) -> u8 {
        1 << status as u8
    }
}

impl FromIterator<ExecutionStatus> for StatusSet {
    fn from_iter<I: IntoIterator<Item = ExecutionStatus>>(iter: I) -> Self {
        let mut set = Self::empty();
        for status in iter {
            set.insert(status);
        }
        set
    }
}
