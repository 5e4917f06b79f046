//! Places: token containers with an optional associated action.

use std::collections::{BTreeMap, VecDeque};
use std::sync::Arc;

use serde::Serialize;

use crate::error::EngineError;
use crate::exec::{ActionDispatcher, ExecutionResult};
use crate::token::Token;
use crate::types::{ExecutionStatus, StatusSet};

struct AvailableEntry {
    token: Arc<Token>,
    status: ExecutionStatus,
}

/// Per-place counts for display and tests.
#[derive(Debug, Clone, Serialize)]
pub struct PlaceSnapshot {
    pub total: usize,
    pub busy: usize,
    pub available: usize,
    /// Available tokens per outcome kind.
    pub outcomes: BTreeMap<String, usize>,
}

/// A named token container.
///
/// A place is *passive* (no action) or *active* (action attached). Tokens
/// partition into `busy` (under action execution, or awaiting dispatch)
/// and `available` (action completed, tagged with the outcome kind).
/// Newly inserted tokens land in `available` with `SUCCESS` on a passive
/// place and in `busy` on an active one.
pub struct Place {
    id: String,
    dispatcher: Option<ActionDispatcher>,
    busy: VecDeque<Arc<Token>>,
    available: VecDeque<AvailableEntry>,
}

impl Place {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            dispatcher: None,
            busy: VecDeque::new(),
            available: VecDeque::new(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn is_passive(&self) -> bool {
        self.dispatcher.is_none()
    }

    /// Associate an action with this place. At most one action per place;
    /// a second attach is a config wiring bug.
    pub fn attach_action(&mut self, dispatcher: ActionDispatcher) -> Result<(), EngineError> {
        if self.dispatcher.is_some() {
            return Err(EngineError::ActionAlreadyAttached(self.id.clone()));
        }
        self.dispatcher = Some(dispatcher);
        Ok(())
    }

    pub fn insert(&mut self, token: Arc<Token>) {
        if self.is_passive() {
            self.available.push_back(AvailableEntry {
                token,
                status: ExecutionStatus::Success,
            });
        } else {
            self.busy.push_back(token);
        }
    }

    /// Forward the busy tokens to the action's dispatch.
    pub fn dispatch_actions(&mut self) -> Result<(), EngineError> {
        if let Some(dispatcher) = &mut self.dispatcher {
            let busy: Vec<Arc<Token>> = self.busy.iter().cloned().collect();
            dispatcher.dispatch(&busy)?;
        }
        Ok(())
    }

    /// Collect this epoch's outcomes and move tokens with a completed
    /// outcome from `busy` to `available`.
    pub fn collect_results(&mut self) -> Result<(), EngineError> {
        let results: Vec<ExecutionResult> = match &mut self.dispatcher {
            Some(dispatcher) => dispatcher.collect(),
            None => return Ok(()),
        };

        for result in results {
            if !result.status.is_completed() {
                continue;
            }

            let position = self
                .busy
                .iter()
                .position(|token| token.id() == result.token_id);
            match position {
                Some(index) => {
                    let token = self.busy.remove(index).ok_or_else(|| {
                        EngineError::Invariant(format!(
                            "busy slot {index} vanished in place '{}'",
                            self.id
                        ))
                    })?;
                    self.available.push_back(AvailableEntry {
                        token,
                        status: result.status,
                    });
                }
                None => {
                    return Err(EngineError::Invariant(format!(
                        "collected {} outcome for token {} not busy in place '{}' (busy={}, available={})",
                        result.status,
                        result.token_id,
                        self.id,
                        self.busy.len(),
                        self.available.len(),
                    )));
                }
            }
        }
        Ok(())
    }

    pub fn total_count(&self) -> usize {
        self.busy.len() + self.available.len()
    }

    pub fn busy_count(&self) -> usize {
        self.busy.len()
    }

    /// Count available tokens whose outcome is in `accepted`; an empty
    /// set counts every available token.
    pub fn available_count(&self, accepted: StatusSet) -> usize {
        if accepted.is_empty() {
            return self.available.len();
        }
        self.available
            .iter()
            .filter(|entry| accepted.contains(entry.status))
            .count()
    }

    /// Remove and return the first available token whose outcome is in
    /// `accepted` (the front when the set is empty).
    pub fn consume(&mut self, accepted: StatusSet) -> Option<Arc<Token>> {
        if accepted.is_empty() {
            return self.available.pop_front().map(|entry| entry.token);
        }
        let index = self
            .available
            .iter()
            .position(|entry| accepted.contains(entry.status))?;
        self.available.remove(index).map(|entry| entry.token)
    }

    pub fn snapshot(&self) -> PlaceSnapshot {
        let mut outcomes: BTreeMap<String, usize> = BTreeMap::new();
        for entry in &self.available {
            *outcomes.entry(entry.status.as_str().to_string()).or_insert(0) += 1;
        }
        PlaceSnapshot {
            total: self.total_count(),
            busy: self.busy.len(),
            available: self.available.len(),
            outcomes,
        }
    }
}
