//! Action type registry.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;
use thiserror::Error;

use sluice_core::action::Action;

use crate::http_poll::HttpPollAction;
use crate::timer::TimerAction;

/// Action factory errors.
#[derive(Debug, Error)]
pub enum ActionBuildError {
    #[error("action type '{0}' has not been registered")]
    UnknownType(String),
    #[error("invalid params for action type '{kind}': {message}")]
    InvalidParams { kind: String, message: String },
}

type Factory = Box<dyn Fn(&Value) -> Result<Arc<dyn Action>, ActionBuildError> + Send + Sync>;

/// Maps registered implementation type names to factories.
///
/// The registry is populated once at startup (builtins plus whatever the
/// embedder registers) and read-only thereafter; the net resolves each
/// action binding's `type` against it at construction.
pub struct ActionRegistry {
    factories: HashMap<String, Factory>,
}

impl ActionRegistry {
    pub fn new() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    /// A registry with the builtin implementations registered.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register("timer", TimerAction::from_params);
        registry.register("http_poll", HttpPollAction::from_params);
        registry
    }

    pub fn register<F>(&mut self, kind: impl Into<String>, factory: F)
    where
        F: Fn(&Value) -> Result<Arc<dyn Action>, ActionBuildError> + Send + Sync + 'static,
    {
        self.factories.insert(kind.into(), Box::new(factory));
    }

    pub fn contains(&self, kind: &str) -> bool {
        self.factories.contains_key(kind)
    }

    pub fn kinds(&self) -> Vec<&str> {
        self.factories.keys().map(String::as_str).collect()
    }

    /// Build an action implementation from its config binding.
    pub fn build(&self, kind: &str, params: &Value) -> Result<Arc<dyn Action>, ActionBuildError> {
        let factory = self
            .factories
            .get(kind)
            .ok_or_else(|| ActionBuildError::UnknownType(kind.to_string()))?;
        factory(params)
    }
}

impl Default for ActionRegistry {
    fn default() -> Self {
        Self::new()
    }
}
