//! Poll-based timer action.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use rand::Rng;
use serde_json::Value;

use sluice_core::action::Action;
use sluice_core::param::ConfigParameter;
use sluice_core::token::{Token, TokenId};
use sluice_core::types::ExecutionStatus;

use crate::registry::ActionBuildError;

/// Holds a token for a configured duration.
///
/// Each invocation is a cheap poll: the first one arms a deadline for the
/// token, subsequent ones report `IN_PROGRESS` until the deadline passes,
/// then the final outcome is sampled from the configured rates.
///
/// Params:
///   - `duration_ms`  (u64, required) how long to hold the token
///   - `failure_rate` (f64 in [0, 1], default 0.0)
///   - `error_rate`   (f64 in [0, 1], default 0.0)
///
/// Every param accepts an `@token{...}` reference.
pub struct TimerAction {
    duration_ms: ConfigParameter<u64>,
    failure_rate: ConfigParameter<f64>,
    error_rate: ConfigParameter<f64>,
    deadlines: Mutex<HashMap<TokenId, Instant>>,
}

impl TimerAction {
    pub fn from_params(params: &Value) -> Result<Arc<dyn Action>, ActionBuildError> {
        Ok(Arc::new(Self {
            duration_ms: required_param("timer", params, "duration_ms")?,
            failure_rate: optional_rate(params, "failure_rate")?,
            error_rate: optional_rate(params, "error_rate")?,
            deadlines: Mutex::new(HashMap::new()),
        }))
    }

    fn lock_deadlines(&self) -> MutexGuard<'_, HashMap<TokenId, Instant>> {
        self.deadlines
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl Action for TimerAction {
    fn kind(&self) -> &str {
        "timer"
    }

    async fn execute(&self, token: Arc<Token>) -> ExecutionStatus {
        let duration_ms = match self.duration_ms.resolve(&token) {
            Ok(value) => value,
            Err(error) => {
                tracing::warn!(token_id = %token.id(), %error, "timer duration resolution failed");
                return ExecutionStatus::Error;
            }
        };
        let failure_rate = match self.failure_rate.resolve(&token) {
            Ok(value) => value,
            Err(error) => {
                tracing::warn!(token_id = %token.id(), %error, "timer failure_rate resolution failed");
                return ExecutionStatus::Error;
            }
        };
        let error_rate = match self.error_rate.resolve(&token) {
            Ok(value) => value,
            Err(error) => {
                tracing::warn!(token_id = %token.id(), %error, "timer error_rate resolution failed");
                return ExecutionStatus::Error;
            }
        };

        let now = Instant::now();
        let mut deadlines = self.lock_deadlines();
        match deadlines.get(&token.id()).copied() {
            None => {
                deadlines.insert(token.id(), now + Duration::from_millis(duration_ms));
                ExecutionStatus::InProgress
            }
            Some(deadline) if now < deadline => ExecutionStatus::InProgress,
            Some(_) => {
                deadlines.remove(&token.id());
                sample_outcome(failure_rate, error_rate)
            }
        }
    }
}

fn sample_outcome(failure_rate: f64, error_rate: f64) -> ExecutionStatus {
    let roll: f64 = rand::thread_rng().gen();
    if roll < error_rate {
        ExecutionStatus::Error
    } else if roll < error_rate + failure_rate {
        ExecutionStatus::Failure
    } else {
        ExecutionStatus::Success
    }
}

pub(crate) fn required_param<T>(
    kind: &str,
    params: &Value,
    key: &str,
) -> Result<ConfigParameter<T>, ActionBuildError>
where
    T: serde::de::DeserializeOwned + Clone,
{
    let raw = params
        .get(key)
        .ok_or_else(|| ActionBuildError::InvalidParams {
            kind: kind.to_string(),
            message: format!("missing required param '{key}'"),
        })?;
    ConfigParameter::parse(raw).map_err(|e| ActionBuildError::InvalidParams {
        kind: kind.to_string(),
        message: format!("param '{key}': {e}"),
    })
}

fn optional_rate(params: &Value, key: &str) -> Result<ConfigParameter<f64>, ActionBuildError> {
    match params.get(key) {
        None => Ok(ConfigParameter::Literal(0.0)),
        Some(raw) => ConfigParameter::parse(raw).map_err(|e| ActionBuildError::InvalidParams {
            kind: "timer".to_string(),
            message: format!("param '{key}': {e}"),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn timer(params: Value) -> Arc<dyn Action> {
        TimerAction::from_params(&params).expect("timer")
    }

    #[tokio::test]
    async fn test_reports_in_progress_until_deadline_then_success() {
        let action = timer(json!({"duration_ms": 40}));
        let token = Arc::new(Token::new());

        assert_eq!(
            action.execute(Arc::clone(&token)).await,
            ExecutionStatus::InProgress
        );
        assert_eq!(
            action.execute(Arc::clone(&token)).await,
            ExecutionStatus::InProgress
        );

        tokio::time::sleep(Duration::from_millis(60)).await;
        assert_eq!(
            action.execute(Arc::clone(&token)).await,
            ExecutionStatus::Success
        );
    }

    #[tokio::test]
    async fn test_deadline_rearms_after_completion() {
        let action = timer(json!({"duration_ms": 10}));
        let token = Arc::new(Token::new());

        assert_eq!(
            action.execute(Arc::clone(&token)).await,
            ExecutionStatus::InProgress
        );
        tokio::time::sleep(Duration::from_millis(30)).await;
        assert_eq!(
            action.execute(Arc::clone(&token)).await,
            ExecutionStatus::Success
        );

        // The same token starts a new timer afterwards.
        assert_eq!(
            action.execute(Arc::clone(&token)).await,
            ExecutionStatus::InProgress
        );
    }

    #[tokio::test]
    async fn test_full_failure_rate_yields_failure() {
        let action = timer(json!({"duration_ms": 5, "failure_rate": 1.0}));
        let token = Arc::new(Token::new());

        assert_eq!(
            action.execute(Arc::clone(&token)).await,
            ExecutionStatus::InProgress
        );
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(
            action.execute(Arc::clone(&token)).await,
            ExecutionStatus::Failure
        );
    }

    #[tokio::test]
    async fn test_full_error_rate_yields_error() {
        let action = timer(json!({"duration_ms": 5, "error_rate": 1.0}));
        let token = Arc::new(Token::new());

        action.execute(Arc::clone(&token)).await;
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(
            action.execute(Arc::clone(&token)).await,
            ExecutionStatus::Error
        );
    }

    #[tokio::test]
    async fn test_token_relative_duration() {
        let action = timer(json!({"duration_ms": "@token{timing.duration_ms}"}));

        let mut token = Token::new();
        token
            .add_block("timing", json!({"duration_ms": 10}))
            .expect("block");
        let token = Arc::new(token);

        assert_eq!(
            action.execute(Arc::clone(&token)).await,
            ExecutionStatus::InProgress
        );
        tokio::time::sleep(Duration::from_millis(30)).await;
        assert_eq!(
            action.execute(Arc::clone(&token)).await,
            ExecutionStatus::Success
        );
    }

    #[tokio::test]
    async fn test_unresolvable_duration_is_an_error_outcome() {
        let action = timer(json!({"duration_ms": "@token{timing.duration_ms}"}));
        let token = Arc::new(Token::new());
        assert_eq!(action.execute(token).await, ExecutionStatus::Error);
    }
}
