//! Engine error types.

use thiserror::Error;

use crate::token::TokenError;

/// Errors surfaced by the net and the execution layer.
///
/// Caller-facing faults (unknown ids, wrong trigger mode, duplicate block
/// keys) leave the engine running; `Invariant` marks an internal bug and
/// is fatal to the epoch loop.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("place '{0}' does not exist")]
    UnknownPlace(String),

    #[error("transition '{0}' does not exist")]
    UnknownTransition(String),

    #[error("transition '{0}' is not a manual transition")]
    NotManual(String),

    #[error("transition '{0}' is not enabled")]
    NotEnabled(String),

    #[error("place '{0}' already has an associated action")]
    ActionAlreadyAttached(String),

    #[error("firing transition '{transition_id}' failed to merge consumed tokens: {source}")]
    MergeConflict {
        transition_id: String,
        #[source]
        source: TokenError,
    },

    #[error(transparent)]
    Token(#[from] TokenError),

    #[error("internal invariant violated: {0}")]
    Invariant(String),
}
