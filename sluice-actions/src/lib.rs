//! # Sluice Actions
//!
//! Pluggable action implementations. The registry maps a config `type`
//! string to a factory building an [`sluice_core::Action`]; the builtins
//! cover a poll-based timer and an HTTP execute/poll client.

mod http_poll;
mod registry;
mod timer;

pub use http_poll::HttpPollAction;
pub use registry::{ActionBuildError, ActionRegistry};
pub use timer::TimerAction;
