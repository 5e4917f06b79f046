//! # Sluice Runtime
//!
//! Drives a configured net: the epoch controller runs the
//! dispatch → wait → collect → fire-auto tick, and the controller handle
//! serializes external operations with the loop. Bootstrap wires a
//! validated config, the action registry, and the worker pool into a
//! runnable bundle.

mod bootstrap;
mod controller;

pub use bootstrap::{build_net, init_tracing, BootstrapError, RuntimeApp};
pub use controller::{Controller, ControllerHandle};

// Re-export for embedders driving shutdown from outside.
pub use tokio_util::sync::CancellationToken;
