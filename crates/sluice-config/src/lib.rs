//! # Sluice Config
//!
//! Configuration schema for a net: the `petri_net` section describes the
//! structure (places, transitions, arcs) and the `controller` section
//! describes the runtime (worker count, epoch period, per-place action
//! bindings, transport). Everything is validated at load, before any
//! engine task starts.

mod loader;

pub use loader::{load_config, parse_config, validate_config, ConfigError};

use serde::Deserialize;
use serde_json::Value;

use sluice_core::types::ExecutionStatus;
use sluice_core::transition::TransitionMode;

/// Top-level configuration tree.
#[derive(Debug, Clone, Deserialize)]
pub struct SluiceConfig {
    pub petri_net: PetriNetConfig,
    pub controller: ControllerConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PetriNetConfig {
    pub places: Vec<PlaceConfig>,
    pub transitions: Vec<TransitionConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PlaceConfig {
    pub place_id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TransitionConfig {
    pub transition_id: String,
    /// Missing mode is tolerated and defaults to AUTO (validation warns).
    #[serde(default)]
    pub transition_type: Option<TransitionMode>,
    pub transition_arcs: Vec<ArcConfig>,
}

impl TransitionConfig {
    pub fn mode(&self) -> TransitionMode {
        self.transition_type.unwrap_or(TransitionMode::Auto)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ArcDirection {
    Input,
    Output,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ArcConfig {
    pub place_id: String,
    #[serde(rename = "type")]
    pub direction: ArcDirection,
    /// Outcome kinds accepted from the place; INPUT arcs only.
    #[serde(default)]
    pub action_result_filter: Option<Vec<ExecutionStatus>>,
    /// Block-key regex forwarded onto the place; OUTPUT arcs only.
    #[serde(default)]
    pub token_content_filter: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ControllerConfig {
    /// Worker pool width; defaults to hardware parallelism.
    #[serde(default)]
    pub thread_pool_workers: Option<usize>,
    pub epoch_period_ms: u64,
    #[serde(default)]
    pub actions: Vec<ActionBinding>,
    #[serde(default)]
    pub http_server: Option<HttpServerConfig>,
}

/// Binds a registered action implementation to a place.
#[derive(Debug, Clone, Deserialize)]
pub struct ActionBinding {
    pub place_id: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub params: Value,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HttpServerConfig {
    pub address: String,
    pub port: u16,
}
