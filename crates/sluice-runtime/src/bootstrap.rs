//! Bootstrap: wire a validated config into a runnable controller.

use std::path::Path;
use std::sync::{Arc, OnceLock};
use std::time::Duration;

use regex::Regex;
use thiserror::Error;

use sluice_actions::{ActionBuildError, ActionRegistry};
use sluice_config::{load_config, ArcDirection, ConfigError, SluiceConfig};
use sluice_core::error::EngineError;
use sluice_core::exec::{ActionDispatcher, WorkerPool};
use sluice_core::net::PetriNet;
use sluice_core::place::Place;
use sluice_core::transition::{InputArc, OutputArc, Transition};
use sluice_core::types::StatusSet;

use crate::controller::{Controller, ControllerHandle};

/// Runtime bootstrap errors.
#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("action build error: {0}")]
    ActionBuild(#[from] ActionBuildError),
    #[error("engine error: {0}")]
    Engine(#[from] EngineError),
}

/// Build the net described by `config`, resolving each action binding
/// against `registry`. The config is assumed validated.
pub fn build_net(
    config: &SluiceConfig,
    registry: &ActionRegistry,
    pool: &WorkerPool,
) -> Result<PetriNet, BootstrapError> {
    let places = config
        .petri_net
        .places
        .iter()
        .map(|place| Place::new(&place.place_id))
        .collect();

    let mut transitions = Vec::with_capacity(config.petri_net.transitions.len());
    for spec in &config.petri_net.transitions {
        let mut inputs = Vec::new();
        let mut outputs = Vec::new();
        for arc in &spec.transition_arcs {
            match arc.direction {
                ArcDirection::Input => inputs.push(InputArc {
                    place_id: arc.place_id.clone(),
                    filter: arc
                        .action_result_filter
                        .as_deref()
                        .map(StatusSet::of)
                        .unwrap_or_default(),
                }),
                ArcDirection::Output => {
                    let content_filter = match &arc.token_content_filter {
                        None => None,
                        Some(filter) => Some(Regex::new(filter).map_err(|e| {
                            ConfigError::Invalid(format!(
                                "transition '{}': invalid token_content_filter '{}': {}",
                                spec.transition_id, filter, e
                            ))
                        })?),
                    };
                    outputs.push(OutputArc {
                        place_id: arc.place_id.clone(),
                        content_filter,
                    });
                }
            }
        }
        transitions.push(Transition::new(
            spec.transition_id.clone(),
            spec.mode(),
            inputs,
            outputs,
        ));
    }

    let mut net = PetriNet::new(places, transitions);
    for binding in &config.controller.actions {
        let action = registry.build(&binding.kind, &binding.params)?;
        tracing::info!(
            place_id = %binding.place_id,
            kind = %binding.kind,
            "action bound to place"
        );
        net.attach_action(&binding.place_id, ActionDispatcher::new(action, pool.clone()))?;
    }
    Ok(net)
}

/// Running bundle created from a config file.
pub struct RuntimeApp {
    pub controller: Arc<Controller>,
    pub handle: ControllerHandle,
    pub config: SluiceConfig,
}

impl RuntimeApp {
    /// Load, validate, and wire a config file with the builtin actions.
    pub fn from_config_path(path: impl AsRef<Path>) -> Result<Self, BootstrapError> {
        let config = load_config(path.as_ref())?;
        Self::from_config(config)
    }

    pub fn from_config(config: SluiceConfig) -> Result<Self, BootstrapError> {
        Self::with_registry(config, &ActionRegistry::with_builtins())
    }

    /// Wire with a caller-supplied registry (extra action kinds).
    pub fn with_registry(
        config: SluiceConfig,
        registry: &ActionRegistry,
    ) -> Result<Self, BootstrapError> {
        let pool = match config.controller.thread_pool_workers {
            Some(width) => WorkerPool::new(width),
            None => WorkerPool::default(),
        };
        let net = build_net(&config, registry, &pool)?;
        let period = Duration::from_millis(config.controller.epoch_period_ms);

        let controller = Arc::new(Controller::new(net, pool, period));
        let handle = controller.handle();
        Ok(Self {
            controller,
            handle,
            config,
        })
    }
}

static TRACING_INIT: OnceLock<()> = OnceLock::new();

/// Initialize the process-wide subscriber once; respects `RUST_LOG`.
pub fn init_tracing() {
    TRACING_INIT.get_or_init(|| {
        let filter = tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .try_init();
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use sluice_config::parse_config;

    const SAMPLE: &str = include_str!("../../../config_samples/config.json");

    #[test]
    fn test_sample_config_builds_a_runtime() {
        let app = RuntimeApp::from_config(parse_config(SAMPLE).expect("config")).expect("app");
        assert_eq!(app.config.controller.epoch_period_ms, 50);
    }

    #[tokio::test]
    async fn test_sample_net_wires_places_and_transitions() {
        let config = parse_config(SAMPLE).expect("config");
        let pool = WorkerPool::new(2);
        let mut net =
            build_net(&config, &ActionRegistry::with_builtins(), &pool).expect("net");

        let marking = net.marking();
        assert_eq!(marking.len(), 4);
        assert!(marking.contains_key("A"));

        // T1 exists and is manual; T2 is not manually triggerable.
        assert!(matches!(
            net.trigger("T1", true),
            Err(EngineError::NotEnabled(_))
        ));
        assert!(matches!(
            net.trigger("T2", true),
            Err(EngineError::NotManual(_))
        ));
    }

    #[test]
    fn test_unregistered_action_kind_fails_bootstrap() {
        let mut raw: serde_json::Value = serde_json::from_str(SAMPLE).expect("json");
        raw["controller"]["actions"] = serde_json::json!([
            { "place_id": "A", "type": "teleport", "params": {} }
        ]);
        let config = parse_config(&raw.to_string()).expect("config");
        assert!(matches!(
            RuntimeApp::from_config(config),
            Err(BootstrapError::ActionBuild(ActionBuildError::UnknownType(_)))
        ));
    }

    #[test]
    fn test_action_binding_attaches_dispatcher() {
        let mut raw: serde_json::Value = serde_json::from_str(SAMPLE).expect("json");
        raw["controller"]["actions"] = serde_json::json!([
            { "place_id": "A", "type": "timer", "params": { "duration_ms": 10 } }
        ]);
        let config = parse_config(&raw.to_string()).expect("config");
        let pool = WorkerPool::new(2);
        let net = build_net(&config, &ActionRegistry::with_builtins(), &pool).expect("net");
        assert!(!net.place("A").expect("place A").is_passive());
        assert!(net.place("B").expect("place B").is_passive());
    }
}
