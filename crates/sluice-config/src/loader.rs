//! Configuration loading and validation.

use std::collections::HashSet;
use std::fs;
use std::path::Path;

use regex::Regex;
use thiserror::Error;

use crate::{ArcDirection, SluiceConfig, TransitionConfig};

/// Configuration loading errors. All are fatal to net creation.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Load and validate a configuration file.
pub fn load_config(path: &Path) -> Result<SluiceConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    parse_config(&content)
}

/// Parse and validate configuration from a JSON string.
pub fn parse_config(content: &str) -> Result<SluiceConfig, ConfigError> {
    let config: SluiceConfig = serde_json::from_str(content)?;
    validate_config(&config)?;
    Ok(config)
}

/// Enforce the load-time rules; collects every violation into one error.
pub fn validate_config(config: &SluiceConfig) -> Result<(), ConfigError> {
    let mut errors: Vec<String> = Vec::new();

    let mut place_ids: HashSet<&str> = HashSet::new();
    for place in &config.petri_net.places {
        if !place_ids.insert(&place.place_id) {
            errors.push(format!("repeated place_id '{}'", place.place_id));
        }
    }

    let mut transition_ids: HashSet<&str> = HashSet::new();
    for transition in &config.petri_net.transitions {
        if !transition_ids.insert(&transition.transition_id) {
            errors.push(format!(
                "repeated transition_id '{}'",
                transition.transition_id
            ));
        }
        validate_transition(transition, &place_ids, &mut errors);
    }

    let mut action_places: HashSet<&str> = HashSet::new();
    for binding in &config.controller.actions {
        if !place_ids.contains(binding.place_id.as_str()) {
            errors.push(format!(
                "action of type '{}' references unknown place '{}'",
                binding.kind, binding.place_id
            ));
        }
        if !action_places.insert(&binding.place_id) {
            errors.push(format!(
                "place '{}' has more than one action binding",
                binding.place_id
            ));
        }
        if binding.kind.trim().is_empty() {
            errors.push(format!(
                "action binding for place '{}' has an empty type",
                binding.place_id
            ));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(ConfigError::Invalid(errors.join("; ")))
    }
}

fn validate_transition(
    transition: &TransitionConfig,
    place_ids: &HashSet<&str>,
    errors: &mut Vec<String>,
) {
    let id = &transition.transition_id;

    if transition.transition_type.is_none() {
        tracing::warn!(
            transition_id = %id,
            "transition_type not set, defaulting to AUTO"
        );
    }

    let mut input_count = 0usize;
    let mut seen: HashSet<(&str, ArcDirection)> = HashSet::new();
    for arc in &transition.transition_arcs {
        if !place_ids.contains(arc.place_id.as_str()) {
            errors.push(format!(
                "transition '{}' arc references unknown place '{}'",
                id, arc.place_id
            ));
        }
        if !seen.insert((&arc.place_id, arc.direction)) {
            errors.push(format!(
                "transition '{}' has two {:?} arcs on place '{}'",
                id, arc.direction, arc.place_id
            ));
        }

        match arc.direction {
            ArcDirection::Input => {
                input_count += 1;
                if arc.token_content_filter.is_some() {
                    errors.push(format!(
                        "transition '{}': token_content_filter is only allowed on OUTPUT arcs",
                        id
                    ));
                }
            }
            ArcDirection::Output => {
                if arc.action_result_filter.is_some() {
                    errors.push(format!(
                        "transition '{}': action_result_filter is only allowed on INPUT arcs",
                        id
                    ));
                }
                if let Some(filter) = &arc.token_content_filter {
                    if let Err(e) = Regex::new(filter) {
                        errors.push(format!(
                            "transition '{}': invalid token_content_filter '{}': {}",
                            id, filter, e
                        ));
                    }
                }
            }
        }
    }

    if input_count == 0 {
        errors.push(format!("transition '{}' has no input arcs", id));
    }
}
