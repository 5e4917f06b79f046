//! The net: places, transitions, and the per-epoch phase helpers.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Serialize;

use crate::error::EngineError;
use crate::exec::ActionDispatcher;
use crate::place::{Place, PlaceSnapshot};
use crate::token::{Token, TokenId};
use crate::transition::{Transition, TransitionMode};

/// Structured view of the whole net for display and tests.
#[derive(Debug, Clone, Serialize)]
pub struct NetSnapshot {
    pub places: BTreeMap<String, PlaceSnapshot>,
}

/// Owns the places and the ordered transition vector.
///
/// The net is a passive structure: the epoch scheduler drives the
/// dispatch / collect / fire-auto phases, and the control surface calls
/// token insertion, marking queries, and manual triggering. All access is
/// serialized by the caller.
pub struct PetriNet {
    places: BTreeMap<String, Place>,
    transitions: Vec<Transition>,
}

impl PetriNet {
    pub fn new(places: Vec<Place>, transitions: Vec<Transition>) -> Self {
        let places = places
            .into_iter()
            .map(|place| (place.id().to_string(), place))
            .collect();
        Self {
            places,
            transitions,
        }
    }

    pub fn place(&self, place_id: &str) -> Option<&Place> {
        self.places.get(place_id)
    }

    /// Associate a built action with a place.
    pub fn attach_action(
        &mut self,
        place_id: &str,
        dispatcher: ActionDispatcher,
    ) -> Result<(), EngineError> {
        let place = self
            .places
            .get_mut(place_id)
            .ok_or_else(|| EngineError::UnknownPlace(place_id.to_string()))?;
        place.attach_action(dispatcher)
    }

    /// Insert a freshly built token into the named place.
    pub fn insert_token(&mut self, token: Token, place_id: &str) -> Result<TokenId, EngineError> {
        let place = self
            .places
            .get_mut(place_id)
            .ok_or_else(|| EngineError::UnknownPlace(place_id.to_string()))?;
        let token_id = token.id();
        place.insert(Arc::new(token));
        Ok(token_id)
    }

    /// Fire the named transition once.
    ///
    /// With `require_manual` set (the external trigger path) the request
    /// is rejected unless the transition is MANUAL.
    pub fn trigger(&mut self, transition_id: &str, require_manual: bool) -> Result<(), EngineError> {
        let transition = self
            .transitions
            .iter()
            .find(|transition| transition.id() == transition_id)
            .ok_or_else(|| EngineError::UnknownTransition(transition_id.to_string()))?;

        if require_manual && transition.mode() != TransitionMode::Manual {
            return Err(EngineError::NotManual(transition_id.to_string()));
        }
        transition.fire(&mut self.places)
    }

    /// Total token count per place.
    pub fn marking(&self) -> BTreeMap<String, usize> {
        self.places
            .iter()
            .map(|(id, place)| (id.clone(), place.total_count()))
            .collect()
    }

    pub fn snapshot(&self) -> NetSnapshot {
        NetSnapshot {
            places: self
                .places
                .iter()
                .map(|(id, place)| (id.clone(), place.snapshot()))
                .collect(),
        }
    }

    /// Epoch phase 1: forward busy tokens to every active place's action.
    pub fn dispatch_actions(&mut self) -> Result<(), EngineError> {
        for place in self.places.values_mut() {
            place.dispatch_actions()?;
        }
        Ok(())
    }

    /// Epoch phase 3: collect outcomes and migrate completed tokens.
    pub fn collect_results(&mut self) -> Result<(), EngineError> {
        for place in self.places.values_mut() {
            place.collect_results()?;
        }
        Ok(())
    }

    /// Epoch phase 4: fire each enabled AUTO transition at most once, in
    /// definition order. A failed firing (merge key collision is a config
    /// bug) aborts that firing only and is logged with its metadata.
    pub fn fire_auto(&mut self) {
        let places = &mut self.places;
        for transition in &self.transitions {
            if transition.mode() != TransitionMode::Auto {
                continue;
            }
            if transition.is_enabled(places) {
                if let Err(error) = transition.fire(places) {
                    tracing::error!(
                        transition_id = %transition.id(),
                        %error,
                        "auto transition firing failed"
                    );
                }
            }
        }
    }
}
