//! The epoch controller and the serialized control surface.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::Mutex;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use sluice_api::{AddTokenRequest, AddTokenResponse, ApiError, ControlApi, MarkingResponse};
use sluice_core::error::EngineError;
use sluice_core::exec::WorkerPool;
use sluice_core::net::{NetSnapshot, PetriNet};
use sluice_core::token::{Token, TokenId};

/// Runs the epoch loop over a net.
///
/// One engine task is the sole mutator of net state; external operations
/// go through [`ControllerHandle`] and take the same mutex, which the
/// loop releases across the epoch sleep. Shutdown stops dispatching after
/// the current tick and drains the worker pool.
pub struct Controller {
    net: Arc<Mutex<PetriNet>>,
    pool: WorkerPool,
    period: Duration,
    cancel: CancellationToken,
    running: AtomicBool,
}

impl Controller {
    pub fn new(net: PetriNet, pool: WorkerPool, period: Duration) -> Self {
        Self {
            net: Arc::new(Mutex::new(net)),
            pool,
            period,
            cancel: CancellationToken::new(),
            running: AtomicBool::new(false),
        }
    }

    /// Handle for external callers; cheap to clone.
    pub fn handle(&self) -> ControllerHandle {
        ControllerHandle {
            net: Arc::clone(&self.net),
            cancel: self.cancel.clone(),
        }
    }

    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Request shutdown; `run` returns after finishing the current tick.
    pub fn shutdown(&self) {
        self.cancel.cancel();
    }

    /// Run epochs until shutdown. Invariant violations abort the loop;
    /// the pool is drained either way. At most one loop per controller.
    pub async fn run(&self) -> Result<(), EngineError> {
        if self.running.swap(true, Ordering::SeqCst) {
            return Err(EngineError::Invariant(
                "epoch loop is already running".to_string(),
            ));
        }
        tracing::info!(
            period_ms = self.period.as_millis() as u64,
            workers = self.pool.width(),
            "epoch loop running"
        );
        let outcome = self.run_epochs().await;
        if let Err(error) = &outcome {
            tracing::error!(%error, "epoch loop aborted");
        }
        self.pool.shutdown().await;
        self.running.store(false, Ordering::SeqCst);
        tracing::info!("epoch loop stopped");
        outcome
    }

    async fn run_epochs(&self) -> Result<(), EngineError> {
        // Deadline-based pacing: ticks stay aligned to the schedule even
        // when an epoch's bookkeeping runs long.
        let mut ticks = tokio::time::interval(self.period);
        ticks.set_missed_tick_behavior(MissedTickBehavior::Delay);
        ticks.tick().await;

        while !self.cancel.is_cancelled() {
            self.net.lock().await.dispatch_actions()?;

            tokio::select! {
                _ = ticks.tick() => {}
                _ = self.cancel.cancelled() => break,
            }

            let mut net = self.net.lock().await;
            net.collect_results()?;
            net.fire_auto();
        }
        Ok(())
    }
}

/// Serialized external operations against a running (or paused) net.
#[derive(Clone)]
pub struct ControllerHandle {
    net: Arc<Mutex<PetriNet>>,
    cancel: CancellationToken,
}

impl ControllerHandle {
    /// Build a fresh token carrying `content_blocks` and insert it.
    pub async fn add_token(
        &self,
        content_blocks: &BTreeMap<String, Value>,
        place_id: &str,
    ) -> Result<TokenId, EngineError> {
        tracing::debug!(%place_id, blocks = content_blocks.len(), "add_token");
        let mut token = Token::new();
        for (key, content) in content_blocks {
            token.add_block(key.clone(), content.clone())?;
        }
        self.net.lock().await.insert_token(token, place_id)
    }

    pub async fn marking(&self) -> BTreeMap<String, usize> {
        self.net.lock().await.marking()
    }

    pub async fn net_snapshot(&self) -> NetSnapshot {
        self.net.lock().await.snapshot()
    }

    /// Fire a MANUAL transition once; AUTO transitions are rejected.
    pub async fn trigger_manual(&self, transition_id: &str) -> Result<(), EngineError> {
        tracing::debug!(%transition_id, "trigger_manual");
        self.net.lock().await.trigger(transition_id, true)
    }

    pub fn shutdown(&self) {
        self.cancel.cancel();
    }
}

#[async_trait]
impl ControlApi for ControllerHandle {
    async fn add_token(&self, request: AddTokenRequest) -> Result<AddTokenResponse, ApiError> {
        let token_id = self
            .add_token(&request.content_blocks, &request.place_id)
            .await?;
        Ok(AddTokenResponse {
            token_id,
            place_id: request.place_id,
        })
    }

    async fn marking(&self) -> Result<MarkingResponse, ApiError> {
        Ok(MarkingResponse {
            marking: self.net_snapshot().await.places,
        })
    }

    async fn trigger_manual(&self, transition_id: &str) -> Result<(), ApiError> {
        ControllerHandle::trigger_manual(self, transition_id)
            .await
            .map_err(ApiError::from)
    }
}
