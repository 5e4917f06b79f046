//! # Sluice API
//!
//! Transport-agnostic control surface: request/response DTOs, the
//! [`ControlApi`] trait served by the runtime, and the error envelope a
//! binding maps onto its transport. One binding is HTTP; any
//! request/response transport is equivalent.

mod dto;
mod error;

pub use dto::{AddTokenRequest, AddTokenResponse, MarkingResponse};
pub use error::{ApiError, ErrorCode};

use async_trait::async_trait;

/// The three operations exposed to external callers, serialized with the
/// epoch loop.
#[async_trait]
pub trait ControlApi: Send + Sync {
    /// Build a fresh token from the request's content blocks and insert
    /// it into the named place.
    async fn add_token(&self, request: AddTokenRequest) -> Result<AddTokenResponse, ApiError>;

    /// Per-place counts: total plus the busy/available/per-outcome split.
    async fn marking(&self) -> Result<MarkingResponse, ApiError>;

    /// Fire a MANUAL transition once.
    async fn trigger_manual(&self, transition_id: &str) -> Result<(), ApiError>;
}
