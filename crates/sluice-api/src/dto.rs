//! Control-surface data transfer objects.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use sluice_core::place::PlaceSnapshot;
use sluice_core::token::TokenId;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddTokenRequest {
    pub place_id: String,
    /// Block key to payload; one content block per entry.
    pub content_blocks: BTreeMap<String, Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddTokenResponse {
    pub token_id: TokenId,
    pub place_id: String,
}

/// Per-place counts: total plus the busy/available/per-outcome split.
#[derive(Debug, Clone, Serialize)]
pub struct MarkingResponse {
    pub marking: BTreeMap<String, PlaceSnapshot>,
}
