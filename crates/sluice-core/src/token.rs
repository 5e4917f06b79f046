//! Coloured tokens: identity-bearing carriers of keyed payload blocks.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

static NEXT_TOKEN_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique token identity.
///
/// Two tokens with identical payloads are still distinct entities; all
/// token equality in the engine goes through this id.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct TokenId(u64);

impl TokenId {
    fn next() -> Self {
        Self(NEXT_TOKEN_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for TokenId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Token content errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TokenError {
    #[error("token has no content block for key '{0}'")]
    BlockNotFound(String),
    #[error("token already has a content block for key '{0}'")]
    DuplicateBlock(String),
}

/// A token: the unit of flow through the net.
///
/// Tokens carry a mapping from block key to an arbitrary JSON payload.
/// They are created by external insertion, merged and projected during
/// transition firing, and otherwise immutable while resident in a place.
#[derive(Debug)]
pub struct Token {
    id: TokenId,
    blocks: BTreeMap<String, Value>,
}

impl Token {
    pub fn new() -> Self {
        Self {
            id: TokenId::next(),
            blocks: BTreeMap::new(),
        }
    }

    pub fn id(&self) -> TokenId {
        self.id
    }

    pub fn has_block(&self, key: &str) -> bool {
        self.blocks.contains_key(key)
    }

    pub fn block(&self, key: &str) -> Result<&Value, TokenError> {
        self.blocks
            .get(key)
            .ok_or_else(|| TokenError::BlockNotFound(key.to_string()))
    }

    pub fn add_block(&mut self, key: impl Into<String>, content: Value) -> Result<(), TokenError> {
        let key = key.into();
        if self.blocks.contains_key(&key) {
            return Err(TokenError::DuplicateBlock(key));
        }
        self.blocks.insert(key, content);
        Ok(())
    }

    /// Merge all of `other`'s blocks into this token.
    ///
    /// Fails without modifying `self` if any key is already present.
    pub fn merge_blocks(&mut self, other: &Token) -> Result<(), TokenError> {
        if let Some(key) = other.blocks.keys().find(|key| self.blocks.contains_key(*key)) {
            return Err(TokenError::DuplicateBlock(key.clone()));
        }
        for (key, content) in &other.blocks {
            self.blocks.insert(key.clone(), content.clone());
        }
        Ok(())
    }

    /// Retain only the blocks whose key satisfies `predicate`.
    pub fn filter_blocks<F>(&mut self, predicate: F)
    where
        F: Fn(&str) -> bool,
    {
        self.blocks.retain(|key, _| predicate(key));
    }

    pub fn blocks(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.blocks.iter()
    }

    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }
}

impl Default for Token {
    fn default() -> Self {
        Self::new()
    }
}
