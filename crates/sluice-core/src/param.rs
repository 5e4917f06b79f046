//! Token-relative configuration parameters.
//!
//! An action parameter drawn from config is either a direct literal or a
//! reference of the form `@token{block.path.to.leaf}`, resolved against a
//! token's content blocks at dispatch time. This lets actions be
//! parameterised per token without bespoke code in each implementation.

use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;

use crate::token::Token;

/// Parameter parse / resolution errors.
///
/// Resolution failures are reported by the dispatching action as an
/// `ERROR` outcome; they never cross threads as panics.
#[derive(Debug, Error)]
pub enum ParamError {
    #[error("invalid parameter literal: {0}")]
    InvalidLiteral(String),
    #[error("@token reference has an empty path")]
    EmptyPath,
    #[error("token has no content block for key '{0}'")]
    MissingBlock(String),
    #[error("no value at segment '{segment}' of @token path '{path}'")]
    MissingPath { segment: String, path: String },
    #[error("value at @token path '{path}' has unexpected type: {message}")]
    WrongType { path: String, message: String },
}

/// A config value of type `T`, either a cached literal or a token path.
///
/// `"@token{abc.def.ghi}"` resolves to `token.block("abc")["def"]["ghi"]`.
#[derive(Debug, Clone)]
pub enum ConfigParameter<T> {
    Literal(T),
    TokenPath(Vec<String>),
}

impl<T> ConfigParameter<T>
where
    T: DeserializeOwned + Clone,
{
    /// Parse a raw config value once, at load time.
    pub fn parse(raw: &Value) -> Result<Self, ParamError> {
        if let Some(text) = raw.as_str() {
            if text.contains("@token") {
                let inner = content_between(text, '{', '}').unwrap_or("");
                if inner.is_empty() {
                    return Err(ParamError::EmptyPath);
                }
                return Ok(Self::TokenPath(
                    inner.split('.').map(str::to_string).collect(),
                ));
            }
        }
        serde_json::from_value(raw.clone())
            .map(Self::Literal)
            .map_err(|e| ParamError::InvalidLiteral(e.to_string()))
    }

    /// Resolve against `token`: return the literal, or walk the path.
    pub fn resolve(&self, token: &Token) -> Result<T, ParamError> {
        match self {
            Self::Literal(value) => Ok(value.clone()),
            Self::TokenPath(path) => {
                let block_key = &path[0];
                let mut value = token
                    .block(block_key)
                    .map_err(|_| ParamError::MissingBlock(block_key.clone()))?;
                for segment in &path[1..] {
                    value = value.get(segment).ok_or_else(|| ParamError::MissingPath {
                        segment: segment.clone(),
                        path: path.join("."),
                    })?;
                }
                serde_json::from_value(value.clone()).map_err(|e| ParamError::WrongType {
                    path: path.join("."),
                    message: e.to_string(),
                })
            }
        }
    }
}

fn content_between(text: &str, start: char, end: char) -> Option<&str> {
    let from = text.find(start)? + start.len_utf8();
    let to = text[from..].find(end)? + from;
    Some(&text[from..to])
}
