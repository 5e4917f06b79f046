use thiserror::Error;

use sluice_core::error::EngineError;
use sluice_core::token::TokenError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    NotFound,
    InvalidArgument,
    Conflict,
    Internal,
}

impl ErrorCode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::NotFound => "not_found",
            Self::InvalidArgument => "invalid_argument",
            Self::Conflict => "conflict",
            Self::Internal => "internal",
        }
    }
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("not found: {0}")]
    NotFound(String),
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("internal: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::NotFound(_) => ErrorCode::NotFound,
            Self::InvalidArgument(_) => ErrorCode::InvalidArgument,
            Self::Conflict(_) => ErrorCode::Conflict,
            Self::Internal(_) => ErrorCode::Internal,
        }
    }
}

impl From<EngineError> for ApiError {
    fn from(error: EngineError) -> Self {
        match &error {
            EngineError::UnknownPlace(_) | EngineError::UnknownTransition(_) => {
                Self::NotFound(error.to_string())
            }
            EngineError::NotManual(_) | EngineError::Token(TokenError::DuplicateBlock(_)) => {
                Self::InvalidArgument(error.to_string())
            }
            EngineError::Token(TokenError::BlockNotFound(_)) => {
                Self::InvalidArgument(error.to_string())
            }
            EngineError::NotEnabled(_) | EngineError::MergeConflict { .. } => {
                Self::Conflict(error.to_string())
            }
            EngineError::ActionAlreadyAttached(_) | EngineError::Invariant(_) => {
                Self::Internal(error.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_engine_errors_map_to_codes() {
        let cases = [
            (
                ApiError::from(EngineError::UnknownPlace("A".into())),
                ErrorCode::NotFound,
            ),
            (
                ApiError::from(EngineError::NotManual("T1".into())),
                ErrorCode::InvalidArgument,
            ),
            (
                ApiError::from(EngineError::NotEnabled("T1".into())),
                ErrorCode::Conflict,
            ),
            (
                ApiError::from(EngineError::Invariant("boom".into())),
                ErrorCode::Internal,
            ),
        ];
        for (error, code) in cases {
            assert_eq!(error.code(), code);
        }
    }
}
