//! Handler error types

use crate::protocol::{CloseCode, CommandError};
use thiserror::Error;

/// Handler error type
#[derive(Debug, Error)]
pub enum HandlerError {
    /// Frame was not a valid envelope
    #[error("Decode error: {0}")]
    Decode(#[from] serde_json::Error),

    /// Frame decoded but named no usable command
    #[error(transparent)]
    Command(#[from] CommandError),
}

impl HandlerError {
    /// Convert to a close code (if applicable)
    ///
    /// Command errors are answered with an `error` reply and keep the
    /// connection open.
    pub fn to_close_code(&self) -> Option<CloseCode> {
        match self {
            Self::Decode(_) => Some(CloseCode::DecodeError),
            Self::Command(_) => None,
        }
    }
}

/// Handler result type
pub type HandlerResult<T> = Result<T, HandlerError>;
