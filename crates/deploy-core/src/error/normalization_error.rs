//! Normalization errors - raised when an inbound webhook cannot be mapped to an event

use thiserror::Error;

/// Webhook normalization errors
///
/// A rejected payload is logged and discarded; it is never delivered to clients.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NormalizationError {
    #[error("Invalid webhook payload: {0}")]
    InvalidPayload(String),
}

impl NormalizationError {
    /// Create an invalid payload error
    #[must_use]
    pub fn invalid(reason: impl Into<String>) -> Self {
        Self::InvalidPayload(reason.into())
    }

    /// Get error code for API responses
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidPayload(_) => "INVALID_PAYLOAD",
        }
    }
}
