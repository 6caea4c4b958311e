//! WebSocket close codes
//!
//! Defines gateway-specific close codes for WebSocket connections.

use serde::{Deserialize, Serialize};

/// Gateway WebSocket close codes
///
/// These codes are sent when closing a WebSocket connection to indicate the reason.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u16)]
pub enum CloseCode {
    /// Unknown error occurred
    UnknownError = 4000,
    /// Invalid payload encoding (JSON decode error or binary frame)
    DecodeError = 4002,
    /// Invalid or missing token
    AuthenticationFailed = 4004,
    /// Outbound queue was full or closed
    SlowConsumer = 4008,
    /// No inbound activity within the liveness window
    SessionTimeout = 4009,
    /// Server is shutting down
    ServerShutdown = 4012,
    /// Connection limit reached
    CapacityExceeded = 4013,
}

impl CloseCode {
    /// Create a `CloseCode` from a raw u16 value
    #[must_use]
    pub fn from_u16(value: u16) -> Option<Self> {
        match value {
            4000 => Some(Self::UnknownError),
            4002 => Some(Self::DecodeError),
            4004 => Some(Self::AuthenticationFailed),
            4008 => Some(Self::SlowConsumer),
            4009 => Some(Self::SessionTimeout),
            4012 => Some(Self::ServerShutdown),
            4013 => Some(Self::CapacityExceeded),
            _ => None,
        }
    }

    /// Get the raw u16 value
    #[must_use]
    pub const fn as_u16(self) -> u16 {
        self as u16
    }

    /// Check if the client should attempt to reconnect after this close code
    #[must_use]
    pub const fn should_reconnect(self) -> bool {
        !matches!(self, Self::AuthenticationFailed | Self::DecodeError)
    }

    /// Get the description for this close code
    #[must_use]
    pub const fn description(self) -> &'static str {
        match self {
            Self::UnknownError => "Unknown error occurred",
            Self::DecodeError => "Invalid payload encoding",
            Self::AuthenticationFailed => "Authentication failed",
            Self::SlowConsumer => "Slow consumer",
            Self::SessionTimeout => "Session timeout",
            Self::ServerShutdown => "Server shutting down",
            Self::CapacityExceeded => "Connection limit reached",
        }
    }

    /// Get the name of this close code
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::UnknownError => "UnknownError",
            Self::DecodeError => "DecodeError",
            Self::AuthenticationFailed => "AuthenticationFailed",
            Self::SlowConsumer => "SlowConsumer",
            Self::SessionTimeout => "SessionTimeout",
            Self::ServerShutdown => "ServerShutdown",
            Self::CapacityExceeded => "CapacityExceeded",
        }
    }
}

impl std::fmt::Display for CloseCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({}): {}", self.name(), self.as_u16(), self.description())
    }
}

impl From<CloseCode> for u16 {
    fn from(code: CloseCode) -> Self {
        code.as_u16()
    }
}
