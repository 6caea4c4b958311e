//! Event types
//!
//! Defines every event name the relay can deliver to clients.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Relay event types
///
/// These are the names sent in the `type` field of outbound messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    // Connection events
    /// Sent to a connection right after it is accepted
    ConnectionEstablished,
    /// A user opened their first concurrent connection
    UserConnected,
    /// A user closed their last connection
    UserDisconnected,

    // Deployment events
    DeploymentStarted,
    DeploymentUpdated,
    DeploymentCompleted,
    DeploymentFailed,

    // Step events
    StepStarted,
    StepUpdated,
    StepCompleted,
    StepFailed,
    StepRetrying,

    // Streams
    /// A deployment log line
    LogEntry,
    /// Resource metrics snapshot
    MetricsUpdate,

    // System events
    SystemAlert,
    /// Server liveness ping
    Heartbeat,
}

impl EventType {
    /// All event types, in declaration order
    pub const ALL: [Self; 16] = [
        Self::ConnectionEstablished,
        Self::UserConnected,
        Self::UserDisconnected,
        Self::DeploymentStarted,
        Self::DeploymentUpdated,
        Self::DeploymentCompleted,
        Self::DeploymentFailed,
        Self::StepStarted,
        Self::StepUpdated,
        Self::StepCompleted,
        Self::StepFailed,
        Self::StepRetrying,
        Self::LogEntry,
        Self::MetricsUpdate,
        Self::SystemAlert,
        Self::Heartbeat,
    ];

    /// Get the string representation of the event type
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ConnectionEstablished => "connection_established",
            Self::UserConnected => "user_connected",
            Self::UserDisconnected => "user_disconnected",
            Self::DeploymentStarted => "deployment_started",
            Self::DeploymentUpdated => "deployment_updated",
            Self::DeploymentCompleted => "deployment_completed",
            Self::DeploymentFailed => "deployment_failed",
            Self::StepStarted => "step_started",
            Self::StepUpdated => "step_updated",
            Self::StepCompleted => "step_completed",
            Self::StepFailed => "step_failed",
            Self::StepRetrying => "step_retrying",
            Self::LogEntry => "log_entry",
            Self::MetricsUpdate => "metrics_update",
            Self::SystemAlert => "system_alert",
            Self::Heartbeat => "heartbeat",
        }
    }

    /// Parse an event type from a string
    #[must_use]
    pub fn from_str(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.as_str() == s)
    }

    /// Whether this event goes to every open connection instead of a topic
    #[must_use]
    pub const fn is_global(self) -> bool {
        matches!(
            self,
            Self::UserConnected | Self::UserDisconnected | Self::SystemAlert | Self::Heartbeat
        )
    }

    /// Whether this event is addressed to a single connection only
    #[must_use]
    pub const fn is_direct(self) -> bool {
        matches!(self, Self::ConnectionEstablished)
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl From<EventType> for String {
    fn from(event: EventType) -> Self {
        event.as_str().to_string()
    }
}
