//! Client commands
//!
//! Inbound frames are `{ "type": <command>, "payload": {...} }`. The envelope
//! is decoded first; a decode failure is a protocol error that closes the
//! connection. Command parsing failures only produce an error reply.

use deploy_core::Topic;
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

/// Raw inbound frame
#[derive(Debug, Clone, Deserialize)]
pub struct ClientEnvelope {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub payload: Value,
}

impl ClientEnvelope {
    /// Decode a text frame
    ///
    /// # Errors
    /// Returns an error if the text is not a JSON object with a string `type`
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }
}

/// A parsed client command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientCommand {
    Subscribe(Topic),
    Unsubscribe(Topic),
    Heartbeat,
    RequestUsers,
}

/// Reasons a well-formed frame could not be turned into a command
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandError {
    #[error("Unknown command: {0}")]
    UnknownCommand(String),

    #[error("Invalid payload for {command}: missing {field}")]
    MissingField {
        command: &'static str,
        field: &'static str,
    },
}

impl ClientCommand {
    /// Parse a command from its envelope
    ///
    /// # Errors
    /// Returns an error for unknown commands or payloads missing their id
    pub fn parse(envelope: &ClientEnvelope) -> Result<Self, CommandError> {
        let payload = &envelope.payload;
        match envelope.kind.as_str() {
            "subscribe:project" => {
                project_topic(payload, "subscribe:project").map(Self::Subscribe)
            }
            "unsubscribe:project" => {
                project_topic(payload, "unsubscribe:project").map(Self::Unsubscribe)
            }
            "subscribe:deployment" => {
                deployment_topic(payload, "subscribe:deployment").map(Self::Subscribe)
            }
            "unsubscribe:deployment" => {
                deployment_topic(payload, "unsubscribe:deployment").map(Self::Unsubscribe)
            }
            "heartbeat" => Ok(Self::Heartbeat),
            "request:users" => Ok(Self::RequestUsers),
            other => Err(CommandError::UnknownCommand(other.to_string())),
        }
    }

    /// Command name for logging
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Subscribe(_) => "subscribe",
            Self::Unsubscribe(_) => "unsubscribe",
            Self::Heartbeat => "heartbeat",
            Self::RequestUsers => "request:users",
        }
    }
}

fn project_topic(payload: &Value, command: &'static str) -> Result<Topic, CommandError> {
    id_field(payload, "projectId")
        .map(Topic::project)
        .ok_or(CommandError::MissingField {
            command,
            field: "projectId",
        })
}

fn deployment_topic(payload: &Value, command: &'static str) -> Result<Topic, CommandError> {
    id_field(payload, "deploymentId")
        .map(Topic::deployment)
        .ok_or(CommandError::MissingField {
            command,
            field: "deploymentId",
        })
}

fn id_field(payload: &Value, key: &str) -> Option<String> {
    match payload.get(key)? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
