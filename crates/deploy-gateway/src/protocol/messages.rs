//! Server reply messages
//!
//! Replies share the outbound envelope with events:
//! `{type, payload, timestamp, projectId?, deploymentId?}`.

use chrono::{DateTime, Utc};
use deploy_core::Topic;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::connection::UserSummary;

/// A reply addressed to a single connection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerMessage {
    #[serde(rename = "type")]
    pub kind: String,
    pub payload: Value,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deployment_id: Option<String>,
}

impl ServerMessage {
    #[must_use]
    pub fn new(kind: impl Into<String>, payload: Value) -> Self {
        Self {
            kind: kind.into(),
            payload,
            timestamp: Utc::now(),
            project_id: None,
            deployment_id: None,
        }
    }

    /// Acknowledge a subscription
    #[must_use]
    pub fn subscribed(topic: &Topic) -> Self {
        Self::new("subscribed", topic_payload(topic)).correlated(topic)
    }

    /// Acknowledge an unsubscription
    #[must_use]
    pub fn unsubscribed(topic: &Topic) -> Self {
        Self::new("unsubscribed", topic_payload(topic)).correlated(topic)
    }

    /// Reply to a client heartbeat
    #[must_use]
    pub fn heartbeat_ack() -> Self {
        Self::new(
            "heartbeat:ack",
            json!({ "timestamp": Utc::now().timestamp_millis() }),
        )
    }

    /// Reply to `request:users`
    #[must_use]
    pub fn users_list(users: &[UserSummary]) -> Self {
        Self::new(
            "users:list",
            json!({
                "users": users,
                "total": users.len(),
                "timestamp": Utc::now().timestamp_millis(),
            }),
        )
    }

    /// Report a rejected command
    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        Self::new("error", json!({ "message": message.into() }))
    }

    fn correlated(mut self, topic: &Topic) -> Self {
        match topic {
            Topic::Project(id) => self.project_id = Some(id.clone()),
            Topic::Deployment(id) => self.deployment_id = Some(id.clone()),
        }
        self
    }

    /// Serialize to JSON string
    ///
    /// # Errors
    /// Returns an error if serialization fails
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

fn topic_payload(topic: &Topic) -> Value {
    json!({ "type": topic.kind(), "id": topic.id() })
}
