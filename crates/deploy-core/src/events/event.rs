//! Relay events
//!
//! An event is immutable once built. Its correlation fields decide which topics
//! it is routed to.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::EventType;
use crate::value_objects::Topic;

/// A typed event ready for delivery
///
/// Serializes to the outbound wire envelope:
/// `{type, payload, timestamp, projectId?, deploymentId?}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    #[serde(rename = "type")]
    event_type: EventType,
    payload: Value,
    timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    project_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    deployment_id: Option<String>,
}

impl Event {
    /// Create an event stamped with the current time
    #[must_use]
    pub fn new(event_type: EventType, payload: Value) -> Self {
        Self {
            event_type,
            payload,
            timestamp: Utc::now(),
            project_id: None,
            deployment_id: None,
        }
    }

    /// Set the project correlation field
    #[must_use]
    pub fn with_project(mut self, project_id: impl Into<String>) -> Self {
        self.project_id = Some(project_id.into());
        self
    }

    /// Set the deployment correlation field
    #[must_use]
    pub fn with_deployment(mut self, deployment_id: impl Into<String>) -> Self {
        self.deployment_id = Some(deployment_id.into());
        self
    }

    /// Set both correlation fields from optional values
    #[must_use]
    pub fn correlated(mut self, project_id: Option<String>, deployment_id: Option<String>) -> Self {
        self.project_id = project_id;
        self.deployment_id = deployment_id;
        self
    }

    #[must_use]
    pub fn event_type(&self) -> EventType {
        self.event_type
    }

    #[must_use]
    pub fn payload(&self) -> &Value {
        &self.payload
    }

    #[must_use]
    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    #[must_use]
    pub fn project_id(&self) -> Option<&str> {
        self.project_id.as_deref()
    }

    #[must_use]
    pub fn deployment_id(&self) -> Option<&str> {
        self.deployment_id.as_deref()
    }

    /// Topics this event is delivered to
    ///
    /// `deployment:<id>` first when a deployment is set, then `project:<id>`.
    /// Global and direct events have no topics.
    #[must_use]
    pub fn target_topics(&self) -> Vec<Topic> {
        if self.event_type.is_global() || self.event_type.is_direct() {
            return Vec::new();
        }

        let mut topics = Vec::with_capacity(2);
        if let Some(deployment_id) = &self.deployment_id {
            topics.push(Topic::deployment(deployment_id.clone()));
        }
        if let Some(project_id) = &self.project_id {
            topics.push(Topic::project(project_id.clone()));
        }
        topics
    }
}
