//! Event publisher
//!
//! Collaborator-facing entry points. Webhooks are normalized into typed
//! events; direct publishes skip normalization. Either way the event is
//! routed once, fire-and-forget.

use deploy_core::{normalize, Event, EventType, NormalizationError, Topic};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use thiserror::Error;

use super::TopicRouter;
use crate::stats::GatewayStats;

/// Why a publish request was refused
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PublishError {
    #[error(transparent)]
    Normalization(#[from] NormalizationError),

    #[error("Unknown event type: {0}")]
    UnknownEventType(String),

    #[error("Event type {0} cannot be published")]
    NotPublishable(EventType),
}

impl PublishError {
    /// Get error code for API responses
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::Normalization(e) => e.code(),
            Self::UnknownEventType(_) => "UNKNOWN_EVENT_TYPE",
            Self::NotPublishable(_) => "NOT_PUBLISHABLE",
        }
    }
}

/// A pre-typed event supplied by a collaborator
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DirectEvent {
    #[serde(rename = "type")]
    pub event_type: String,
    #[serde(default)]
    pub payload: Value,
    #[serde(default)]
    pub project_id: Option<String>,
    #[serde(default)]
    pub deployment_id: Option<String>,
}

/// What a publish did
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublishReceipt {
    pub event_type: EventType,
    pub topics: Vec<Topic>,
    pub delivered: usize,
}

/// Publishes events into the router
#[derive(Debug)]
pub struct EventPublisher {
    router: Arc<TopicRouter>,
    stats: Arc<GatewayStats>,
}

impl EventPublisher {
    pub fn new(router: Arc<TopicRouter>, stats: Arc<GatewayStats>) -> Self {
        Self { router, stats }
    }

    /// Normalize a raw webhook and publish the resulting event
    ///
    /// # Errors
    /// Returns `PublishError::Normalization` if the payload cannot be mapped;
    /// the payload is dropped
    pub fn publish_webhook(&self, raw: &Value) -> Result<PublishReceipt, PublishError> {
        let normalized = normalize(raw).inspect_err(|e| {
            self.stats.record_webhook_rejected();
            tracing::warn!(error = %e, "Webhook rejected");
        })?;

        Ok(self.publish(normalized.into_event()))
    }

    /// Publish an event supplied with its type and correlation fields
    ///
    /// # Errors
    /// Returns an error for unknown types and for `connection_established`,
    /// which only the gateway may send
    pub fn publish_direct(&self, direct: DirectEvent) -> Result<PublishReceipt, PublishError> {
        let event_type = EventType::from_str(&direct.event_type)
            .ok_or_else(|| PublishError::UnknownEventType(direct.event_type.clone()))?;
        if event_type.is_direct() {
            return Err(PublishError::NotPublishable(event_type));
        }

        let event = Event::new(event_type, direct.payload).correlated(
            direct.project_id.filter(|id| !id.is_empty()),
            direct.deployment_id.filter(|id| !id.is_empty()),
        );
        Ok(self.publish(event))
    }

    /// Route an already typed event
    pub fn publish(&self, event: Event) -> PublishReceipt {
        let topics = event.target_topics();
        let delivered = if event.event_type().is_global() {
            self.router.broadcast_all(&event)
        } else {
            self.router.broadcast_topics(&topics, &event)
        };
        self.stats.record_event_published();

        tracing::debug!(
            event_type = %event.event_type(),
            topics = ?topics,
            delivered,
            "Event published"
        );

        PublishReceipt {
            event_type: event.event_type(),
            topics,
            delivered,
        }
    }
}
