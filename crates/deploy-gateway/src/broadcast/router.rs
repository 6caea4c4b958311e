//! Topic router
//!
//! Fans events out to subscribed connections. Every message is serialized
//! once, then queued to each recipient with a non-blocking send. A recipient
//! whose queue is full or closed is disconnected as a slow consumer; the
//! others are unaffected.

use deploy_core::{Event, Topic};
use serde::Serialize;
use std::sync::Arc;

use crate::connection::{Connection, ConnectionId, Frame, SessionRegistry};
use crate::protocol::CloseCode;
use crate::stats::GatewayStats;

/// Routes outbound messages to connections
#[derive(Debug)]
pub struct TopicRouter {
    registry: Arc<SessionRegistry>,
    stats: Arc<GatewayStats>,
}

impl TopicRouter {
    /// Create a new router over a registry
    pub fn new(registry: Arc<SessionRegistry>, stats: Arc<GatewayStats>) -> Self {
        Self { registry, stats }
    }

    /// Deliver an event to every subscriber of one topic
    ///
    /// Zero subscribers is not an error.
    pub fn broadcast(&self, topic: &Topic, event: &Event) -> usize {
        let targets = self.registry.subscribers_of(topic);
        let delivered = self.deliver_all(&targets, event);

        tracing::trace!(
            topic = %topic,
            event_type = %event.event_type(),
            delivered,
            "Event broadcast to topic"
        );

        delivered
    }

    /// Deliver an event once to every connection subscribed to any of the topics
    pub fn broadcast_topics(&self, topics: &[Topic], event: &Event) -> usize {
        if topics.is_empty() {
            return 0;
        }

        let targets = self.registry.subscribers_of_any(topics);
        let delivered = self.deliver_all(&targets, event);

        tracing::trace!(
            topics = ?topics,
            event_type = %event.event_type(),
            delivered,
            "Event broadcast to topics"
        );

        delivered
    }

    /// Deliver an event to every open connection
    pub fn broadcast_all(&self, event: &Event) -> usize {
        let targets = self.registry.all();
        let delivered = self.deliver_all(&targets, event);

        tracing::trace!(
            event_type = %event.event_type(),
            delivered,
            "Event broadcast to all connections"
        );

        delivered
    }

    /// Deliver a message to one registered connection
    pub fn send_to<M: Serialize>(&self, id: ConnectionId, message: &M) -> bool {
        match self.registry.get(id) {
            Some(connection) => self.send_to_connection(&connection, message),
            None => false,
        }
    }

    /// Deliver a message to a connection the caller already holds
    pub fn send_to_connection<M: Serialize>(&self, connection: &Connection, message: &M) -> bool {
        encode(message).is_some_and(|frame| self.deliver(connection, frame))
    }

    fn deliver_all<M: Serialize>(&self, targets: &[Arc<Connection>], message: &M) -> usize {
        if targets.is_empty() {
            return 0;
        }

        let Some(frame) = encode(message) else {
            return 0;
        };

        targets
            .iter()
            .filter(|connection| self.deliver(connection, frame.clone()))
            .count()
    }

    fn deliver(&self, connection: &Connection, frame: Frame) -> bool {
        match connection.try_deliver(frame) {
            Ok(()) => true,
            Err(e) => {
                self.stats.record_delivery_failure();
                tracing::warn!(
                    connection_id = %connection.id(),
                    user_id = %connection.user_id(),
                    error = %e,
                    "Delivery failed, closing slow consumer"
                );
                connection.close(CloseCode::SlowConsumer);
                false
            }
        }
    }
}

fn encode<M: Serialize>(message: &M) -> Option<Frame> {
    match serde_json::to_string(message) {
        Ok(json) => Some(Arc::from(json)),
        Err(e) => {
            tracing::error!(error = %e, "Failed to serialize outbound message");
            None
        }
    }
}
