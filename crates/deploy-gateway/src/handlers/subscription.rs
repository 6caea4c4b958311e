//! Subscription handler

use deploy_core::Topic;

use crate::connection::Connection;
use crate::protocol::ServerMessage;
use crate::server::GatewayState;

/// Handles topic subscribe and unsubscribe commands
pub struct SubscriptionHandler;

impl SubscriptionHandler {
    /// Subscribe to a topic and acknowledge
    ///
    /// Subscribing twice is a no-op that is still acknowledged.
    pub fn subscribe(state: &GatewayState, connection: &Connection, topic: &Topic) {
        let gateway = state.gateway();
        if !gateway.registry().subscribe(connection.id(), topic) {
            tracing::debug!(connection_id = %connection.id(), topic = %topic, "Subscribe on unregistered connection");
            return;
        }

        tracing::debug!(connection_id = %connection.id(), topic = %topic, "Subscribed");
        gateway
            .router()
            .send_to_connection(connection, &ServerMessage::subscribed(topic));
    }

    /// Unsubscribe from a topic and acknowledge
    pub fn unsubscribe(state: &GatewayState, connection: &Connection, topic: &Topic) {
        let gateway = state.gateway();
        if !gateway.registry().unsubscribe(connection.id(), topic) {
            tracing::debug!(connection_id = %connection.id(), topic = %topic, "Unsubscribe on unregistered connection");
            return;
        }

        tracing::debug!(connection_id = %connection.id(), topic = %topic, "Unsubscribed");
        gateway
            .router()
            .send_to_connection(connection, &ServerMessage::unsubscribed(topic));
    }
}
