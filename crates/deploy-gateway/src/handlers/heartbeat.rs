//! Heartbeat handler

use crate::connection::Connection;
use crate::protocol::ServerMessage;
use crate::server::GatewayState;

/// Handles client heartbeats
pub struct HeartbeatHandler;

impl HeartbeatHandler {
    /// Acknowledge a heartbeat
    ///
    /// Activity was already recorded when the frame arrived.
    pub fn handle(state: &GatewayState, connection: &Connection) {
        tracing::trace!(connection_id = %connection.id(), "Heartbeat received");

        state
            .gateway()
            .router()
            .send_to_connection(connection, &ServerMessage::heartbeat_ack());
    }
}
