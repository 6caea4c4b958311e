//! Online users handler

use crate::connection::Connection;
use crate::protocol::ServerMessage;
use crate::server::GatewayState;

/// Handles `request:users`
pub struct UsersHandler;

impl UsersHandler {
    /// Reply with the users that currently have at least one open connection
    pub fn handle(state: &GatewayState, connection: &Connection) {
        let users = state.gateway().registry().list_users();

        tracing::debug!(
            connection_id = %connection.id(),
            total = users.len(),
            "Online users requested"
        );

        state
            .gateway()
            .router()
            .send_to_connection(connection, &ServerMessage::users_list(&users));
    }
}
