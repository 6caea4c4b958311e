//! Client command handlers
//!
//! Decodes inbound text frames and routes each command to its handler.

mod error;
mod heartbeat;
mod subscription;
mod users;

pub use error::{HandlerError, HandlerResult};
pub use heartbeat::HeartbeatHandler;
pub use subscription::SubscriptionHandler;
pub use users::UsersHandler;

use crate::connection::Connection;
use crate::protocol::{ClientCommand, ClientEnvelope, CloseCode, ServerMessage};
use crate::server::GatewayState;

/// Dispatch incoming client frames to the appropriate handlers
pub struct CommandDispatcher;

impl CommandDispatcher {
    /// Handle one inbound text frame
    ///
    /// Any inbound frame counts as activity. Returns a close code when the
    /// frame is a protocol violation; command errors are answered with an
    /// `error` reply instead.
    pub fn handle_text(state: &GatewayState, connection: &Connection, text: &str) -> Option<CloseCode> {
        connection.touch();

        let Err(e) = Self::process(state, connection, text) else {
            return None;
        };

        if let Some(code) = e.to_close_code() {
            tracing::debug!(
                connection_id = %connection.id(),
                error = %e,
                "Closing connection on protocol error"
            );
            return Some(code);
        }

        tracing::debug!(connection_id = %connection.id(), error = %e, "Rejected command");
        state
            .gateway()
            .router()
            .send_to_connection(connection, &ServerMessage::error(e.to_string()));
        None
    }

    fn process(state: &GatewayState, connection: &Connection, text: &str) -> HandlerResult<()> {
        let envelope = ClientEnvelope::from_json(text)?;
        let command = ClientCommand::parse(&envelope)?;
        Self::dispatch(state, connection, command);
        Ok(())
    }

    /// Run a parsed command
    pub fn dispatch(state: &GatewayState, connection: &Connection, command: ClientCommand) {
        tracing::trace!(
            connection_id = %connection.id(),
            command = command.name(),
            "Received command"
        );

        match command {
            ClientCommand::Subscribe(topic) => SubscriptionHandler::subscribe(state, connection, &topic),
            ClientCommand::Unsubscribe(topic) => {
                SubscriptionHandler::unsubscribe(state, connection, &topic);
            }
            ClientCommand::Heartbeat => HeartbeatHandler::handle(state, connection),
            ClientCommand::RequestUsers => UsersHandler::handle(state, connection),
        }
    }
}
