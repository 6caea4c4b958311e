//! Connection gateway
//!
//! Authenticates new transport sessions, wires accepted connections into the
//! registry, and runs disconnect cleanup exactly once per connection.

use deploy_common::{AuthError, JwtService, RealtimeConfig};
use deploy_core::{Event, EventType};
use serde_json::json;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use super::{CapacityExceeded, Connection, ConnectionId, Frame, SessionRegistry};
use crate::broadcast::TopicRouter;
use crate::protocol::CloseCode;
use crate::stats::GatewayStats;

/// Why a connection attempt was refused
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AcceptError {
    #[error("authentication failed: {0}")]
    Auth(#[from] AuthError),

    #[error(transparent)]
    CapacityExceeded(#[from] CapacityExceeded),
}

impl AcceptError {
    /// Close code sent to the refused client
    #[must_use]
    pub fn close_code(&self) -> CloseCode {
        match self {
            Self::Auth(_) => CloseCode::AuthenticationFailed,
            Self::CapacityExceeded(_) => CloseCode::CapacityExceeded,
        }
    }
}

/// An accepted connection and the receiving end of its outbound queue
#[derive(Debug)]
pub struct Accepted {
    pub connection: Arc<Connection>,
    pub receiver: mpsc::Receiver<Frame>,
}

/// Entry point for connection lifecycle
#[derive(Debug)]
pub struct ConnectionGateway {
    registry: Arc<SessionRegistry>,
    router: Arc<TopicRouter>,
    stats: Arc<GatewayStats>,
    jwt: JwtService,
    config: RealtimeConfig,
    shutdown: CancellationToken,
}

impl ConnectionGateway {
    /// Create a gateway with fresh registry and router
    pub fn new(jwt: JwtService, config: RealtimeConfig, shutdown: CancellationToken) -> Self {
        let registry = SessionRegistry::new_shared();
        let stats = Arc::new(GatewayStats::new());
        let router = Arc::new(TopicRouter::new(registry.clone(), stats.clone()));

        Self {
            registry,
            router,
            stats,
            jwt,
            config,
            shutdown,
        }
    }

    /// Authenticate and register a new connection
    ///
    /// On success the connection has been sent `connection_established` and,
    /// if it is the user's first connection, `user_connected` has been
    /// broadcast. On failure nothing is registered.
    ///
    /// # Errors
    /// Returns `AcceptError::Auth` for a missing or invalid token and
    /// `AcceptError::CapacityExceeded` when the connection limit is reached
    pub fn accept(&self, token: Option<&str>) -> Result<Accepted, AcceptError> {
        let user_id = self.jwt.verify(token).inspect_err(|e| {
            self.stats.record_rejected_auth();
            tracing::warn!(error = %e, "Connection rejected: authentication failed");
        })?;

        let (sender, receiver) = mpsc::channel(self.config.send_queue_capacity);
        let connection = Connection::new(user_id, sender, self.shutdown.child_token());

        let registration = self
            .registry
            .register(connection.clone(), self.config.max_connections)
            .inspect_err(|e| {
                self.stats.record_rejected_capacity();
                tracing::warn!(
                    user_id = %connection.user_id(),
                    error = %e,
                    "Connection rejected: capacity exceeded"
                );
            })?;
        self.stats.record_accepted();

        tracing::info!(
            connection_id = %connection.id(),
            user_id = %connection.user_id(),
            connections = registration.total_connections,
            "Connection accepted"
        );

        let established = Event::new(
            EventType::ConnectionEstablished,
            json!({
                "connectionId": connection.id(),
                "userId": connection.user_id(),
                "heartbeatInterval": self.config.heartbeat_interval_ms,
            }),
        );
        self.router.send_to_connection(&connection, &established);

        if registration.first_for_user {
            let connected = Event::new(
                EventType::UserConnected,
                json!({
                    "userId": connection.user_id(),
                    "connectionCount": registration.total_connections,
                }),
            );
            self.router.broadcast_all(&connected);
        }

        Ok(Accepted {
            connection,
            receiver,
        })
    }

    /// Remove a connection and notify peers if its user went offline
    ///
    /// Safe to call more than once; only the first call has any effect.
    /// Returns `true` if this call removed the connection.
    pub fn disconnect(&self, id: ConnectionId) -> bool {
        let Some(removal) = self.registry.remove(id) else {
            return false;
        };

        let connection = removal.connection;
        connection.release();

        tracing::info!(
            connection_id = %id,
            user_id = %connection.user_id(),
            close_code = ?connection.close_code(),
            topics = removal.topics.len(),
            "Connection closed"
        );

        if removal.last_for_user {
            let disconnected = Event::new(
                EventType::UserDisconnected,
                json!({ "userId": connection.user_id() }),
            );
            self.router.broadcast_all(&disconnected);
        }

        true
    }

    /// Close every open connection with a code and clean it up
    pub fn close_all(&self, code: CloseCode) -> usize {
        let connections = self.registry.all();
        for connection in &connections {
            connection.close(code);
            self.disconnect(connection.id());
        }
        connections.len()
    }

    pub fn registry(&self) -> &Arc<SessionRegistry> {
        &self.registry
    }

    pub fn router(&self) -> &Arc<TopicRouter> {
        &self.router
    }

    pub fn stats(&self) -> &Arc<GatewayStats> {
        &self.stats
    }

    pub fn config(&self) -> &RealtimeConfig {
        &self.config
    }

    pub fn shutdown_token(&self) -> &CancellationToken {
        &self.shutdown
    }
}
