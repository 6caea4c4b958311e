//! Gateway state
//!
//! Application state shared by the WebSocket and HTTP handlers.

use crate::broadcast::EventPublisher;
use crate::connection::ConnectionGateway;
use deploy_common::AppConfig;
use std::sync::Arc;

/// Gateway application state
#[derive(Clone)]
pub struct GatewayState {
    /// Connection lifecycle, registry and router
    gateway: Arc<ConnectionGateway>,
    /// Collaborator-facing event publisher
    publisher: Arc<EventPublisher>,
    /// Application configuration
    config: Arc<AppConfig>,
}

impl GatewayState {
    /// Create a new gateway state
    pub fn new(gateway: Arc<ConnectionGateway>, publisher: Arc<EventPublisher>, config: AppConfig) -> Self {
        Self {
            gateway,
            publisher,
            config: Arc::new(config),
        }
    }

    /// Get the connection gateway
    pub fn gateway(&self) -> &Arc<ConnectionGateway> {
        &self.gateway
    }

    /// Get the event publisher
    pub fn publisher(&self) -> &EventPublisher {
        &self.publisher
    }

    /// Get the application configuration
    pub fn config(&self) -> &AppConfig {
        &self.config
    }
}

impl std::fmt::Debug for GatewayState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatewayState")
            .field("connections", &self.gateway.registry().connection_count())
            .field("config", &"AppConfig")
            .finish()
    }
}
