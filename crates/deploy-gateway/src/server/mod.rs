//! Gateway server setup
//!
//! Provides the WebSocket endpoint, the collaborator HTTP API, and the
//! process lifecycle around them.

mod api;
mod handler;
mod response;
mod state;

pub use api::{health_check, publish_handler, stats_handler, webhook_handler};
pub use handler::{gateway_handler, ConnectParams};
pub use response::{ApiError, ApiResult, ErrorBody, ErrorDetail};
pub use state::GatewayState;

use crate::broadcast::EventPublisher;
use crate::connection::ConnectionGateway;
use crate::liveness::LivenessMonitor;
use crate::protocol::CloseCode;
use axum::{
    routing::{get, post},
    Router,
};
use deploy_common::{AppConfig, AppError, AppResult, JwtService};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;

/// Create the gateway router
pub fn create_router() -> Router<GatewayState> {
    Router::new()
        .route("/ws", get(gateway_handler))
        .route("/webhooks/deployments", post(webhook_handler))
        .route("/events", post(publish_handler))
        .route("/health", get(health_check))
        .route("/stats", get(stats_handler))
}

/// Build the complete application
pub fn create_app(state: GatewayState) -> Router {
    create_router()
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Wire the gateway, router and publisher together
///
/// Every connection token is a child of `shutdown`.
pub fn build_state(config: AppConfig, shutdown: CancellationToken) -> GatewayState {
    let jwt = JwtService::new(&config.jwt.secret);
    let gateway = Arc::new(ConnectionGateway::new(jwt, config.realtime, shutdown));
    let publisher = Arc::new(EventPublisher::new(
        gateway.router().clone(),
        gateway.stats().clone(),
    ));

    GatewayState::new(gateway, publisher, config)
}

/// Serve on an already bound listener until `shutdown` is cancelled
///
/// # Errors
/// Returns an error if the server fails while running
pub async fn serve(listener: TcpListener, config: AppConfig, shutdown: CancellationToken) -> AppResult<()> {
    let state = build_state(config, shutdown.clone());
    let gateway = state.gateway().clone();

    let liveness = LivenessMonitor::new(gateway.clone()).spawn(shutdown.clone());

    if let Ok(addr) = listener.local_addr() {
        tracing::info!("Gateway listening on ws://{}/ws", addr);
    }

    let result = axum::serve(listener, create_app(state))
        .with_graceful_shutdown(shutdown.clone().cancelled_owned())
        .await;

    // The server can also stop on its own error; make sure the rest follows
    shutdown.cancel();
    let closed = gateway.close_all(CloseCode::ServerShutdown);
    if let Err(e) = liveness.await {
        tracing::warn!(error = %e, "Liveness monitor ended abnormally");
    }
    tracing::info!(closed, "Gateway stopped");

    result.map_err(|e| AppError::internal(anyhow::anyhow!("Server error: {e}")))
}

/// Run the complete gateway server with configuration
///
/// # Errors
/// Returns an error if the address cannot be bound or the server fails
pub async fn run(config: AppConfig) -> AppResult<()> {
    let addr = config.gateway.address();
    tracing::info!("Starting Gateway server on {}", addr);

    let listener = TcpListener::bind(&addr)
        .await
        .map_err(|e| AppError::internal(anyhow::anyhow!("Failed to bind to {addr}: {e}")))?;

    let shutdown = CancellationToken::new();
    tokio::spawn(cancel_on_signal(shutdown.clone()));

    serve(listener, config, shutdown).await
}

/// Cancel `shutdown` on Ctrl+C or SIGTERM
async fn cancel_on_signal(shutdown: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => tracing::info!("Received Ctrl+C, shutting down"),
        () = terminate => tracing::info!("Received SIGTERM, shutting down"),
        () = shutdown.cancelled() => return,
    }

    shutdown.cancel();
}
