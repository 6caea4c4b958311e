//! Deployment Event Gateway entry point
//!
//! Run with:
//! ```bash
//! cargo run -p deploy-gateway
//! ```
//!
//! Configuration is loaded from environment variables.

use deploy_common::{try_init_tracing_with_config, AppConfig, TracingConfig};
use tracing::{error, info};

#[tokio::main]
async fn main() {
    // Configuration picks the log format, so load it before tracing is up
    let config = match AppConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load configuration: {e}");
            std::process::exit(1);
        }
    };

    if let Err(e) = try_init_tracing_with_config(&TracingConfig::for_environment(config.app.env)) {
        eprintln!("Warning: Failed to initialize tracing: {e}");
    }

    info!(
        name = %config.app.name,
        env = ?config.app.env,
        port = config.gateway.port,
        heartbeat_interval_ms = config.realtime.heartbeat_interval_ms,
        "Configuration loaded"
    );

    if let Err(e) = deploy_gateway::run(config).await {
        error!(error = %e, "Gateway failed");
        std::process::exit(1);
    }
}
