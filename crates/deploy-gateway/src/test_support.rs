//! Shared helpers for unit tests

use deploy_common::{
    AppConfig, AppSettings, Environment, JwtConfig, JwtService, RealtimeConfig, ServerConfig,
};
use jsonwebtoken::{encode, EncodingKey, Header};
use serde_json::{json, Value};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::connection::{ConnectionGateway, Frame};
use crate::server::{build_state, GatewayState};

pub const SECRET: &str = "gateway-test-secret";

/// Sign a short-lived token for a user
pub fn token_for(user_id: &str) -> String {
    let exp = chrono::Utc::now().timestamp() + 900;
    encode(
        &Header::default(),
        &json!({"sub": user_id, "exp": exp}),
        &EncodingKey::from_secret(SECRET.as_bytes()),
    )
    .unwrap()
}

pub fn gateway_with(config: RealtimeConfig) -> ConnectionGateway {
    ConnectionGateway::new(JwtService::new(SECRET), config, CancellationToken::new())
}

/// Pop every queued frame without waiting
pub fn drain(rx: &mut mpsc::Receiver<Frame>) -> Vec<Value> {
    let mut frames = Vec::new();
    while let Ok(frame) = rx.try_recv() {
        frames.push(serde_json::from_str(&frame).unwrap());
    }
    frames
}

/// Full gateway state around a fresh gateway
pub fn state_with(config: RealtimeConfig) -> GatewayState {
    let app_config = AppConfig {
        app: AppSettings {
            name: "deploy-relay".to_string(),
            env: Environment::Development,
        },
        gateway: ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
        },
        jwt: JwtConfig {
            secret: SECRET.to_string(),
        },
        realtime: config,
    };
    build_state(app_config, CancellationToken::new())
}
