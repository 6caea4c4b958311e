//! Collaborator HTTP endpoints

use axum::{extract::rejection::JsonRejection, extract::State, Json};
use serde_json::Value;

use super::response::{Accepted, ApiResult};
use super::GatewayState;
use crate::broadcast::{DirectEvent, PublishReceipt};
use crate::stats::StatsSnapshot;

/// `POST /webhooks/deployments`
pub async fn webhook_handler(
    State(state): State<GatewayState>,
    body: Result<Json<Value>, JsonRejection>,
) -> ApiResult<Accepted<PublishReceipt>> {
    let Json(raw) = body?;
    let receipt = state.publisher().publish_webhook(&raw)?;
    Ok(Accepted(receipt))
}

/// `POST /events`
pub async fn publish_handler(
    State(state): State<GatewayState>,
    body: Result<Json<DirectEvent>, JsonRejection>,
) -> ApiResult<Accepted<PublishReceipt>> {
    let Json(direct) = body?;
    let receipt = state.publisher().publish_direct(direct)?;
    Ok(Accepted(receipt))
}

/// Health check endpoint
pub async fn health_check() -> &'static str {
    "OK"
}

/// `GET /stats`
pub async fn stats_handler(State(state): State<GatewayState>) -> Json<StatsSnapshot> {
    let gateway = state.gateway();
    Json(gateway.stats().snapshot(gateway.registry()))
}
