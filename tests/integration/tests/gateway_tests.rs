//! Gateway Integration Tests
//!
//! Each test starts a real gateway on an ephemeral port and talks to it over
//! WebSocket and HTTP.
//!
//! Run with: cargo test -p integration-tests --test gateway_tests

use std::time::{Duration, Instant};

use integration_tests::{
    assert_json, expired_token_for, legacy_status, step_started, token_for, unique_user, Received,
    TestClient, TestServer,
};
use reqwest::StatusCode;
use serde_json::{json, Value};

// ============================================================================
// Health and Stats
// ============================================================================

#[tokio::test]
async fn test_health_check() {
    let server = TestServer::start().await.unwrap();
    let response = server.get("/health").await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.text().await.unwrap(), "OK");
}

#[tokio::test]
async fn test_stats_reflect_connections() {
    let server = TestServer::start().await.unwrap();
    let _client = server.connect_ready(&token_for(&unique_user())).await.unwrap();

    let stats: Value = assert_json(server.get("/stats").await.unwrap(), StatusCode::OK)
        .await
        .unwrap();
    assert_eq!(stats["connections"], 1);
    assert_eq!(stats["users"], 1);
    assert_eq!(stats["accepted"], 1);
}

// ============================================================================
// Authentication
// ============================================================================

#[tokio::test]
async fn test_invalid_token_closes_with_4004() {
    let server = TestServer::start().await.unwrap();

    let mut client = server.connect("not-a-jwt").await.unwrap();
    assert_eq!(client.expect_close().await.unwrap(), Some(4004));

    let mut client = TestClient::connect(&server.ws_url(None)).await.unwrap();
    assert_eq!(client.expect_close().await.unwrap(), Some(4004));

    let mut client = server.connect(&expired_token_for("u1")).await.unwrap();
    assert_eq!(client.expect_close().await.unwrap(), Some(4004));
}

#[tokio::test]
async fn test_connection_established() {
    let server = TestServer::start().await.unwrap();
    let user = unique_user();

    let mut client = server.connect(&token_for(&user)).await.unwrap();
    let established = client.expect_type("connection_established").await.unwrap();

    assert_eq!(established["payload"]["userId"], user.as_str());
    assert_eq!(established["payload"]["heartbeatInterval"], 25_000);
    assert!(established["payload"]["connectionId"].is_string());
}

#[tokio::test]
async fn test_bearer_header_accepted() {
    let server = TestServer::start().await.unwrap();
    let user = unique_user();

    let mut client = TestClient::connect_with_header(&server.ws_url(None), &token_for(&user))
        .await
        .unwrap();
    let established = client.expect_type("connection_established").await.unwrap();
    assert_eq!(established["payload"]["userId"], user.as_str());
}

#[tokio::test]
async fn test_capacity_exceeded_closes_with_4013() {
    let server = TestServer::start_with(&[("MAX_CONNECTIONS", "1")]).await.unwrap();
    let _first = server.connect_ready(&token_for("u1")).await.unwrap();

    let mut second = server.connect(&token_for("u2")).await.unwrap();
    assert_eq!(second.expect_close().await.unwrap(), Some(4013));
}

// ============================================================================
// Subscriptions and Delivery
// ============================================================================

#[tokio::test]
async fn test_webhook_reaches_deployment_subscriber() {
    let server = TestServer::start().await.unwrap();
    let mut client = server.connect_ready(&token_for(&unique_user())).await.unwrap();

    client
        .send_json(&json!({"type": "subscribe:deployment", "payload": {"deploymentId": "d1"}}))
        .await
        .unwrap();
    let ack = client.expect_type("subscribed").await.unwrap();
    assert_eq!(ack["payload"], json!({"type": "deployment", "id": "d1"}));

    let response = server
        .post("/webhooks/deployments", &step_started("d1", "p1"))
        .await
        .unwrap();
    let receipt: Value = assert_json(response, StatusCode::ACCEPTED).await.unwrap();
    assert_eq!(receipt["eventType"], "step_updated");
    assert_eq!(receipt["topics"], json!(["deployment:d1", "project:p1"]));
    assert_eq!(receipt["delivered"], 1);

    let event = client.expect_type("step_updated").await.unwrap();
    assert_eq!(event["deploymentId"], "d1");
    assert_eq!(event["projectId"], "p1");
    assert_eq!(event["payload"]["step_name"], "build");
    assert_eq!(event["payload"]["stepStatus"], "running");
}

#[tokio::test]
async fn test_legacy_webhook_reaches_project_subscriber() {
    let server = TestServer::start().await.unwrap();
    let mut subscriber = server.connect_ready(&token_for(&unique_user())).await.unwrap();
    let mut bystander = server.connect_ready(&token_for(&unique_user())).await.unwrap();

    subscriber
        .send_json(&json!({"type": "subscribe:project", "payload": {"projectId": "p1"}}))
        .await
        .unwrap();
    subscriber.expect_type("subscribed").await.unwrap();

    let response = server
        .post("/webhooks/deployments", &legacy_status("p1", "failed"))
        .await
        .unwrap();
    let receipt: Value = assert_json(response, StatusCode::ACCEPTED).await.unwrap();
    assert_eq!(receipt["delivered"], 1);

    let event = subscriber.expect_type("deployment_failed").await.unwrap();
    assert_eq!(event["projectId"], "p1");

    // The bystander only ever hears presence and heartbeats
    bystander.send_json(&json!({"type": "heartbeat"})).await.unwrap();
    loop {
        match bystander.recv().await.unwrap() {
            Received::Json(frame) if frame["type"] == "heartbeat:ack" => break,
            Received::Json(frame) => assert_ne!(frame["type"], "deployment_failed"),
            Received::Closed(code) => panic!("unexpected close {code:?}"),
        }
    }
}

#[tokio::test]
async fn test_unsubscribe_stops_delivery() {
    let server = TestServer::start().await.unwrap();
    let mut client = server.connect_ready(&token_for(&unique_user())).await.unwrap();

    client
        .send_json(&json!({"type": "subscribe:project", "payload": {"projectId": "p9"}}))
        .await
        .unwrap();
    client.expect_type("subscribed").await.unwrap();
    client
        .send_json(&json!({"type": "unsubscribe:project", "payload": {"projectId": "p9"}}))
        .await
        .unwrap();
    client.expect_type("unsubscribed").await.unwrap();

    let response = server
        .post("/webhooks/deployments", &legacy_status("p9", "success"))
        .await
        .unwrap();
    let receipt: Value = assert_json(response, StatusCode::ACCEPTED).await.unwrap();
    assert_eq!(receipt["delivered"], 0);
}

#[tokio::test]
async fn test_invalid_webhook_rejected() {
    let server = TestServer::start().await.unwrap();

    let response = server.post("/webhooks/deployments", &json!({})).await.unwrap();
    let body: Value = assert_json(response, StatusCode::BAD_REQUEST).await.unwrap();
    assert_eq!(body["error"]["code"], "INVALID_PAYLOAD");

    let response = server
        .post("/webhooks/deployments", &json!({"type": "step_started", "project": "p1"}))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_direct_global_event_reaches_everyone() {
    let server = TestServer::start().await.unwrap();
    let mut client = server.connect_ready(&token_for(&unique_user())).await.unwrap();

    let response = server
        .post(
            "/events",
            &json!({"type": "system_alert", "payload": {"message": "maintenance"}}),
        )
        .await
        .unwrap();
    let receipt: Value = assert_json(response, StatusCode::ACCEPTED).await.unwrap();
    assert_eq!(receipt["delivered"], 1);

    let alert = client.expect_type("system_alert").await.unwrap();
    assert_eq!(alert["payload"]["message"], "maintenance");
}

// ============================================================================
// Commands
// ============================================================================

#[tokio::test]
async fn test_heartbeat_ack() {
    let server = TestServer::start().await.unwrap();
    let mut client = server.connect_ready(&token_for(&unique_user())).await.unwrap();

    client.send_json(&json!({"type": "heartbeat"})).await.unwrap();
    let ack = client.expect_type("heartbeat:ack").await.unwrap();
    assert!(ack["payload"]["timestamp"].is_i64());
}

#[tokio::test]
async fn test_request_users() {
    let server = TestServer::start().await.unwrap();
    let mut client = server.connect_ready(&token_for("alice")).await.unwrap();
    let _bob = server.connect_ready(&token_for("bob")).await.unwrap();
    let _bob_again = server.connect_ready(&token_for("bob")).await.unwrap();

    client.send_json(&json!({"type": "request:users"})).await.unwrap();
    let list = client.expect_type("users:list").await.unwrap();

    assert_eq!(list["payload"]["total"], 2);
    let users = list["payload"]["users"].as_array().unwrap();
    let bob = users.iter().find(|u| u["userId"] == "bob").unwrap();
    assert_eq!(bob["socketCount"], 2);
    assert!(bob["connectedAt"].is_string());
}

#[tokio::test]
async fn test_unknown_command_keeps_connection_open() {
    let server = TestServer::start().await.unwrap();
    let mut client = server.connect_ready(&token_for(&unique_user())).await.unwrap();

    client.send_json(&json!({"type": "dance"})).await.unwrap();
    let error = client.expect_type("error").await.unwrap();
    assert!(error["payload"]["message"].as_str().unwrap().contains("dance"));

    client.send_json(&json!({"type": "heartbeat"})).await.unwrap();
    client.expect_type("heartbeat:ack").await.unwrap();
}

#[tokio::test]
async fn test_malformed_json_closes_with_4002() {
    let server = TestServer::start().await.unwrap();
    let mut client = server.connect_ready(&token_for(&unique_user())).await.unwrap();

    client.send_text("{not json").await.unwrap();
    assert_eq!(client.expect_close().await.unwrap(), Some(4002));
}

#[tokio::test]
async fn test_binary_frame_closes_with_4002() {
    let server = TestServer::start().await.unwrap();
    let mut client = server.connect_ready(&token_for(&unique_user())).await.unwrap();

    client.send_binary(vec![1, 2, 3]).await.unwrap();
    assert_eq!(client.expect_close().await.unwrap(), Some(4002));
}

// ============================================================================
// Presence and Lifecycle
// ============================================================================

#[tokio::test]
async fn test_presence_events() {
    let server = TestServer::start().await.unwrap();
    let mut watcher = server.connect_ready(&token_for("watcher")).await.unwrap();

    // The watcher first hears about itself
    let own = watcher.expect_type("user_connected").await.unwrap();
    assert_eq!(own["payload"]["userId"], "watcher");

    let other = server.connect_ready(&token_for("carol")).await.unwrap();
    let connected = watcher.expect_type("user_connected").await.unwrap();
    assert_eq!(connected["payload"]["userId"], "carol");
    assert_eq!(connected["payload"]["connectionCount"], 2);

    other.close().await.unwrap();
    let disconnected = watcher.expect_type("user_disconnected").await.unwrap();
    assert_eq!(disconnected["payload"]["userId"], "carol");
}

#[tokio::test]
async fn test_silent_client_evicted_with_4009() {
    let server = TestServer::start_with(&[("HEARTBEAT_INTERVAL_MS", "200")])
        .await
        .unwrap();
    let mut client = server.connect_ready(&token_for(&unique_user())).await.unwrap();
    let started = Instant::now();

    client.expect_type("heartbeat").await.unwrap();
    assert_eq!(client.expect_close().await.unwrap(), Some(4009));
    assert!(started.elapsed() >= Duration::from_millis(300));
}

#[tokio::test]
async fn test_shutdown_closes_with_4012() {
    let server = TestServer::start().await.unwrap();
    let mut client = server.connect_ready(&token_for(&unique_user())).await.unwrap();

    let closing = tokio::spawn(async move { client.expect_close().await });
    server.shutdown().await.unwrap();

    assert_eq!(closing.await.unwrap().unwrap(), Some(4012));
}
