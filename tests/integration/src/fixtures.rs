//! Test fixtures and data generators
//!
//! Provides tokens and webhook payloads for integration tests.

use jsonwebtoken::{encode, EncodingKey, Header};
use serde::Serialize;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicU64, Ordering};

/// Secret every test server signs with
pub const TEST_SECRET: &str = "integration-test-secret";

/// Counter for unique test data
static COUNTER: AtomicU64 = AtomicU64::new(1);

/// Get a unique suffix for test data
pub fn unique_suffix() -> u64 {
    COUNTER.fetch_add(1, Ordering::SeqCst)
}

#[derive(Debug, Serialize)]
struct TestClaims<'a> {
    sub: &'a str,
    exp: i64,
}

/// Sign a valid token for a user
pub fn token_for(user_id: &str) -> String {
    sign(user_id, chrono::Utc::now().timestamp() + 900)
}

/// Sign a token that expired an hour ago
pub fn expired_token_for(user_id: &str) -> String {
    sign(user_id, chrono::Utc::now().timestamp() - 3600)
}

fn sign(user_id: &str, exp: i64) -> String {
    encode(
        &Header::default(),
        &TestClaims { sub: user_id, exp },
        &EncodingKey::from_secret(TEST_SECRET.as_bytes()),
    )
    .expect("Failed to sign token")
}

/// A unique user id
pub fn unique_user() -> String {
    format!("user-{}", unique_suffix())
}

/// A step webhook for a deployment
pub fn step_started(deployment_id: &str, project: &str) -> Value {
    json!({
        "type": "step_started",
        "deployment_id": deployment_id,
        "project": project,
        "step_name": "build",
    })
}

/// A legacy status webhook for a project
pub fn legacy_status(project: &str, status: &str) -> Value {
    json!({
        "project": project,
        "status": status,
        "duration": 42,
    })
}
