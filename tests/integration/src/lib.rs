//! Integration test utilities for the deployment event gateway
//!
//! This crate provides helpers for running end-to-end tests against
//! the collaborator HTTP API and the WebSocket endpoint.

pub mod fixtures;
pub mod helpers;

pub use fixtures::*;
pub use helpers::*;
