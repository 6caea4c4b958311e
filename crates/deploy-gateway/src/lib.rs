//! # deploy-gateway
//!
//! WebSocket gateway that relays deployment events to subscribed clients.

pub mod broadcast;
pub mod connection;
pub mod handlers;
pub mod liveness;
pub mod protocol;
pub mod server;
pub mod stats;

#[cfg(test)]
mod test_support;

pub use server::{build_state, create_app, run, serve, GatewayState};
