//! Connection management
//!
//! Tracks accepted WebSocket connections, their users, and their topics.

mod connection;
mod gateway;
mod registry;

pub use connection::{Connection, ConnectionId, DeliveryError, Frame};
pub use gateway::{AcceptError, Accepted, ConnectionGateway};
pub use registry::{CapacityExceeded, Registration, Removal, SessionRegistry, UserSummary};
