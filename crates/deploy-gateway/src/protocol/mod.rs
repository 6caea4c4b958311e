//! Gateway protocol definitions
//!
//! Defines the WebSocket protocol: client commands, server replies, and close codes.

mod close_codes;
mod commands;
mod messages;

pub use close_codes::CloseCode;
pub use commands::{ClientCommand, ClientEnvelope, CommandError};
pub use messages::ServerMessage;
