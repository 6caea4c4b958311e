//! Relay events
//!
//! The fixed set of event types and the immutable event value.

mod event;
mod event_type;

pub use event::Event;
pub use event_type::EventType;
