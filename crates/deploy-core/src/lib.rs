//! # deploy-core
//!
//! Domain layer containing the deployment event model, routing topics, and the
//! webhook normalizer. This crate performs no I/O.

pub mod error;
pub mod events;
pub mod normalizer;
pub mod value_objects;

// Re-export commonly used types at crate root
pub use error::NormalizationError;
pub use events::{Event, EventType};
pub use normalizer::{normalize, NormalizedEvent};
pub use value_objects::{Topic, TopicKind, TopicParseError};
