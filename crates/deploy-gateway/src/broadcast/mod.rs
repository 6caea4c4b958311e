//! Event broadcasting
//!
//! Topic-based fan-out and the collaborator-facing publisher.

mod publisher;
mod router;

pub use publisher::{DirectEvent, EventPublisher, PublishError, PublishReceipt};
pub use router::TopicRouter;
