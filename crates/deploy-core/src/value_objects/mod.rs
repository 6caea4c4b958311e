//! Value objects - immutable types that represent routing concepts

mod topic;

pub use topic::{Topic, TopicKind, TopicParseError};
