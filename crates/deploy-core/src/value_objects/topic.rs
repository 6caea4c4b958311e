//! Routing topics
//!
//! A topic is the key of a broadcast channel: `project:<id>` or `deployment:<id>`.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Kind of entity a topic routes for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TopicKind {
    Project,
    Deployment,
}

impl TopicKind {
    /// Prefix used in the canonical topic string
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Project => "project",
            Self::Deployment => "deployment",
        }
    }
}

impl fmt::Display for TopicKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A broadcast routing key
///
/// Purely a label: nothing is persisted for a topic, it only exists while a
/// connection is subscribed to it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Topic {
    Project(String),
    Deployment(String),
}

impl Topic {
    /// Topic for all events of a project
    pub fn project(id: impl Into<String>) -> Self {
        Self::Project(id.into())
    }

    /// Topic for all events of a single deployment
    pub fn deployment(id: impl Into<String>) -> Self {
        Self::Deployment(id.into())
    }

    #[must_use]
    pub fn kind(&self) -> TopicKind {
        match self {
            Self::Project(_) => TopicKind::Project,
            Self::Deployment(_) => TopicKind::Deployment,
        }
    }

    /// The entity identifier part of the topic
    #[must_use]
    pub fn id(&self) -> &str {
        match self {
            Self::Project(id) | Self::Deployment(id) => id,
        }
    }

    /// Parse a topic from its canonical `<kind>:<id>` form
    ///
    /// # Errors
    /// Returns an error if the prefix is unknown or the id is empty
    pub fn parse(s: &str) -> Result<Self, TopicParseError> {
        let (kind, id) = s.split_once(':').ok_or(TopicParseError::MissingSeparator)?;
        if id.is_empty() {
            return Err(TopicParseError::EmptyId);
        }

        match kind {
            "project" => Ok(Self::Project(id.to_string())),
            "deployment" => Ok(Self::Deployment(id.to_string())),
            other => Err(TopicParseError::UnknownKind(other.to_string())),
        }
    }
}

/// Error when parsing a topic from string
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TopicParseError {
    #[error("topic must have the form <kind>:<id>")]
    MissingSeparator,

    #[error("topic id is empty")]
    EmptyId,

    #[error("unknown topic kind: {0}")]
    UnknownKind(String),
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind(), self.id())
    }
}

impl FromStr for Topic {
    type Err = TopicParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Topic::parse(s)
    }
}

// Serialized in canonical string form
impl Serialize for Topic {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Topic {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        Topic::parse(&raw).map_err(serde::de::Error::custom)
    }
}
