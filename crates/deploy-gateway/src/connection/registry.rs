//! Session registry
//!
//! Owns every live connection together with the user index and the topic
//! index. All three maps are mutated under one lock so they never disagree;
//! the lock is released before any frame is sent.

use chrono::{DateTime, Utc};
use deploy_core::Topic;
use parking_lot::Mutex;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use super::{Connection, ConnectionId};

/// The registry already holds the maximum number of connections
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("connection limit of {limit} reached")]
pub struct CapacityExceeded {
    pub limit: usize,
}

/// Outcome of a successful registration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Registration {
    /// This is the user's only open connection
    pub first_for_user: bool,
    /// Open connections after the insert
    pub total_connections: usize,
}

/// A connection removed from the registry
#[derive(Debug)]
pub struct Removal {
    pub connection: Arc<Connection>,
    /// The user has no other open connection
    pub last_for_user: bool,
    /// Topics the connection was subscribed to
    pub topics: Vec<Topic>,
}

/// One row of `ListUsers`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSummary {
    pub user_id: String,
    /// Earliest accept time among the user's connections
    pub connected_at: DateTime<Utc>,
    #[serde(rename = "socketCount")]
    pub connection_count: usize,
}

struct Entry {
    connection: Arc<Connection>,
    topics: HashSet<Topic>,
}

#[derive(Default)]
struct RegistryState {
    connections: HashMap<ConnectionId, Entry>,
    users: HashMap<String, HashSet<ConnectionId>>,
    topics: HashMap<Topic, HashSet<ConnectionId>>,
}

impl RegistryState {
    fn resolve<'a>(&self, ids: impl IntoIterator<Item = &'a ConnectionId>) -> Vec<Arc<Connection>> {
        ids.into_iter()
            .filter_map(|id| self.connections.get(id))
            .map(|entry| entry.connection.clone())
            .collect()
    }
}

/// Registry of live connections
#[derive(Default)]
pub struct SessionRegistry {
    state: Mutex<RegistryState>,
}

impl SessionRegistry {
    /// Create a new registry
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new registry wrapped in Arc
    #[must_use]
    pub fn new_shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Register a connection unless the registry is full
    ///
    /// The capacity check and the insert happen under the same lock.
    ///
    /// # Errors
    /// Returns `CapacityExceeded` if `limit` connections are already registered
    pub fn register(
        &self,
        connection: Arc<Connection>,
        limit: usize,
    ) -> Result<Registration, CapacityExceeded> {
        let mut guard = self.state.lock();
        let state = &mut *guard;
        if state.connections.len() >= limit {
            return Err(CapacityExceeded { limit });
        }

        let id = connection.id();
        let sessions = state
            .users
            .entry(connection.user_id().to_string())
            .or_default();
        sessions.insert(id);
        let first_for_user = sessions.len() == 1;

        state.connections.insert(
            id,
            Entry {
                connection,
                topics: HashSet::new(),
            },
        );

        tracing::debug!(connection_id = %id, first_for_user, "Connection registered");

        Ok(Registration {
            first_for_user,
            total_connections: state.connections.len(),
        })
    }

    /// Remove a connection from the registry, every topic, and its user
    ///
    /// Returns `None` if the connection was already removed.
    pub fn remove(&self, id: ConnectionId) -> Option<Removal> {
        let mut guard = self.state.lock();
        let state = &mut *guard;
        let entry = state.connections.remove(&id)?;

        for topic in &entry.topics {
            if let Some(subscribers) = state.topics.get_mut(topic) {
                subscribers.remove(&id);
                if subscribers.is_empty() {
                    state.topics.remove(topic);
                }
            }
        }

        let user_id = entry.connection.user_id();
        let last_for_user = match state.users.get_mut(user_id) {
            Some(sessions) => {
                sessions.remove(&id);
                sessions.is_empty()
            }
            None => false,
        };
        if last_for_user {
            state.users.remove(user_id);
        }

        tracing::debug!(connection_id = %id, last_for_user, "Connection removed");

        Some(Removal {
            connection: entry.connection,
            last_for_user,
            topics: entry.topics.into_iter().collect(),
        })
    }

    /// Subscribe a connection to a topic
    ///
    /// Idempotent. Returns `false` if the connection is not registered.
    pub fn subscribe(&self, id: ConnectionId, topic: &Topic) -> bool {
        let mut guard = self.state.lock();
        let state = &mut *guard;
        let Some(entry) = state.connections.get_mut(&id) else {
            return false;
        };

        if entry.topics.insert(topic.clone()) {
            state.topics.entry(topic.clone()).or_default().insert(id);
            tracing::trace!(connection_id = %id, topic = %topic, "Subscribed");
        }
        true
    }

    /// Unsubscribe a connection from a topic
    ///
    /// Idempotent. Returns `false` if the connection is not registered.
    pub fn unsubscribe(&self, id: ConnectionId, topic: &Topic) -> bool {
        let mut guard = self.state.lock();
        let state = &mut *guard;
        let Some(entry) = state.connections.get_mut(&id) else {
            return false;
        };

        if entry.topics.remove(topic) {
            if let Some(subscribers) = state.topics.get_mut(topic) {
                subscribers.remove(&id);
                if subscribers.is_empty() {
                    state.topics.remove(topic);
                }
            }
            tracing::trace!(connection_id = %id, topic = %topic, "Unsubscribed");
        }
        true
    }

    /// Get a connection by ID
    pub fn get(&self, id: ConnectionId) -> Option<Arc<Connection>> {
        self.state
            .lock()
            .connections
            .get(&id)
            .map(|entry| entry.connection.clone())
    }

    /// Check if a connection is registered
    pub fn contains(&self, id: ConnectionId) -> bool {
        self.state.lock().connections.contains_key(&id)
    }

    /// Topics a connection is subscribed to, sorted
    pub fn topics_of(&self, id: ConnectionId) -> Vec<Topic> {
        let state = self.state.lock();
        let mut topics: Vec<Topic> = state
            .connections
            .get(&id)
            .map(|entry| entry.topics.iter().cloned().collect())
            .unwrap_or_default();
        topics.sort();
        topics
    }

    /// Connections subscribed to a topic
    pub fn subscribers_of(&self, topic: &Topic) -> Vec<Arc<Connection>> {
        let state = self.state.lock();
        state
            .topics
            .get(topic)
            .map(|ids| state.resolve(ids))
            .unwrap_or_default()
    }

    /// Connections subscribed to any of the topics, each listed once
    pub fn subscribers_of_any(&self, topics: &[Topic]) -> Vec<Arc<Connection>> {
        let state = self.state.lock();
        let ids: HashSet<&ConnectionId> = topics
            .iter()
            .filter_map(|topic| state.topics.get(topic))
            .flatten()
            .collect();
        state.resolve(ids)
    }

    /// Every registered connection
    pub fn all(&self) -> Vec<Arc<Connection>> {
        self.state
            .lock()
            .connections
            .values()
            .map(|entry| entry.connection.clone())
            .collect()
    }

    /// Connections of one user
    pub fn user_connections(&self, user_id: &str) -> Vec<Arc<Connection>> {
        let state = self.state.lock();
        state
            .users
            .get(user_id)
            .map(|ids| state.resolve(ids))
            .unwrap_or_default()
    }

    /// One summary per connected user, sorted by user ID
    pub fn list_users(&self) -> Vec<UserSummary> {
        let state = self.state.lock();
        let mut users: BTreeMap<&str, UserSummary> = BTreeMap::new();

        for (user_id, ids) in &state.users {
            let earliest = ids
                .iter()
                .filter_map(|id| state.connections.get(id))
                .map(|entry| entry.connection.connected_at())
                .min();
            if let Some(connected_at) = earliest {
                users.insert(
                    user_id,
                    UserSummary {
                        user_id: user_id.clone(),
                        connected_at,
                        connection_count: ids.len(),
                    },
                );
            }
        }

        users.into_values().collect()
    }

    /// Connections idle for longer than `max_idle`
    pub fn stale(&self, max_idle: Duration) -> Vec<Arc<Connection>> {
        self.state
            .lock()
            .connections
            .values()
            .filter(|entry| entry.connection.idle_for() > max_idle)
            .map(|entry| entry.connection.clone())
            .collect()
    }

    /// Connections whose transport has already closed
    pub fn closed(&self) -> Vec<Arc<Connection>> {
        self.state
            .lock()
            .connections
            .values()
            .filter(|entry| entry.connection.is_closed())
            .map(|entry| entry.connection.clone())
            .collect()
    }

    /// Get the total number of active connections
    pub fn connection_count(&self) -> usize {
        self.state.lock().connections.len()
    }

    /// Get the number of unique connected users
    pub fn user_count(&self) -> usize {
        self.state.lock().users.len()
    }

    /// Get the number of topics with at least one subscriber
    pub fn topic_count(&self) -> usize {
        self.state.lock().topics.len()
    }
}

impl std::fmt::Debug for SessionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock();
        f.debug_struct("SessionRegistry")
            .field("connections", &state.connections.len())
            .field("users", &state.users.len())
            .field("topics", &state.topics.len())
            .finish()
    }
}
