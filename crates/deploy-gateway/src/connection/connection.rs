//! Individual WebSocket connection
//!
//! Represents a single accepted WebSocket connection. Topic membership lives
//! in the [`SessionRegistry`](super::SessionRegistry), not here.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tokio_util::sync::{CancellationToken, WaitForCancellationFuture};
use uuid::Uuid;

use crate::protocol::CloseCode;

/// A pre-serialized outbound frame, shared across all recipients of a broadcast
pub type Frame = Arc<str>;

/// Unique connection identifier, assigned at accept
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConnectionId(Uuid);

impl ConnectionId {
    /// Generate a new random (v4) identifier
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Why a frame could not be queued
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum DeliveryError {
    #[error("outbound queue is full")]
    QueueFull,

    #[error("outbound queue is closed")]
    QueueClosed,
}

/// A single WebSocket connection
pub struct Connection {
    /// Unique connection ID
    id: ConnectionId,

    /// Verified user ID from the token
    user_id: String,

    /// Wall-clock accept time, reported to clients
    connected_at: DateTime<Utc>,

    /// Monotonic accept time
    created_at: Instant,

    /// Last inbound activity
    last_activity: Mutex<Instant>,

    /// Channel to the writer task
    sender: mpsc::Sender<Frame>,

    /// Cancelled when the connection must close
    cancel: CancellationToken,

    /// Close code recorded by whoever closed the connection first
    close_code: Mutex<Option<CloseCode>>,
}

impl Connection {
    /// Create a new connection
    pub fn new(
        user_id: impl Into<String>,
        sender: mpsc::Sender<Frame>,
        cancel: CancellationToken,
    ) -> Arc<Self> {
        let now = Instant::now();
        Arc::new(Self {
            id: ConnectionId::new(),
            user_id: user_id.into(),
            connected_at: Utc::now(),
            created_at: now,
            last_activity: Mutex::new(now),
            sender,
            cancel,
            close_code: Mutex::new(None),
        })
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn connected_at(&self) -> DateTime<Utc> {
        self.connected_at
    }

    /// Get connection age
    pub fn age(&self) -> Duration {
        self.created_at.elapsed()
    }

    /// Record inbound activity
    pub fn touch(&self) {
        *self.last_activity.lock() = Instant::now();
    }

    /// Time since the last inbound activity
    pub fn idle_for(&self) -> Duration {
        Instant::now().saturating_duration_since(*self.last_activity.lock())
    }

    /// Queue a frame without waiting
    ///
    /// # Errors
    /// Returns an error if the queue is full or the writer is gone
    pub fn try_deliver(&self, frame: Frame) -> Result<(), DeliveryError> {
        self.sender.try_send(frame).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => DeliveryError::QueueFull,
            mpsc::error::TrySendError::Closed(_) => DeliveryError::QueueClosed,
        })
    }

    /// Close the connection with a code
    ///
    /// The first recorded code wins. Returns `true` if this call recorded it.
    pub fn close(&self, code: CloseCode) -> bool {
        let recorded = {
            let mut close_code = self.close_code.lock();
            if close_code.is_some() {
                false
            } else {
                *close_code = Some(code);
                true
            }
        };
        self.cancel.cancel();
        recorded
    }

    /// Stop the connection tasks without recording a close code
    pub fn release(&self) {
        self.cancel.cancel();
    }

    /// Close code recorded by [`close`](Self::close), if any
    pub fn close_code(&self) -> Option<CloseCode> {
        *self.close_code.lock()
    }

    /// Completes once the connection has been closed
    pub fn cancelled(&self) -> WaitForCancellationFuture<'_> {
        self.cancel.cancelled()
    }

    /// Whether the transport is closed or closing
    pub fn is_closed(&self) -> bool {
        self.cancel.is_cancelled() || self.sender.is_closed()
    }
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("id", &self.id)
            .field("user_id", &self.user_id)
            .field("connected_at", &self.connected_at)
            .field("close_code", &self.close_code())
            .finish_non_exhaustive()
    }
}
