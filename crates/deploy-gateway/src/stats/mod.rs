//! Gateway counters
//!
//! Monotonic counters exposed on `GET /stats` for the metrics collaborator.

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::connection::SessionRegistry;

/// Process-wide gateway counters
#[derive(Debug, Default)]
pub struct GatewayStats {
    accepted: AtomicU64,
    rejected_auth: AtomicU64,
    rejected_capacity: AtomicU64,
    delivery_failures: AtomicU64,
    evictions: AtomicU64,
    events_published: AtomicU64,
    webhooks_rejected: AtomicU64,
}

/// Point-in-time view of the counters plus registry gauges
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsSnapshot {
    pub connections: usize,
    pub users: usize,
    pub topics: usize,
    pub accepted: u64,
    pub rejected_auth: u64,
    pub rejected_capacity: u64,
    pub delivery_failures: u64,
    pub evictions: u64,
    pub events_published: u64,
    pub webhooks_rejected: u64,
}

impl GatewayStats {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_accepted(&self) {
        self.accepted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_rejected_auth(&self) {
        self.rejected_auth.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_rejected_capacity(&self) {
        self.rejected_capacity.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_delivery_failure(&self) {
        self.delivery_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_eviction(&self) {
        self.evictions.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_event_published(&self) {
        self.events_published.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_webhook_rejected(&self) {
        self.webhooks_rejected.fetch_add(1, Ordering::Relaxed);
    }

    pub fn delivery_failures(&self) -> u64 {
        self.delivery_failures.load(Ordering::Relaxed)
    }

    pub fn evictions(&self) -> u64 {
        self.evictions.load(Ordering::Relaxed)
    }

    /// Take a snapshot, reading gauges from the registry
    pub fn snapshot(&self, registry: &SessionRegistry) -> StatsSnapshot {
        StatsSnapshot {
            connections: registry.connection_count(),
            users: registry.user_count(),
            topics: registry.topic_count(),
            accepted: self.accepted.load(Ordering::Relaxed),
            rejected_auth: self.rejected_auth.load(Ordering::Relaxed),
            rejected_capacity: self.rejected_capacity.load(Ordering::Relaxed),
            delivery_failures: self.delivery_failures(),
            evictions: self.evictions(),
            events_published: self.events_published.load(Ordering::Relaxed),
            webhooks_rejected: self.webhooks_rejected.load(Ordering::Relaxed),
        }
    }
}
