//! Liveness monitor
//!
//! A single periodic task that pings every connection, evicts the ones that
//! have been silent for more than two intervals, and reaps connections whose
//! transport is already gone.

use deploy_core::{Event, EventType};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::connection::ConnectionGateway;
use crate::protocol::CloseCode;

/// Outcome of one sweep
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    /// Connections that received the heartbeat
    pub pinged: usize,
    /// Connections closed for inactivity
    pub evicted: usize,
    /// Already-closed connections cleaned up
    pub reaped: usize,
}

/// Periodic heartbeat and eviction task
#[derive(Debug)]
pub struct LivenessMonitor {
    gateway: Arc<ConnectionGateway>,
    interval: Duration,
}

impl LivenessMonitor {
    pub fn new(gateway: Arc<ConnectionGateway>) -> Self {
        let interval = gateway.config().heartbeat_interval();
        Self { gateway, interval }
    }

    /// Run the monitor until `shutdown` is cancelled
    pub fn spawn(self, shutdown: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + self.interval, self.interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            tracing::info!(
                interval_ms = u64::try_from(self.interval.as_millis()).unwrap_or(u64::MAX),
                "Liveness monitor started"
            );

            loop {
                tokio::select! {
                    () = shutdown.cancelled() => break,
                    _ = ticker.tick() => {
                        self.sweep();
                    }
                }
            }

            tracing::info!("Liveness monitor stopped");
        })
    }

    /// Run one heartbeat and eviction pass
    pub fn sweep(&self) -> SweepReport {
        let heartbeat = Event::new(
            EventType::Heartbeat,
            json!({ "timestamp": chrono::Utc::now().timestamp_millis() }),
        );
        let pinged = self.gateway.router().broadcast_all(&heartbeat);

        let registry = self.gateway.registry();
        let mut evicted = 0;
        for connection in registry.stale(self.interval * 2) {
            tracing::info!(
                connection_id = %connection.id(),
                user_id = %connection.user_id(),
                idle_ms = u64::try_from(connection.idle_for().as_millis()).unwrap_or(u64::MAX),
                "Evicting idle connection"
            );
            connection.close(CloseCode::SessionTimeout);
            self.gateway.stats().record_eviction();
            if self.gateway.disconnect(connection.id()) {
                evicted += 1;
            }
        }

        let mut reaped = 0;
        for connection in registry.closed() {
            if self.gateway.disconnect(connection.id()) {
                reaped += 1;
            }
        }

        let report = SweepReport {
            pinged,
            evicted,
            reaped,
        };
        tracing::trace!(?report, "Liveness sweep");
        report
    }
}
