//! Presence publisher. Tells every connection who is online.

use std::collections::BTreeSet;
use std::sync::Arc;

use tracing::debug;

use relay_core::types::Identity;

use crate::connection::pool::{ConnectionPool, DeliveryReport};
use crate::message::types::OutboundMessage;
use crate::metrics::RealtimeMetrics;

/// Broadcasts presence snapshots to all connections.
#[derive(Debug)]
pub struct PresencePublisher {
    /// Connection pool.
    pool: Arc<ConnectionPool>,
    /// Metrics.
    metrics: Arc<RealtimeMetrics>,
}

impl PresencePublisher {
    /// Creates a new publisher.
    pub fn new(pool: Arc<ConnectionPool>, metrics: Arc<RealtimeMetrics>) -> Self {
        Self { pool, metrics }
    }

    /// Sends an `online` frame carrying `snapshot` to every connected
    /// connection. Per-connection failures are logged by the pool and do
    /// not stop the broadcast.
    pub fn publish(&self, snapshot: BTreeSet<Identity>) -> DeliveryReport {
        let online = snapshot.len();
        let message = OutboundMessage::Online(snapshot.into_iter().collect());
        let report = self.pool.broadcast_all(&message);

        self.metrics.presence_broadcast();
        self.metrics.delivery_failures(report.failed as u64);

        debug!(
            online,
            delivered = report.delivered,
            failed = report.failed,
            "Presence broadcast"
        );
        report
    }
}
