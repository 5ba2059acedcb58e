//! Message router: fans a command out to every connection of its recipient.
//!
//! Delivery is best-effort: an offline recipient is a silent no-op, there is
//! no queuing or retry, and nothing is reported back to the sender. The
//! router does not decide who may message whom.

use std::sync::Arc;

use tracing::debug;

use crate::connection::handle::ConnectionHandle;
use crate::connection::pool::{ConnectionPool, DeliveryReport};
use crate::connection::registry::IdentityRegistry;
use crate::message::types::RoutingCommand;
use crate::metrics::RealtimeMetrics;

/// Routes commands from one connection to another identity's connections.
#[derive(Debug)]
pub struct MessageRouter {
    /// Identity registry.
    registry: Arc<IdentityRegistry>,
    /// Connection pool.
    pool: Arc<ConnectionPool>,
    /// Metrics.
    metrics: Arc<RealtimeMetrics>,
}

impl MessageRouter {
    /// Creates a new router.
    pub fn new(
        registry: Arc<IdentityRegistry>,
        pool: Arc<ConnectionPool>,
        metrics: Arc<RealtimeMetrics>,
    ) -> Self {
        Self {
            registry,
            pool,
            metrics,
        }
    }

    /// Forwards `command` to every live connection of its recipient.
    pub fn route(&self, sender: &ConnectionHandle, command: &RoutingCommand) -> DeliveryReport {
        let recipient = command.recipient();
        // Owned copy; the registry lock is already released here.
        let targets = self.registry.connections_for(recipient);

        if targets.is_empty() {
            self.metrics.recipient_unreachable();
            debug!(
                conn_id = %sender.id,
                sender = %sender.identity,
                recipient = %recipient,
                "Recipient offline, dropping"
            );
            return DeliveryReport::default();
        }

        let message = command.to_outbound();
        let report = self.pool.send_to_many(targets.iter(), &message);

        self.metrics.messages_routed(report.delivered as u64);
        self.metrics.delivery_failures(report.failed as u64);

        debug!(
            conn_id = %sender.id,
            sender = %sender.identity,
            recipient = %recipient,
            event = message.event_name(),
            delivered = report.delivered,
            failed = report.failed,
            "Routed command"
        );
        report
    }
}
