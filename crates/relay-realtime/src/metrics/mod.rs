//! Gateway metrics.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

/// Gateway-level metrics counters.
#[derive(Debug, Default)]
pub struct RealtimeMetrics {
    /// Connections admitted and opened
    connections_total: AtomicU64,
    /// Connections currently open
    connections_active: AtomicU64,
    /// Connection attempts refused by the gate
    connections_rejected: AtomicU64,
    /// Routing commands received
    commands_received: AtomicU64,
    /// Inbound frames that failed validation or parsing
    malformed_frames: AtomicU64,
    /// Frames queued for recipients by the router
    messages_routed: AtomicU64,
    /// Routing commands whose recipient had no live connection
    recipients_unreachable: AtomicU64,
    /// Individual sends that failed
    delivery_failures: AtomicU64,
    /// Presence broadcasts performed
    presence_broadcasts: AtomicU64,
}

impl RealtimeMetrics {
    /// Create new zeroed metrics
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a newly opened connection.
    pub fn connection_opened(&self) {
        self.connections_total.fetch_add(1, Ordering::Relaxed);
        self.connections_active.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a terminated connection.
    pub fn connection_closed(&self) {
        // Saturate instead of wrapping if a close is ever double counted.
        let _ = self
            .connections_active
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |n| n.checked_sub(1));
    }

    /// Record a gate rejection.
    pub fn connection_rejected(&self) {
        self.connections_rejected.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a routing command received from a client.
    pub fn command_received(&self) {
        self.commands_received.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a frame that could not be parsed.
    pub fn malformed_frame(&self) {
        self.malformed_frames.fetch_add(1, Ordering::Relaxed);
    }

    /// Record frames queued by the router.
    pub fn messages_routed(&self, count: u64) {
        self.messages_routed.fetch_add(count, Ordering::Relaxed);
    }

    /// Record a command addressed to an offline identity.
    pub fn recipient_unreachable(&self) {
        self.recipients_unreachable.fetch_add(1, Ordering::Relaxed);
    }

    /// Record failed sends.
    pub fn delivery_failures(&self, count: u64) {
        if count > 0 {
            self.delivery_failures.fetch_add(count, Ordering::Relaxed);
        }
    }

    /// Record a presence broadcast.
    pub fn presence_broadcast(&self) {
        self.presence_broadcasts.fetch_add(1, Ordering::Relaxed);
    }

    /// Get a snapshot of all metrics
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            connections_total: self.connections_total.load(Ordering::Relaxed),
            connections_active: self.connections_active.load(Ordering::Relaxed),
            connections_rejected: self.connections_rejected.load(Ordering::Relaxed),
            commands_received: self.commands_received.load(Ordering::Relaxed),
            malformed_frames: self.malformed_frames.load(Ordering::Relaxed),
            messages_routed: self.messages_routed.load(Ordering::Relaxed),
            recipients_unreachable: self.recipients_unreachable.load(Ordering::Relaxed),
            delivery_failures: self.delivery_failures.load(Ordering::Relaxed),
            presence_broadcasts: self.presence_broadcasts.load(Ordering::Relaxed),
        }
    }
}

/// Serializable metrics snapshot
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    /// Connections ever opened
    pub connections_total: u64,
    /// Currently open connections
    pub connections_active: u64,
    /// Gate rejections
    pub connections_rejected: u64,
    /// Routing commands received
    pub commands_received: u64,
    /// Malformed inbound frames
    pub malformed_frames: u64,
    /// Frames queued by the router
    pub messages_routed: u64,
    /// Commands to offline recipients
    pub recipients_unreachable: u64,
    /// Failed individual sends
    pub delivery_failures: u64,
    /// Presence broadcasts
    pub presence_broadcasts: u64,
}
