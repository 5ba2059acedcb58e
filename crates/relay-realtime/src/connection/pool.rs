//! Connection pool: the transport-side table of live connection handles.
//!
//! The pool is the only path by which the core writes to a connection:
//! routing and presence resolve connection IDs to handles here and queue
//! frames onto them.

use std::sync::Arc;

use dashmap::DashMap;
use tracing::warn;

use relay_core::types::ConnectionId;

use super::handle::{ConnectionHandle, DeliveryFailure};
use crate::message::types::OutboundMessage;

/// Result of sending one frame to many connections.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeliveryReport {
    /// Connections the frame was queued on.
    pub delivered: usize,
    /// Connections that could not take the frame.
    pub failed: usize,
}

/// Thread-safe pool of all active WebSocket connections.
#[derive(Debug, Default)]
pub struct ConnectionPool {
    /// Connection ID → connection handle.
    by_id: DashMap<ConnectionId, Arc<ConnectionHandle>>,
}

impl ConnectionPool {
    /// Creates a new empty connection pool.
    pub fn new() -> Self {
        Self {
            by_id: DashMap::new(),
        }
    }

    /// Adds a connection to the pool.
    pub fn add(&self, handle: Arc<ConnectionHandle>) {
        self.by_id.insert(handle.id, handle);
    }

    /// Removes a connection from the pool.
    pub fn remove(&self, conn_id: &ConnectionId) -> Option<Arc<ConnectionHandle>> {
        self.by_id.remove(conn_id).map(|(_, handle)| handle)
    }

    /// Gets a specific connection by ID.
    pub fn get(&self, conn_id: &ConnectionId) -> Option<Arc<ConnectionHandle>> {
        self.by_id.get(conn_id).map(|entry| entry.value().clone())
    }

    /// Queues `msg` on one connection.
    pub fn send_to(
        &self,
        conn_id: &ConnectionId,
        msg: OutboundMessage,
    ) -> Result<(), DeliveryFailure> {
        match self.get(conn_id) {
            Some(handle) => handle.send(msg),
            None => Err(DeliveryFailure::Closed),
        }
    }

    /// Queues `msg` on every listed connection. A failure on one connection
    /// is logged and does not stop delivery to the rest.
    pub fn send_to_many<'a>(
        &self,
        conn_ids: impl IntoIterator<Item = &'a ConnectionId>,
        msg: &OutboundMessage,
    ) -> DeliveryReport {
        let mut report = DeliveryReport::default();
        for conn_id in conn_ids {
            match self.send_to(conn_id, msg.clone()) {
                Ok(()) => report.delivered += 1,
                Err(e) => {
                    warn!(
                        conn_id = %conn_id,
                        event = msg.event_name(),
                        error = %e,
                        "Failed to deliver to connection"
                    );
                    report.failed += 1;
                }
            }
        }
        report
    }

    /// Queues `msg` on every connection in the pool.
    pub fn broadcast_all(&self, msg: &OutboundMessage) -> DeliveryReport {
        // Collect first so no shard lock is held while sending.
        let ids: Vec<ConnectionId> = self.by_id.iter().map(|entry| *entry.key()).collect();
        self.send_to_many(ids.iter(), msg)
    }

    /// Returns total number of active connections.
    pub fn connection_count(&self) -> usize {
        self.by_id.len()
    }

    /// Returns all connection handles.
    pub fn all_connections(&self) -> Vec<Arc<ConnectionHandle>> {
        self.by_id
            .iter()
            .map(|entry| entry.value().clone())
            .collect()
    }
}
