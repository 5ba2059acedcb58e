//! Individual WebSocket connection handle.

use std::sync::atomic::{AtomicBool, Ordering};

use chrono::{DateTime, Utc};
use thiserror::Error;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use relay_core::types::{ConnectionId, Identity};

use crate::message::types::OutboundMessage;

/// Why a single outbound send did not reach a connection's queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum DeliveryFailure {
    /// The connection's outbound queue is full.
    #[error("outbound buffer full")]
    BufferFull,
    /// The connection is closed or closing.
    #[error("connection closed")]
    Closed,
}

/// A handle to a single WebSocket connection.
///
/// Holds the sender channel that the transport's writer task drains, plus
/// the identity bound at admission. The identity never changes for the
/// lifetime of the handle.
#[derive(Debug)]
pub struct ConnectionHandle {
    /// Unique connection ID
    pub id: ConnectionId,
    /// Identity bound at admission
    pub identity: Identity,
    /// Origin declared on the upgrade request
    pub origin: Option<String>,
    /// When the connection was established
    pub connected_at: DateTime<Utc>,
    /// Sender for outbound messages
    sender: mpsc::Sender<OutboundMessage>,
    /// Whether the connection is still alive
    alive: AtomicBool,
    /// Fired when the server wants the transport to close the socket
    close_signal: CancellationToken,
}

impl ConnectionHandle {
    /// Create a new connection handle
    pub fn new(
        identity: Identity,
        origin: Option<String>,
        sender: mpsc::Sender<OutboundMessage>,
    ) -> Self {
        Self {
            id: ConnectionId::new(),
            identity,
            origin,
            connected_at: Utc::now(),
            sender,
            alive: AtomicBool::new(true),
            close_signal: CancellationToken::new(),
        }
    }

    /// Queue an outbound message. Never waits on the network.
    pub fn send(&self, msg: OutboundMessage) -> Result<(), DeliveryFailure> {
        if !self.is_alive() {
            return Err(DeliveryFailure::Closed);
        }
        match self.sender.try_send(msg) {
            Ok(()) => Ok(()),
            Err(mpsc::error::TrySendError::Full(_)) => Err(DeliveryFailure::BufferFull),
            Err(mpsc::error::TrySendError::Closed(_)) => {
                self.mark_dead();
                Err(DeliveryFailure::Closed)
            }
        }
    }

    /// Check if connection is alive
    pub fn is_alive(&self) -> bool {
        self.alive.load(Ordering::SeqCst)
    }

    /// Mark connection as dead
    pub fn mark_dead(&self) {
        self.alive.store(false, Ordering::SeqCst);
    }

    /// Ask the transport to close this connection.
    pub fn request_close(&self) {
        self.close_signal.cancel();
    }

    /// Resolves once [`request_close`](Self::request_close) has been called.
    pub async fn close_requested(&self) {
        self.close_signal.cancelled().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_send_reports_full_buffer() {
        let (tx, _rx) = mpsc::channel(1);
        let handle = ConnectionHandle::new(Identity::new("u1"), None, tx);
        assert!(handle.send(OutboundMessage::ForceReload).is_ok());
        assert_eq!(
            handle.send(OutboundMessage::ForceReload),
            Err(DeliveryFailure::BufferFull)
        );
        assert!(handle.is_alive());
    }

    #[test]
    fn test_send_to_dropped_receiver_marks_dead() {
        let (tx, rx) = mpsc::channel(4);
        drop(rx);
        let handle = ConnectionHandle::new(Identity::new("u1"), None, tx);
        assert_eq!(
            handle.send(OutboundMessage::ForceReload),
            Err(DeliveryFailure::Closed)
        );
        assert!(!handle.is_alive());
    }

    #[tokio::test]
    async fn test_close_request_resolves() {
        let (tx, _rx) = mpsc::channel(1);
        let handle = ConnectionHandle::new(Identity::new("u1"), None, tx);
        handle.request_close();
        handle.close_requested().await;
    }
}
