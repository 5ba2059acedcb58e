//! Connection manager. Drives each connection through its lifecycle.
//!
//! `open` registers an admitted connection and publishes presence before any
//! inbound command is dispatched; `terminate` deregisters it exactly once and
//! then publishes presence again. All sends happen after the registry call
//! has returned. A session dropped without `terminate` (for example while its
//! transport task unwinds) is released the same way.

use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use relay_core::config::RealtimeConfig;
use relay_core::types::{ConnectionId, Identity};

use crate::message::serializer::deserialize_inbound;
use crate::message::types::{OutboundMessage, RoutingCommand};
use crate::metrics::RealtimeMetrics;
use crate::presence::publisher::PresencePublisher;
use crate::routing::router::MessageRouter;

use super::gate::Admission;
use super::handle::ConnectionHandle;
use super::lifecycle::{ConnectionLifecycle, LifecycleEvent, LifecycleState};
use super::pool::{ConnectionPool, DeliveryReport};
use super::registry::{IdentityRegistry, MembershipChange};

/// Registry, pool and presence, shared by the manager and every session.
#[derive(Debug)]
struct Membership {
    registry: Arc<IdentityRegistry>,
    pool: Arc<ConnectionPool>,
    presence: Arc<PresencePublisher>,
    metrics: Arc<RealtimeMetrics>,
    broadcast_on_every_change: bool,
}

impl Membership {
    /// Deregisters `handle` and publishes presence. Does nothing if the
    /// lifecycle was already terminated.
    fn release(&self, handle: &ConnectionHandle, lifecycle: &mut ConnectionLifecycle) -> bool {
        let previous = match lifecycle.apply(LifecycleEvent::Terminate) {
            Some(previous) => previous,
            None => {
                debug!(conn_id = %handle.id, "Connection already terminated");
                return false;
            }
        };

        handle.mark_dead();
        if !previous.is_registered() {
            return true;
        }

        self.pool.remove(&handle.id);
        let change = self.registry.deregister(&handle.identity, handle.id);
        self.metrics.connection_closed();

        info!(
            conn_id = %handle.id,
            identity = %handle.identity,
            connected_secs = (Utc::now() - handle.connected_at).num_seconds(),
            "WebSocket connection unregistered"
        );

        self.publish_after(change);
        true
    }

    fn publish_after(&self, change: MembershipChange) {
        if !change.is_mutation() {
            return;
        }
        if self.broadcast_on_every_change || change.is_transition() {
            // Snapshot taken after the mutation; sends happen after the read
            // lock is released.
            let snapshot = self.registry.snapshot_identities();
            self.presence.publish(snapshot);
        }
    }
}

/// One open connection as seen by its transport task.
///
/// Dropping a session that was never terminated deregisters it and asks its
/// transport to close.
#[derive(Debug)]
pub struct ConnectionSession {
    handle: Arc<ConnectionHandle>,
    lifecycle: ConnectionLifecycle,
    membership: Arc<Membership>,
}

impl ConnectionSession {
    /// The connection's handle.
    pub fn handle(&self) -> &Arc<ConnectionHandle> {
        &self.handle
    }

    /// Connection ID.
    pub fn id(&self) -> ConnectionId {
        self.handle.id
    }

    /// Identity bound at admission.
    pub fn identity(&self) -> &Identity {
        &self.handle.identity
    }

    /// Current lifecycle state.
    pub fn state(&self) -> LifecycleState {
        self.lifecycle.state()
    }
}

impl Drop for ConnectionSession {
    fn drop(&mut self) {
        if self.lifecycle.state() == LifecycleState::Terminated {
            return;
        }
        warn!(
            conn_id = %self.handle.id,
            identity = %self.handle.identity,
            "Session dropped before termination, releasing"
        );
        self.membership.release(&self.handle, &mut self.lifecycle);
        self.handle.request_close();
    }
}

/// Manages all active WebSocket connections.
#[derive(Debug)]
pub struct ConnectionManager {
    /// Registry, pool and presence publisher.
    membership: Arc<Membership>,
    /// Message router.
    router: Arc<MessageRouter>,
    /// Configuration.
    config: RealtimeConfig,
}

impl ConnectionManager {
    /// Creates a new connection manager.
    pub fn new(
        config: RealtimeConfig,
        registry: Arc<IdentityRegistry>,
        pool: Arc<ConnectionPool>,
        router: Arc<MessageRouter>,
        presence: Arc<PresencePublisher>,
        metrics: Arc<RealtimeMetrics>,
    ) -> Self {
        let membership = Arc::new(Membership {
            registry,
            pool,
            presence,
            metrics,
            broadcast_on_every_change: config.broadcast_on_every_change,
        });
        Self {
            membership,
            router,
            config,
        }
    }

    /// Opens an admitted connection: registers it, publishes presence, and
    /// makes it ready for dispatch.
    ///
    /// Returns the session and a receiver for outbound messages, which the
    /// transport must drain into the socket.
    pub fn open(&self, admission: Admission) -> (ConnectionSession, mpsc::Receiver<OutboundMessage>) {
        let (tx, rx) = mpsc::channel(self.config.channel_buffer_size.max(1));
        let credential_expires_at = admission.expires_at;
        let handle = Arc::new(ConnectionHandle::new(
            admission.identity,
            admission.origin,
            tx,
        ));

        let mut lifecycle = ConnectionLifecycle::new();
        lifecycle.apply(LifecycleEvent::Admit);

        let membership = &self.membership;
        // Pool first so the new connection also receives its own presence frame.
        membership.pool.add(handle.clone());
        let change = membership.registry.register(&handle.identity, handle.id);
        membership.metrics.connection_opened();

        info!(
            conn_id = %handle.id,
            identity = %handle.identity,
            origin = ?handle.origin,
            credential_expires_at = %credential_expires_at,
            "WebSocket connection registered"
        );

        membership.publish_after(change);
        lifecycle.apply(LifecycleEvent::BeginDispatch);

        let session = ConnectionSession {
            handle,
            lifecycle,
            membership: membership.clone(),
        };
        (session, rx)
    }

    /// Processes an inbound text frame from a client.
    ///
    /// Frames that fail validation or parsing are answered with an `error`
    /// event to the sending connection only.
    pub fn handle_inbound(&self, session: &ConnectionSession, raw: &str) -> DeliveryReport {
        if session.state() != LifecycleState::Active {
            warn!(conn_id = %session.id(), state = ?session.state(), "Frame on inactive connection");
            return DeliveryReport::default();
        }

        let msg = match deserialize_inbound(raw, self.config.max_message_bytes) {
            Ok(m) => m,
            Err(e) => {
                self.membership.metrics.malformed_frame();
                debug!(conn_id = %session.id(), error = %e, "Rejected inbound frame");
                if let Err(send_err) = session
                    .handle
                    .send(OutboundMessage::error("INVALID_MESSAGE", e.message))
                {
                    warn!(conn_id = %session.id(), error = %send_err, "Failed to send error frame");
                }
                return DeliveryReport::default();
            }
        };

        self.dispatch(session, RoutingCommand::from(msg))
    }

    /// Routes one command from an active connection.
    pub fn dispatch(&self, session: &ConnectionSession, command: RoutingCommand) -> DeliveryReport {
        if session.state() != LifecycleState::Active {
            return DeliveryReport::default();
        }
        self.membership.metrics.command_received();
        self.router.route(&session.handle, &command)
    }

    /// Terminates a connection: deregisters it and publishes presence.
    ///
    /// Returns `false` if the session was already terminated, in which case
    /// nothing is touched.
    pub fn terminate(&self, session: &mut ConnectionSession) -> bool {
        session
            .membership
            .release(&session.handle, &mut session.lifecycle)
    }

    /// Asks every open connection's transport to close. Each one then runs
    /// its normal termination.
    pub fn close_all(&self) -> usize {
        let all = self.membership.pool.all_connections();
        for conn in &all {
            conn.request_close();
        }
        info!(count = all.len(), "Requested close of all connections");
        all.len()
    }

    /// Identities currently online.
    pub fn online_identities(&self) -> BTreeSet<Identity> {
        self.membership.registry.snapshot_identities()
    }

    /// Returns the total connection count.
    pub fn connection_count(&self) -> usize {
        self.membership.pool.connection_count()
    }

    /// Returns the number of online identities.
    pub fn identity_count(&self) -> usize {
        self.membership.registry.identity_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct Fixture {
        manager: ConnectionManager,
        registry: Arc<IdentityRegistry>,
        metrics: Arc<RealtimeMetrics>,
    }

    fn fixture(config: RealtimeConfig) -> Fixture {
        let registry = Arc::new(IdentityRegistry::new());
        let pool = Arc::new(ConnectionPool::new());
        let metrics = Arc::new(RealtimeMetrics::new());
        let router = Arc::new(MessageRouter::new(registry.clone(), pool.clone(), metrics.clone()));
        let presence = Arc::new(PresencePublisher::new(pool.clone(), metrics.clone()));
        let manager = ConnectionManager::new(
            config,
            registry.clone(),
            pool,
            router,
            presence,
            metrics.clone(),
        );
        Fixture {
            manager,
            registry,
            metrics,
        }
    }

    fn admission(identity: &str) -> Admission {
        Admission {
            identity: Identity::new(identity),
            origin: None,
            expires_at: Utc::now(),
        }
    }

    fn online(rx: &mut mpsc::Receiver<OutboundMessage>) -> Vec<String> {
        let mut last = None;
        while let Ok(msg) = rx.try_recv() {
            if let OutboundMessage::Online(ids) = msg {
                last = Some(ids.into_iter().map(|i| i.to_string()).collect());
            }
        }
        last.expect("an online frame")
    }

    #[test]
    fn test_open_registers_then_publishes() {
        let fx = fixture(RealtimeConfig::default());
        let (session, mut rx) = fx.manager.open(admission("u1"));
        assert_eq!(session.state(), LifecycleState::Active);
        assert!(fx.registry.is_online(&Identity::new("u1")));
        assert_eq!(online(&mut rx), vec!["u1"]);
    }

    #[test]
    fn test_terminate_exactly_once() {
        let fx = fixture(RealtimeConfig::default());
        let (mut s1, _rx1) = fx.manager.open(admission("u1"));
        let (_s2, mut rx2) = fx.manager.open(admission("u2"));
        let broadcasts = fx.metrics.snapshot().presence_broadcasts;

        assert!(fx.manager.terminate(&mut s1));
        assert!(!fx.manager.terminate(&mut s1));
        assert_eq!(s1.state(), LifecycleState::Terminated);
        assert_eq!(fx.metrics.snapshot().presence_broadcasts, broadcasts + 1);
        assert_eq!(online(&mut rx2), vec!["u2"]);
        assert_eq!(fx.manager.connection_count(), 1);
    }

    #[test]
    fn test_frames_after_terminate_ignored() {
        let fx = fixture(RealtimeConfig::default());
        let (_target, mut target_rx) = fx.manager.open(admission("t"));
        let (mut sender, _rx) = fx.manager.open(admission("s"));
        fx.manager.terminate(&mut sender);
        while target_rx.try_recv().is_ok() {}

        let frame = r#"{"event":"send_message","data":{"recipientId":"t","conversation":1}}"#;
        let report = fx.manager.handle_inbound(&sender, frame);
        assert_eq!(report.delivered, 0);
        assert!(target_rx.try_recv().is_err());
    }

    #[test]
    fn test_malformed_frame_answered_to_sender_only() {
        let fx = fixture(RealtimeConfig::default());
        let (other, mut other_rx) = fx.manager.open(admission("o"));
        let (sender, mut sender_rx) = fx.manager.open(admission("s"));
        while other_rx.try_recv().is_ok() {}
        while sender_rx.try_recv().is_ok() {}

        fx.manager.handle_inbound(&sender, "{not json");
        match sender_rx.try_recv().unwrap() {
            OutboundMessage::Error { code, .. } => assert_eq!(code, "INVALID_MESSAGE"),
            other => panic!("unexpected frame: {other:?}"),
        }
        assert!(other_rx.try_recv().is_err());
        assert_eq!(fx.metrics.snapshot().malformed_frames, 1);
        assert_eq!(other.state(), LifecycleState::Active);
    }

    #[test]
    fn test_inbound_send_message_routed() {
        let fx = fixture(RealtimeConfig::default());
        let (_r, mut r_rx) = fx.manager.open(admission("r"));
        let (sender, _s_rx) = fx.manager.open(admission("s"));
        while r_rx.try_recv().is_ok() {}

        let frame = r#"{"event":"send_message","data":{"recipientId":"r","conversation":{"m":"hi"}}}"#;
        let report = fx.manager.handle_inbound(&sender, frame);
        assert_eq!(report.delivered, 1);
        assert_eq!(
            r_rx.try_recv().unwrap(),
            OutboundMessage::ReceiveMessage(json!({"m": "hi"}))
        );
    }

    #[test]
    fn test_transition_only_broadcasts() {
        let config = RealtimeConfig {
            broadcast_on_every_change: false,
            ..RealtimeConfig::default()
        };
        let fx = fixture(config);
        let (mut a, _) = fx.manager.open(admission("u1"));
        let (mut b, _) = fx.manager.open(admission("u1"));
        assert_eq!(fx.metrics.snapshot().presence_broadcasts, 1);

        fx.manager.terminate(&mut a);
        assert_eq!(fx.metrics.snapshot().presence_broadcasts, 1);
        fx.manager.terminate(&mut b);
        assert_eq!(fx.metrics.snapshot().presence_broadcasts, 2);
    }

    #[tokio::test]
    async fn test_close_all_signals_every_connection() {
        let fx = fixture(RealtimeConfig::default());
        let (a, _rx_a) = fx.manager.open(admission("u1"));
        let (b, _rx_b) = fx.manager.open(admission("u2"));
        assert_eq!(fx.manager.close_all(), 2);
        a.handle().close_requested().await;
        b.handle().close_requested().await;
    }

    #[test]
    fn test_dropped_session_is_released() {
        let fx = fixture(RealtimeConfig::default());
        let (s1, _rx1) = fx.manager.open(admission("u1"));
        let (_s2, mut rx2) = fx.manager.open(admission("u2"));
        let handle = s1.handle().clone();
        let broadcasts = fx.metrics.snapshot().presence_broadcasts;

        drop(s1);

        assert!(!fx.registry.is_online(&Identity::new("u1")));
        assert!(!handle.is_alive());
        assert_eq!(fx.manager.connection_count(), 1);
        assert_eq!(fx.metrics.snapshot().presence_broadcasts, broadcasts + 1);
        assert_eq!(online(&mut rx2), vec!["u2"]);
    }

    #[test]
    fn test_drop_after_terminate_publishes_nothing() {
        let fx = fixture(RealtimeConfig::default());
        let (mut s1, _rx1) = fx.manager.open(admission("u1"));
        fx.manager.terminate(&mut s1);
        let broadcasts = fx.metrics.snapshot().presence_broadcasts;

        drop(s1);

        assert_eq!(fx.metrics.snapshot().presence_broadcasts, broadcasts);
    }

    #[tokio::test]
    async fn test_panicking_transport_task_still_deregisters() {
        let fx = fixture(RealtimeConfig::default());
        let (session, _rx) = fx.manager.open(admission("ghost"));
        let handle = session.handle().clone();
        assert!(fx.registry.is_online(&Identity::new("ghost")));

        let task = tokio::spawn(async move {
            let _session = session;
            panic!("transport failure");
        });
        assert!(task.await.unwrap_err().is_panic());

        assert!(fx.manager.online_identities().is_empty());
        assert_eq!(fx.manager.connection_count(), 0);
        handle.close_requested().await;
    }
}
