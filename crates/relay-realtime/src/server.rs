//! Top-level real-time engine that ties together all subsystems.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tracing::info;

use relay_core::config::{AuthConfig, RealtimeConfig};
use relay_core::traits::CredentialVerifier;

use crate::connection::gate::{Admission, ConnectionGate, GateError};
use crate::connection::heartbeat::HeartbeatConfig;
use crate::connection::manager::{ConnectionManager, ConnectionSession};
use crate::connection::pool::ConnectionPool;
use crate::connection::registry::IdentityRegistry;
use crate::message::types::OutboundMessage;
use crate::metrics::RealtimeMetrics;
use crate::presence::publisher::PresencePublisher;
use crate::routing::router::MessageRouter;

/// Central real-time engine that coordinates all connection subsystems.
#[derive(Clone)]
pub struct RealtimeEngine {
    /// Connection gate.
    pub gate: Arc<ConnectionGate>,
    /// Connection manager.
    pub connections: Arc<ConnectionManager>,
    /// Identity registry.
    pub registry: Arc<IdentityRegistry>,
    /// Metrics collector.
    pub metrics: Arc<RealtimeMetrics>,
    /// Heartbeat timings for transports.
    pub heartbeat: HeartbeatConfig,
}

impl std::fmt::Debug for RealtimeEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RealtimeEngine").finish()
    }
}

impl RealtimeEngine {
    /// Creates a new real-time engine with all subsystems.
    pub fn new(
        config: &RealtimeConfig,
        auth: &AuthConfig,
        verifier: Arc<dyn CredentialVerifier>,
    ) -> Self {
        let metrics = Arc::new(RealtimeMetrics::new());
        let registry = Arc::new(IdentityRegistry::new());
        let pool = Arc::new(ConnectionPool::new());
        let router = Arc::new(MessageRouter::new(
            registry.clone(),
            pool.clone(),
            metrics.clone(),
        ));
        let presence = Arc::new(PresencePublisher::new(pool.clone(), metrics.clone()));
        let connections = Arc::new(ConnectionManager::new(
            config.clone(),
            registry.clone(),
            pool,
            router,
            presence,
            metrics.clone(),
        ));
        let gate = Arc::new(ConnectionGate::new(
            &config.allowed_origins,
            verifier,
            Duration::from_millis(auth.verify_timeout_ms),
        ));

        info!(
            allowed_origins = config.allowed_origins.len(),
            broadcast_on_every_change = config.broadcast_on_every_change,
            "Real-time engine initialized"
        );

        Self {
            gate,
            connections,
            registry,
            metrics,
            heartbeat: HeartbeatConfig::from(config),
        }
    }

    /// Runs the gate. Rejections are counted and never touch the registry.
    pub async fn admit(
        &self,
        origin: Option<&str>,
        credential: Option<&str>,
    ) -> Result<Admission, GateError> {
        self.gate.admit(origin, credential).await.inspect_err(|_| {
            self.metrics.connection_rejected();
        })
    }

    /// Runs the gate and, if admitted, opens the connection.
    pub async fn connect(
        &self,
        origin: Option<&str>,
        credential: Option<&str>,
    ) -> Result<(ConnectionSession, mpsc::Receiver<OutboundMessage>), GateError> {
        let admission = self.admit(origin, credential).await?;
        Ok(self.connections.open(admission))
    }

    /// Initiates a graceful shutdown of the real-time engine.
    pub fn shutdown(&self) {
        info!("Shutting down real-time engine");
        let closing = self.connections.close_all();
        info!(connections = closing, "Real-time engine shut down");
    }
}
