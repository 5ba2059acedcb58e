//! Application state shared across all handlers and middleware.

use std::sync::Arc;
use std::time::Instant;

use relay_core::config::AppConfig;
use relay_core::traits::CredentialVerifier;
use relay_realtime::RealtimeEngine;

/// Application state containing all shared dependencies.
///
/// Passed to every Axum handler via `State<AppState>`.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration
    pub config: Arc<AppConfig>,
    /// Credential verifier, shared with the gate
    pub verifier: Arc<dyn CredentialVerifier>,
    /// Real-time engine
    pub realtime: Arc<RealtimeEngine>,
    /// Process start, for uptime reporting
    pub started_at: Instant,
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("config", &self.config)
            .field("realtime", &self.realtime)
            .finish()
    }
}

impl AppState {
    /// Builds the engine around `verifier` and wraps everything for sharing.
    pub fn new(config: AppConfig, verifier: Arc<dyn CredentialVerifier>) -> Self {
        let realtime = Arc::new(RealtimeEngine::new(
            &config.realtime,
            &config.auth,
            verifier.clone(),
        ));
        Self {
            config: Arc::new(config),
            verifier,
            realtime,
            started_at: Instant::now(),
        }
    }

    /// Seconds since the state was built.
    pub fn uptime_seconds(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }
}
