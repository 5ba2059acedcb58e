//! Response DTOs.

use serde::{Deserialize, Serialize};

use relay_core::types::Identity;
use relay_realtime::metrics::MetricsSnapshot;

/// Standard success envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T: Serialize> {
    /// Whether the request was successful.
    pub success: bool,
    /// Response data.
    pub data: T,
}

impl<T: Serialize> ApiResponse<T> {
    /// Creates a successful response.
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data,
        }
    }
}

/// Basic health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Service status.
    pub status: String,
    /// Crate version.
    pub version: String,
    /// Seconds since the server started.
    pub uptime_seconds: u64,
}

/// Detailed health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetailedHealthResponse {
    /// Service status.
    pub status: String,
    /// Crate version.
    pub version: String,
    /// Seconds since the server started.
    pub uptime_seconds: u64,
    /// Open WebSocket connections.
    pub connections: usize,
    /// Distinct identities online.
    pub online_identities: usize,
    /// Gateway counters.
    pub metrics: MetricsSnapshot,
}

/// Current presence snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PresenceResponse {
    /// Identities with at least one live connection.
    pub online: Vec<Identity>,
    /// Number of online identities.
    pub count: usize,
}
