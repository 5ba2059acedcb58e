//! Real-time gateway configuration.

use serde::{Deserialize, Serialize};

/// Real-time (WebSocket) gateway configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RealtimeConfig {
    /// Origins admitted by the connection gate. Empty means any origin.
    #[serde(default)]
    pub allowed_origins: Vec<String>,
    /// Per-connection outbound queue capacity.
    #[serde(default = "default_channel_buffer")]
    pub channel_buffer_size: usize,
    /// WebSocket ping interval in seconds.
    #[serde(default = "default_ping_interval")]
    pub ping_interval_seconds: u64,
    /// Seconds without a pong before a connection is considered dead.
    #[serde(default = "default_ping_timeout")]
    pub ping_timeout_seconds: u64,
    /// Largest inbound text frame accepted, in bytes.
    #[serde(default = "default_max_message_bytes")]
    pub max_message_bytes: usize,
    /// Broadcast presence on every connect/disconnect. When false, only an
    /// identity going online or offline triggers a broadcast.
    #[serde(default = "default_true")]
    pub broadcast_on_every_change: bool,
}

impl Default for RealtimeConfig {
    fn default() -> Self {
        Self {
            allowed_origins: Vec::new(),
            channel_buffer_size: default_channel_buffer(),
            ping_interval_seconds: default_ping_interval(),
            ping_timeout_seconds: default_ping_timeout(),
            max_message_bytes: default_max_message_bytes(),
            broadcast_on_every_change: true,
        }
    }
}

fn default_channel_buffer() -> usize {
    256
}

fn default_ping_interval() -> u64 {
    20
}

fn default_ping_timeout() -> u64 {
    40
}

fn default_max_message_bytes() -> usize {
    65_536
}

fn default_true() -> bool {
    true
}
