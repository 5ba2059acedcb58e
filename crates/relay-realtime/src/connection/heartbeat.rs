//! Ping/pong heartbeat for WebSocket keepalive.
//!
//! The transport sends a ping every `ping_interval` and records pongs here.
//! A connection that has not answered within `ping_timeout` is dead and goes
//! through the normal termination path.

use std::time::Duration;

use tokio::time::Instant;

use relay_core::config::RealtimeConfig;

/// Shortest ping period a ticker will use.
const MIN_TICK: Duration = Duration::from_millis(1);

/// Heartbeat configuration
#[derive(Debug, Clone, Copy)]
pub struct HeartbeatConfig {
    /// Interval between pings
    pub ping_interval: Duration,
    /// Silence after which the connection is considered dead
    pub ping_timeout: Duration,
}

impl From<&RealtimeConfig> for HeartbeatConfig {
    fn from(config: &RealtimeConfig) -> Self {
        Self {
            ping_interval: Duration::from_secs(config.ping_interval_seconds),
            ping_timeout: Duration::from_secs(config.ping_timeout_seconds),
        }
    }
}

/// Tracks liveness of one connection.
#[derive(Debug)]
pub struct HeartbeatMonitor {
    config: HeartbeatConfig,
    last_pong: Instant,
}

impl HeartbeatMonitor {
    /// Starts tracking from now.
    pub fn new(config: HeartbeatConfig) -> Self {
        Self {
            config,
            last_pong: Instant::now(),
        }
    }

    /// A ticker for sending pings. The first tick fires one interval from now.
    pub fn ticker(&self) -> tokio::time::Interval {
        let period = self.config.ping_interval.max(MIN_TICK);
        let now = Instant::now();
        let start = now.checked_add(period).unwrap_or(now);
        let mut interval = tokio::time::interval_at(start, period);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        interval
    }

    /// Record a pong (or any other sign of life).
    pub fn record_pong(&mut self) {
        self.last_pong = Instant::now();
    }

    /// Whether the peer has been silent longer than the timeout.
    pub fn is_expired(&self) -> bool {
        self.last_pong.elapsed() > self.config.ping_timeout
    }
}
