//! # relay-realtime
//!
//! Real-time engine for the presence relay. Provides:
//!
//! - Connection gate (origin allow-list + credential verification)
//! - Identity registry mapping identities to live connections
//! - Presence publishing on every membership change
//! - Message and control-signal routing between identities
//! - Connection lifecycle and heartbeat tracking

pub mod connection;
pub mod message;
pub mod metrics;
pub mod presence;
pub mod routing;
pub mod server;

pub use connection::gate::{Admission, ConnectionGate, GateError};
pub use connection::manager::{ConnectionManager, ConnectionSession};
pub use connection::registry::IdentityRegistry;
pub use presence::publisher::PresencePublisher;
pub use routing::router::MessageRouter;
pub use server::RealtimeEngine;
