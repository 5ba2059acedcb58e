//! WebSocket message types, serialization, and validation.

pub mod serializer;
pub mod types;
pub mod validator;

pub use types::{ControlSignal, InboundMessage, OutboundMessage, RoutingCommand};
