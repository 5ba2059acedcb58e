//! JSON serialization for WebSocket messages.

use relay_core::error::AppError;

use super::types::{InboundMessage, OutboundMessage};
use super::validator::validate_inbound;

/// Serialize an outbound message to a text frame.
pub fn serialize_outbound(msg: &OutboundMessage) -> Result<String, serde_json::Error> {
    serde_json::to_string(msg)
}

/// Validate and deserialize an inbound text frame.
pub fn deserialize_inbound(text: &str, max_bytes: usize) -> Result<InboundMessage, AppError> {
    validate_inbound(text, max_bytes)?;
    serde_json::from_str(text)
        .map_err(|e| AppError::validation(format!("Failed to parse message: {e}")))
}
