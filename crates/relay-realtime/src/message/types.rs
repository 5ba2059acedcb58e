//! Inbound and outbound WebSocket message type definitions.
//!
//! Every application frame is a JSON text frame of the form
//! `{"event": "<name>", "data": <payload>}`. Event names and field names
//! are part of the client contract and must stay stable.

use serde::{Deserialize, Serialize};

use relay_core::types::Identity;

/// Messages sent by the client to the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum InboundMessage {
    /// Deliver `conversation` to every connection of `recipient_id`.
    SendMessage {
        /// Recipient identity.
        #[serde(rename = "recipientId")]
        recipient_id: Identity,
        /// Opaque payload, forwarded verbatim.
        conversation: serde_json::Value,
    },
    /// Ask every connection of `user_profile_id` to reload.
    ForceReload {
        /// Target identity.
        #[serde(rename = "userProfileId")]
        user_profile_id: Identity,
    },
}

/// Messages sent by the server to the client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum OutboundMessage {
    /// Identities currently online. Order carries no meaning.
    Online(Vec<Identity>),
    /// A payload another identity addressed to this one.
    ReceiveMessage(serde_json::Value),
    /// Reload instruction. Carries no payload.
    ForceReload,
    /// A frame from this connection could not be processed.
    Error {
        /// Error code.
        code: String,
        /// Error description.
        message: String,
    },
}

impl OutboundMessage {
    /// Builds an error frame.
    pub fn error(code: &str, message: impl Into<String>) -> Self {
        Self::Error {
            code: code.to_string(),
            message: message.into(),
        }
    }

    /// Wire name of this event.
    pub fn event_name(&self) -> &'static str {
        match self {
            Self::Online(_) => "online",
            Self::ReceiveMessage(_) => "receive_message",
            Self::ForceReload => "force_reload",
            Self::Error { .. } => "error",
        }
    }
}

/// Named control signals that carry no payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlSignal {
    /// Client should reload its view.
    ForceReload,
}

/// A routing request addressed to one identity.
#[derive(Debug, Clone, PartialEq)]
pub enum RoutingCommand {
    /// Forward `payload` unchanged.
    Message {
        /// Recipient identity.
        recipient: Identity,
        /// Opaque payload.
        payload: serde_json::Value,
    },
    /// Forward a bare control signal.
    Control {
        /// Recipient identity.
        recipient: Identity,
        /// Signal to deliver.
        signal: ControlSignal,
    },
}

impl RoutingCommand {
    /// The identity this command is addressed to.
    pub fn recipient(&self) -> &Identity {
        match self {
            Self::Message { recipient, .. } | Self::Control { recipient, .. } => recipient,
        }
    }

    /// The frame each recipient connection receives.
    pub fn to_outbound(&self) -> OutboundMessage {
        match self {
            Self::Message { payload, .. } => OutboundMessage::ReceiveMessage(payload.clone()),
            Self::Control {
                signal: ControlSignal::ForceReload,
                ..
            } => OutboundMessage::ForceReload,
        }
    }
}

impl From<InboundMessage> for RoutingCommand {
    fn from(msg: InboundMessage) -> Self {
        match msg {
            InboundMessage::SendMessage {
                recipient_id,
                conversation,
            } => Self::Message {
                recipient: recipient_id,
                payload: conversation,
            },
            InboundMessage::ForceReload { user_profile_id } => Self::Control {
                recipient: user_profile_id,
                signal: ControlSignal::ForceReload,
            },
        }
    }
}
