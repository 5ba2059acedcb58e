//! Presence broadcasting.

pub mod publisher;

pub use publisher::PresencePublisher;
