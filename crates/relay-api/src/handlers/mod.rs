//! Axum request handlers.

pub mod health;
pub mod presence;
pub mod ws;
