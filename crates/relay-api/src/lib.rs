//! # relay-api
//!
//! HTTP API layer for the presence relay built on Axum.
//!
//! Provides the WebSocket upgrade at `/ws`, health and presence endpoints,
//! the CORS layer, credential extractors, DTOs, and error mapping.

pub mod app;
pub mod dto;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod middleware;
pub mod router;
pub mod state;

pub use app::{build_app, run_server, serve};
pub use error::ApiError;
pub use state::AppState;
