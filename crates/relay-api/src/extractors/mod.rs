//! Request extractors.

pub mod auth;
pub mod credential;

pub use auth::AuthIdentity;
pub use credential::{bearer_token, extract_credential, extract_origin};
