//! # relay-auth
//!
//! Credential verification for the presence relay.
//!
//! ## Modules
//!
//! - `jwt`: HS256 token verification (the gate's [`CredentialVerifier`])
//!   and token issuance for operators and tests
//!
//! [`CredentialVerifier`]: relay_core::traits::CredentialVerifier

pub mod jwt;

pub use jwt::{Claims, JwtEncoder, JwtVerifier};
