//! Credential verifier contract consumed by the connection gate.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::types::Identity;

/// A successfully verified credential.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedCredential {
    /// The authenticated principal.
    pub identity: Identity,
    /// When the credential stops being valid.
    pub expires_at: DateTime<Utc>,
}

/// Why a credential was refused. Logged by the gate, never sent to clients.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VerificationError {
    /// The credential is not a well-formed token.
    #[error("malformed credential: {0}")]
    Malformed(String),
    /// The signature does not match.
    #[error("invalid signature")]
    InvalidSignature,
    /// The credential is past its expiry.
    #[error("credential expired")]
    Expired,
    /// The credential was signed with an algorithm this verifier refuses.
    #[error("unsupported signing algorithm: {0}")]
    UnsupportedAlgorithm(String),
    /// The credential verified but names no principal.
    #[error("credential carries no identity")]
    MissingIdentity,
}

/// Validates an opaque bearer credential.
///
/// Implementations must reject unsupported signing algorithms and expired
/// credentials.
#[async_trait]
pub trait CredentialVerifier: Send + Sync + std::fmt::Debug + 'static {
    /// Verifies `credential` and returns the identity it names.
    async fn verify(&self, credential: &str) -> Result<VerifiedCredential, VerificationError>;
}
