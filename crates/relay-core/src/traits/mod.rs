//! Contracts implemented by external collaborators.

pub mod verifier;

pub use verifier::{CredentialVerifier, VerificationError, VerifiedCredential};
