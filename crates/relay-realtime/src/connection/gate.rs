//! Connection gate. Admits or refuses a connection before it is upgraded.
//!
//! Runs the origin allow-list check, then hands the credential to the
//! configured [`CredentialVerifier`] under a timeout. Every verifier failure
//! collapses into [`GateError::AuthenticationFailed`]; the detail is logged
//! here and never reaches the client.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::{info, warn};

use relay_core::error::AppError;
use relay_core::traits::CredentialVerifier;
use relay_core::types::Identity;

/// Why a connection attempt was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum GateError {
    /// The declared origin is not on the allow-list.
    #[error("Origin not allowed")]
    OriginRejected,
    /// No credential was supplied.
    #[error("Missing credentials")]
    MissingCredential,
    /// The credential did not verify, or verification timed out.
    #[error("Authentication failed")]
    AuthenticationFailed,
}

impl From<GateError> for AppError {
    fn from(err: GateError) -> Self {
        match err {
            GateError::OriginRejected => AppError::authorization(err.to_string()),
            GateError::MissingCredential | GateError::AuthenticationFailed => {
                AppError::authentication(err.to_string())
            }
        }
    }
}

/// An admitted connection attempt, ready to be opened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Admission {
    /// Identity bound to the connection for its whole lifetime.
    pub identity: Identity,
    /// Origin declared on the upgrade request.
    pub origin: Option<String>,
    /// Expiry of the credential that admitted the connection.
    pub expires_at: DateTime<Utc>,
}

/// Authenticates connection attempts.
#[derive(Clone)]
pub struct ConnectionGate {
    /// Exact-match origin allow-list. `None` admits any origin.
    allowed_origins: Option<Vec<String>>,
    /// Credential verifier.
    verifier: Arc<dyn CredentialVerifier>,
    /// Upper bound on one verification.
    verify_timeout: Duration,
}

impl std::fmt::Debug for ConnectionGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionGate")
            .field("allowed_origins", &self.allowed_origins)
            .field("verify_timeout", &self.verify_timeout)
            .finish()
    }
}

impl ConnectionGate {
    /// Creates a gate. An empty `allowed_origins` list means open policy.
    pub fn new(
        allowed_origins: &[String],
        verifier: Arc<dyn CredentialVerifier>,
        verify_timeout: Duration,
    ) -> Self {
        let allowed: Vec<String> = allowed_origins
            .iter()
            .map(|o| o.trim().to_string())
            .filter(|o| !o.is_empty())
            .collect();

        Self {
            allowed_origins: (!allowed.is_empty()).then_some(allowed),
            verifier,
            verify_timeout,
        }
    }

    /// Decides whether a connection attempt may proceed.
    pub async fn admit(
        &self,
        origin: Option<&str>,
        credential: Option<&str>,
    ) -> Result<Admission, GateError> {
        let origin = origin.map(str::trim).filter(|o| !o.is_empty());

        if let Some(allowed) = &self.allowed_origins {
            let permitted = origin.is_some_and(|o| allowed.iter().any(|a| a == o));
            if !permitted {
                warn!(origin = ?origin, "Connection rejected: origin not allowed");
                return Err(GateError::OriginRejected);
            }
        }

        let credential = match credential.map(str::trim).filter(|c| !c.is_empty()) {
            Some(c) => c,
            None => {
                warn!(origin = ?origin, "Connection rejected: missing credentials");
                return Err(GateError::MissingCredential);
            }
        };

        let verified =
            match tokio::time::timeout(self.verify_timeout, self.verifier.verify(credential)).await
            {
                Ok(Ok(verified)) => verified,
                Ok(Err(reason)) => {
                    warn!(origin = ?origin, reason = %reason, "Connection rejected: authentication failed");
                    return Err(GateError::AuthenticationFailed);
                }
                Err(_) => {
                    warn!(
                        origin = ?origin,
                        timeout_ms = self.verify_timeout.as_millis() as u64,
                        "Connection rejected: credential verification timed out"
                    );
                    return Err(GateError::AuthenticationFailed);
                }
            };

        info!(
            identity = %verified.identity,
            origin = ?origin,
            expires_at = %verified.expires_at,
            "Connection admitted"
        );

        Ok(Admission {
            identity: verified.identity,
            origin: origin.map(str::to_string),
            expires_at: verified.expires_at,
        })
    }
}
