//! JWT token creation with configurable TTL.

use chrono::{DateTime, TimeDelta, Utc};
use jsonwebtoken::{EncodingKey, Header, encode};

use relay_core::config::AuthConfig;
use relay_core::error::AppError;
use relay_core::types::Identity;

use super::claims::{Claims, SessionUser};

/// Creates HS256 session tokens the [`JwtVerifier`](super::JwtVerifier)
/// accepts.
#[derive(Clone)]
pub struct JwtEncoder {
    /// HMAC secret key for signing.
    encoding_key: EncodingKey,
    /// Token TTL in minutes.
    ttl_minutes: i64,
}

impl std::fmt::Debug for JwtEncoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtEncoder")
            .field("ttl_minutes", &self.ttl_minutes)
            .finish()
    }
}

/// A freshly issued token.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct IssuedToken {
    /// Encoded token.
    pub token: String,
    /// Expiration timestamp.
    pub expires_at: DateTime<Utc>,
}

impl JwtEncoder {
    /// Creates a new encoder from auth configuration.
    pub fn new(config: &AuthConfig) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(config.jwt_secret.as_bytes()),
            ttl_minutes: i64::try_from(config.token_ttl_minutes).unwrap_or(i64::MAX),
        }
    }

    /// Overrides the configured TTL.
    pub fn with_ttl_minutes(mut self, ttl_minutes: i64) -> Self {
        self.ttl_minutes = ttl_minutes;
        self
    }

    /// Issues a token for `identity` valid for the configured TTL.
    ///
    /// Fails with a validation error when the TTL does not fit in a timestamp.
    pub fn issue(&self, identity: &Identity) -> Result<IssuedToken, AppError> {
        let expires_at = TimeDelta::try_minutes(self.ttl_minutes)
            .and_then(|ttl| Utc::now().checked_add_signed(ttl))
            .ok_or_else(|| {
                AppError::validation(format!("Token TTL of {} minutes is out of range", self.ttl_minutes))
            })?;
        let token = self.issue_until(identity, expires_at)?;
        Ok(IssuedToken { token, expires_at })
    }

    /// Issues a token for `identity` that expires at `expires_at`.
    pub fn issue_until(
        &self,
        identity: &Identity,
        expires_at: DateTime<Utc>,
    ) -> Result<String, AppError> {
        let claims = Claims {
            sub: Some(identity.to_string()),
            user: Some(SessionUser {
                id: identity.to_string(),
            }),
            iat: Utc::now().timestamp(),
            exp: expires_at.timestamp(),
        };

        encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|e| AppError::internal(format!("Failed to encode token: {e}")))
    }
}
