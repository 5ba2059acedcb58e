//! HS256 JWT verification.

use async_trait::async_trait;
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode, decode_header};

use relay_core::config::AuthConfig;
use relay_core::traits::{CredentialVerifier, VerificationError, VerifiedCredential};

use super::claims::Claims;

/// Verifies HS256-signed session tokens against a shared secret.
#[derive(Clone)]
pub struct JwtVerifier {
    /// HMAC secret key for verification.
    decoding_key: DecodingKey,
    /// Validation configuration.
    validation: Validation,
}

impl std::fmt::Debug for JwtVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtVerifier")
            .field("validation", &self.validation)
            .finish()
    }
}

impl JwtVerifier {
    /// Creates a new verifier from auth configuration.
    pub fn new(config: &AuthConfig) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        validation.leeway = config.leeway_seconds;

        Self {
            decoding_key: DecodingKey::from_secret(config.jwt_secret.as_bytes()),
            validation,
        }
    }

    /// Decodes and validates a token string into its claims.
    ///
    /// Checks, in order:
    /// 1. Header is well-formed and names HS256
    /// 2. Signature validity
    /// 3. Expiration
    pub fn decode_token(&self, token: &str) -> Result<Claims, VerificationError> {
        let header =
            decode_header(token).map_err(|e| VerificationError::Malformed(e.to_string()))?;
        if header.alg != Algorithm::HS256 {
            return Err(VerificationError::UnsupportedAlgorithm(format!(
                "{:?}",
                header.alg
            )));
        }

        let token_data =
            decode::<Claims>(token, &self.decoding_key, &self.validation).map_err(|e| {
                match e.kind() {
                    jsonwebtoken::errors::ErrorKind::ExpiredSignature => {
                        VerificationError::Expired
                    }
                    jsonwebtoken::errors::ErrorKind::InvalidSignature => {
                        VerificationError::InvalidSignature
                    }
                    jsonwebtoken::errors::ErrorKind::InvalidAlgorithm
                    | jsonwebtoken::errors::ErrorKind::InvalidAlgorithmName => {
                        VerificationError::UnsupportedAlgorithm(e.to_string())
                    }
                    _ => VerificationError::Malformed(e.to_string()),
                }
            })?;

        Ok(token_data.claims)
    }
}

#[async_trait]
impl CredentialVerifier for JwtVerifier {
    async fn verify(&self, credential: &str) -> Result<VerifiedCredential, VerificationError> {
        let claims = self.decode_token(credential)?;
        let identity = claims
            .identity()
            .ok_or(VerificationError::MissingIdentity)?;

        Ok(VerifiedCredential {
            identity,
            expires_at: claims.expires_at(),
        })
    }
}
