//! `AuthIdentity` extractor. Pulls a bearer token from the Authorization
//! header and verifies it with the shared credential verifier.

use std::time::Duration;

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use tracing::warn;

use relay_core::error::AppError;
use relay_core::types::Identity;

use crate::error::ApiError;
use crate::state::AppState;

use super::credential::bearer_token;

/// Identity of an authenticated HTTP caller.
#[derive(Debug, Clone)]
pub struct AuthIdentity(pub Identity);

impl FromRequestParts<AppState> for AuthIdentity {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(&parts.headers)
            .ok_or_else(|| AppError::authentication("Missing credentials"))?;

        let timeout = Duration::from_millis(state.config.auth.verify_timeout_ms);
        let verified = match tokio::time::timeout(timeout, state.verifier.verify(&token)).await {
            Ok(Ok(verified)) => verified,
            Ok(Err(reason)) => {
                warn!(reason = %reason, "HTTP request rejected: authentication failed");
                return Err(AppError::authentication("Authentication failed").into());
            }
            Err(_) => {
                warn!(
                    timeout_ms = state.config.auth.verify_timeout_ms,
                    "HTTP request rejected: credential verification timed out"
                );
                return Err(AppError::authentication("Authentication failed").into());
            }
        };

        Ok(AuthIdentity(verified.identity))
    }
}
