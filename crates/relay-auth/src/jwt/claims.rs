//! JWT claims carried by session tokens.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use relay_core::types::Identity;

/// JWT claims payload.
///
/// Session issuers put the principal under `user.id`; plain tokens may
/// only carry `sub`. `user.id` wins when both are present.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub: Option<String>,
    /// Session user.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<SessionUser>,
    /// Issued-at timestamp (seconds since epoch).
    #[serde(default)]
    pub iat: i64,
    /// Expiration timestamp (seconds since epoch).
    pub exp: i64,
}

/// The `user` object of a session token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionUser {
    /// Principal ID.
    pub id: String,
}

impl Claims {
    /// Returns the principal named by this token, if any.
    pub fn identity(&self) -> Option<Identity> {
        let present = |id: &&str| !id.trim().is_empty();
        self.user
            .as_ref()
            .map(|u| u.id.as_str())
            .filter(present)
            .or_else(|| self.sub.as_deref().filter(present))
            .map(Identity::from)
    }

    /// Returns the expiration as a `DateTime<Utc>`.
    pub fn expires_at(&self) -> DateTime<Utc> {
        DateTime::from_timestamp(self.exp, 0).unwrap_or_else(Utc::now)
    }
}
