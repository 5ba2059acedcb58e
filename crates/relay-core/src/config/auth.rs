//! Authentication configuration.

use serde::{Deserialize, Serialize};

use super::INSECURE_DEFAULT_SECRET;

/// Credential verification configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Secret key for JWT verification (HMAC-SHA256).
    #[serde(default = "default_jwt_secret")]
    pub jwt_secret: String,
    /// Allowed clock skew in seconds when checking `exp`.
    #[serde(default)]
    pub leeway_seconds: u64,
    /// Upper bound on a single credential verification, in milliseconds.
    #[serde(default = "default_verify_timeout")]
    pub verify_timeout_ms: u64,
    /// Lifetime of tokens minted by `relay-cli token issue`, in minutes.
    #[serde(default = "default_token_ttl")]
    pub token_ttl_minutes: u64,
    /// Where the gate reads the credential from on the upgrade request.
    #[serde(default)]
    pub credential_source: CredentialSource,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: default_jwt_secret(),
            leeway_seconds: 0,
            verify_timeout_ms: default_verify_timeout(),
            token_ttl_minutes: default_token_ttl(),
            credential_source: CredentialSource::default(),
        }
    }
}

/// The single credential extraction strategy used by a deployment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CredentialSource {
    /// A request header. A leading `Bearer ` is stripped.
    Header {
        /// Header name.
        #[serde(default = "default_header_name")]
        name: String,
    },
    /// A query string parameter on the upgrade URL.
    Query {
        /// Parameter name.
        #[serde(default = "default_query_name")]
        name: String,
    },
    /// A cookie sent with the upgrade request.
    Cookie {
        /// Cookie name.
        #[serde(default = "default_cookie_name")]
        name: String,
    },
}

impl Default for CredentialSource {
    fn default() -> Self {
        Self::Header {
            name: default_header_name(),
        }
    }
}

impl std::fmt::Display for CredentialSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Header { name } => write!(f, "header:{name}"),
            Self::Query { name } => write!(f, "query:{name}"),
            Self::Cookie { name } => write!(f, "cookie:{name}"),
        }
    }
}

fn default_jwt_secret() -> String {
    INSECURE_DEFAULT_SECRET.to_string()
}

fn default_verify_timeout() -> u64 {
    5000
}

fn default_token_ttl() -> u64 {
    60
}

fn default_header_name() -> String {
    "authorization".to_string()
}

fn default_query_name() -> String {
    "token".to_string()
}

fn default_cookie_name() -> String {
    "authjs.session-token".to_string()
}
