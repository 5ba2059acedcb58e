//! Application configuration schemas.
//!
//! All configuration structs are deserialized via the `config` crate from
//! an optional TOML base file, an optional environment overlay, and
//! environment variables prefixed with `RELAY__`. Every section carries
//! serde defaults so an empty environment yields a runnable development
//! configuration.

pub mod app;
pub mod auth;
pub mod logging;
pub mod realtime;

use serde::{Deserialize, Serialize};

pub use self::app::{CorsConfig, ServerConfig};
pub use self::auth::{AuthConfig, CredentialSource};
pub use self::logging::LoggingConfig;
pub use self::realtime::RealtimeConfig;

use crate::error::AppError;

/// Secret shipped in the defaults; refused by [`AppConfig::validate`].
pub const INSECURE_DEFAULT_SECRET: &str = "CHANGE_ME_IN_PRODUCTION";

/// Upper bound on the ping interval and ping timeout, in seconds.
pub const MAX_HEARTBEAT_SECONDS: u64 = 24 * 60 * 60;

/// Root application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// HTTP server settings.
    #[serde(default)]
    pub server: ServerConfig,
    /// Credential verification settings.
    #[serde(default)]
    pub auth: AuthConfig,
    /// Real-time gateway settings.
    #[serde(default)]
    pub realtime: RealtimeConfig,
    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load configuration from `config/default.toml`, the `config/{env}.toml`
    /// overlay, and `RELAY__*` environment variables.
    pub fn load(env: &str) -> Result<Self, AppError> {
        Self::load_from("config/default", env)
    }

    /// Load configuration using `base` as the base file (extension optional).
    pub fn load_from(base: &str, env: &str) -> Result<Self, AppError> {
        let config = config::Config::builder()
            .add_source(config::File::with_name(base).required(false))
            .add_source(config::File::with_name(&format!("config/{env}")).required(false))
            .add_source(
                config::Environment::with_prefix("RELAY")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("realtime.allowed_origins")
                    .with_list_parse_key("server.cors.allowed_origins")
                    .with_list_parse_key("server.cors.allowed_methods")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| AppError::configuration(format!("Failed to build config: {e}")))?;

        config
            .try_deserialize()
            .map_err(|e| AppError::configuration(format!("Failed to deserialize config: {e}")))
    }

    /// Rejects configurations that cannot run safely.
    pub fn validate(&self) -> Result<(), AppError> {
        if self.auth.jwt_secret.trim().is_empty() {
            return Err(AppError::configuration("auth.jwt_secret must not be empty"));
        }
        if self.auth.jwt_secret == INSECURE_DEFAULT_SECRET {
            return Err(AppError::configuration(
                "auth.jwt_secret still has the shipped default value",
            ));
        }
        if self.realtime.channel_buffer_size == 0 {
            return Err(AppError::configuration(
                "realtime.channel_buffer_size must be greater than zero",
            ));
        }
        if self.realtime.ping_interval_seconds > MAX_HEARTBEAT_SECONDS
            || self.realtime.ping_timeout_seconds > MAX_HEARTBEAT_SECONDS
        {
            return Err(AppError::configuration(format!(
                "realtime heartbeat settings must not exceed {MAX_HEARTBEAT_SECONDS} seconds"
            )));
        }
        if self.realtime.ping_timeout_seconds < self.realtime.ping_interval_seconds {
            return Err(AppError::configuration(
                "realtime.ping_timeout_seconds must not be shorter than ping_interval_seconds",
            ));
        }
        if self.auth.verify_timeout_ms == 0 {
            return Err(AppError::configuration(
                "auth.verify_timeout_ms must be greater than zero",
            ));
        }
        Ok(())
    }
}
