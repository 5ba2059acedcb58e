//! Query a running relay for online identities.

use clap::Args;
use serde::Serialize;
use tabled::Tabled;

use relay_api::dto::response::{ApiResponse, PresenceResponse};
use relay_auth::JwtEncoder;
use relay_core::config::AppConfig;
use relay_core::error::AppError;
use relay_core::types::Identity;

use crate::output::{self, OutputFormat};

/// Arguments for the presence command
#[derive(Debug, Args)]
pub struct PresenceArgs {
    /// Base URL of the relay (defaults to the configured listen address)
    #[arg(long)]
    pub url: Option<String>,

    /// Identity to authenticate as
    #[arg(long = "as", default_value = "relay-cli")]
    pub as_identity: String,
}

#[derive(Debug, Serialize, Tabled)]
struct PresenceRow {
    identity: String,
}

/// Execute the presence command
pub async fn execute(
    args: &PresenceArgs,
    config: &AppConfig,
    format: OutputFormat,
) -> Result<(), AppError> {
    let base = args.url.clone().unwrap_or_else(|| default_url(config));
    let token = JwtEncoder::new(&config.auth)
        .with_ttl_minutes(1)
        .issue(&Identity::new(args.as_identity.as_str()))?
        .token;

    let url = format!("{}/api/presence", base.trim_end_matches('/'));
    let response = reqwest::Client::new()
        .get(&url)
        .bearer_auth(token)
        .send()
        .await
        .map_err(|e| AppError::service_unavailable(format!("Request to {} failed: {}", url, e)))?;

    if !response.status().is_success() {
        return Err(AppError::service_unavailable(format!(
            "Relay answered {} for {}",
            response.status(),
            url
        )));
    }

    let body: ApiResponse<PresenceResponse> = response
        .json()
        .await
        .map_err(|e| AppError::internal(format!("Invalid presence response: {}", e)))?;

    let rows: Vec<PresenceRow> = body
        .data
        .online
        .into_iter()
        .map(|identity| PresenceRow {
            identity: identity.to_string(),
        })
        .collect();
    output::print_list(&rows, format);
    Ok(())
}

/// Listen address as a URL, with a wildcard host replaced by loopback.
fn default_url(config: &AppConfig) -> String {
    let host = match config.server.host.as_str() {
        "0.0.0.0" | "::" | "[::]" => "127.0.0.1",
        other => other,
    };
    format!("http://{}:{}", host, config.server.port)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_url_uses_loopback_for_wildcard() {
        let config = AppConfig::default();
        assert_eq!(default_url(&config), "http://127.0.0.1:5000");

        let mut config = AppConfig::default();
        config.server.host = "relay.internal".to_string();
        config.server.port = 8080;
        assert_eq!(default_url(&config), "http://relay.internal:8080");
    }
}
