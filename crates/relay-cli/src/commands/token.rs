//! Access token commands.
//!
//! Tokens are signed with the configured secret, so anything issued here is
//! accepted by a relay running with the same configuration.

use clap::{Args, Subcommand};
use serde::Serialize;

use relay_auth::{JwtEncoder, JwtVerifier};
use relay_core::config::AppConfig;
use relay_core::error::AppError;
use relay_core::traits::CredentialVerifier;
use relay_core::types::Identity;

use crate::output::{self, OutputFormat};

/// Arguments for token commands
#[derive(Debug, Args)]
pub struct TokenArgs {
    /// Token subcommand
    #[command(subcommand)]
    pub command: TokenCommand,
}

/// Token subcommands
#[derive(Debug, Subcommand)]
pub enum TokenCommand {
    /// Issue a token for an identity
    Issue {
        /// Identity to embed in the token
        #[arg(short, long)]
        identity: String,
        /// Lifetime in minutes (defaults to auth.token_ttl_minutes)
        #[arg(long)]
        ttl_minutes: Option<i64>,
    },
    /// Verify a token and show the identity it carries
    Verify {
        /// The token to verify
        token: String,
    },
}

#[derive(Debug, Serialize)]
struct TokenOutput {
    identity: String,
    token: String,
    expires_at: String,
}

#[derive(Debug, Serialize)]
struct VerifyOutput {
    identity: String,
    expires_at: String,
}

/// Execute token commands
pub async fn execute(
    args: &TokenArgs,
    config: &AppConfig,
    format: OutputFormat,
) -> Result<(), AppError> {
    match &args.command {
        TokenCommand::Issue {
            identity,
            ttl_minutes,
        } => {
            let identity = Identity::new(identity.trim());
            if identity.is_empty() {
                return Err(AppError::validation("Identity must not be empty"));
            }
            if ttl_minutes.is_some_and(|ttl| ttl <= 0) {
                return Err(AppError::validation("--ttl-minutes must be positive"));
            }

            let mut encoder = JwtEncoder::new(&config.auth);
            if let Some(ttl) = ttl_minutes {
                encoder = encoder.with_ttl_minutes(*ttl);
            }
            let issued = encoder.issue(&identity)?;

            match format {
                OutputFormat::Json => output::print_item(
                    &TokenOutput {
                        identity: identity.to_string(),
                        token: issued.token,
                        expires_at: issued.expires_at.to_rfc3339(),
                    },
                    format,
                ),
                OutputFormat::Table => {
                    output::print_success(&format!("Token issued for '{}'", identity));
                    output::print_kv("Expires", &issued.expires_at.to_rfc3339());
                    println!("{}", issued.token);
                }
            }
        }
        TokenCommand::Verify { token } => {
            let verifier = JwtVerifier::new(&config.auth);
            match verifier.verify(token.trim()).await {
                Ok(verified) => match format {
                    OutputFormat::Json => output::print_item(
                        &VerifyOutput {
                            identity: verified.identity.to_string(),
                            expires_at: verified.expires_at.to_rfc3339(),
                        },
                        format,
                    ),
                    OutputFormat::Table => {
                        output::print_success("Token is valid");
                        output::print_kv("Identity", verified.identity.as_str());
                        output::print_kv("Expires", &verified.expires_at.to_rfc3339());
                    }
                },
                Err(reason) => {
                    return Err(AppError::authentication(format!(
                        "Token rejected: {}",
                        reason
                    )));
                }
            }
        }
    }

    Ok(())
}
