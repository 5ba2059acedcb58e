//! Configuration management CLI commands.

use clap::{Args, Subcommand};

use crate::output::{self, OutputFormat};
use relay_core::config::AppConfig;
use relay_core::error::AppError;

/// Arguments for config commands
#[derive(Debug, Args)]
pub struct ConfigArgs {
    /// Config subcommand
    #[command(subcommand)]
    pub command: ConfigCommand,
}

/// Config subcommands
#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Show the effective configuration (secret masked)
    Show,
    /// Validate the effective configuration
    Validate,
}

/// Execute config commands
pub fn execute(
    args: &ConfigArgs,
    config: &AppConfig,
    config_path: &str,
    format: OutputFormat,
) -> Result<(), AppError> {
    match &args.command {
        ConfigCommand::Show => {
            let mut shown = config.clone();
            shown.auth.jwt_secret = mask_secret(&shown.auth.jwt_secret);
            output::print_item(&shown, format);
        }
        ConfigCommand::Validate => match config.validate() {
            Ok(()) => {
                output::print_success(&format!("Configuration '{}' is valid", config_path));
                output::print_kv("Listen", &config.server.bind_address());
                output::print_kv("Credential source", &config.auth.credential_source.to_string());
                output::print_kv(
                    "Allowed origins",
                    &origins_summary(&config.realtime.allowed_origins),
                );
                output::print_kv(
                    "Heartbeat",
                    &format!(
                        "ping every {}s, timeout {}s",
                        config.realtime.ping_interval_seconds, config.realtime.ping_timeout_seconds
                    ),
                );
            }
            Err(e) => {
                output::print_error(&format!("Configuration invalid: {}", e.message));
                return Err(e);
            }
        },
    }

    Ok(())
}

fn mask_secret(secret: &str) -> String {
    if secret.is_empty() {
        String::new()
    } else {
        "****".to_string()
    }
}

fn origins_summary(origins: &[String]) -> String {
    if origins.is_empty() {
        "any (open policy)".to_string()
    } else {
        origins.join(", ")
    }
}
