//! CLI command definitions and dispatch.

pub mod config;
pub mod presence;
pub mod serve;
pub mod token;

use clap::{Parser, Subcommand};

use crate::output::OutputFormat;
use relay_core::config::AppConfig;
use relay_core::error::AppError;

/// Presence relay: real-time presence and message gateway
#[derive(Debug, Parser)]
#[command(name = "relay", version, about, long_about = None)]
pub struct Cli {
    /// Base configuration file (extension optional)
    #[arg(short, long, default_value = "config/default")]
    pub config: String,

    /// Environment overlay, loaded from `config/{env}`
    #[arg(short, long, env = "RELAY_ENV", default_value = "development")]
    pub env: String,

    /// Output format
    #[arg(short, long, value_enum, default_value = "table")]
    pub format: OutputFormat,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level commands
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Start the relay server
    Serve(serve::ServeArgs),
    /// Issue and inspect access tokens
    Token(token::TokenArgs),
    /// Configuration management
    Config(config::ConfigArgs),
    /// Query a running relay for online identities
    Presence(presence::PresenceArgs),
}

impl Cli {
    /// Execute the CLI command
    pub async fn execute(&self) -> Result<(), AppError> {
        let app_config = load_config(&self.config, &self.env)?;
        match &self.command {
            Commands::Serve(args) => serve::execute(args, app_config).await,
            Commands::Token(args) => token::execute(args, &app_config, self.format).await,
            Commands::Config(args) => {
                config::execute(args, &app_config, &self.config, self.format)
            }
            Commands::Presence(args) => presence::execute(args, &app_config, self.format).await,
        }
    }
}

/// Helper: load configuration from the base file, overlay, and environment
pub fn load_config(base: &str, env: &str) -> Result<AppConfig, AppError> {
    AppConfig::load_from(base, env)
}
