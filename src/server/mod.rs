//! Command-line orchestration for the `forumd` binary.
//!
//! This module exposes the command-line interface and the dispatch logic so
//! the binary stays a thin wrapper that only needs to call [`run`].

pub mod admin;
pub mod cli;

use anyhow::{Context, Result};
use clap::Parser;
pub use cli::{AppConfig, Cli, Commands, CreateUserArgs};
use tracing::info;

pub use self::admin::run_command;
use crate::service::ForumService;

/// Parse CLI arguments and execute the requested command.
///
/// # Errors
///
/// Returns any error emitted while parsing configuration, opening the
/// store, or running the command.
pub async fn run() -> Result<()> {
    let cli = Cli::parse();
    run_with_cli(cli).await
}

/// Execute the requested command using an already parsed [`Cli`].
///
/// Without a subcommand the store is opened, which applies any pending
/// migrations, and its status is printed.
///
/// # Errors
///
/// Propagates any failure reported while opening the store or running the
/// command.
pub async fn run_with_cli(cli: Cli) -> Result<()> {
    let Cli { config, command } = cli;
    let service = ForumService::open(&config.database, config.pool_size)
        .await
        .with_context(|| format!("failed to open database '{}'", config.database))?;
    let command = command.unwrap_or_else(|| {
        info!("no command given; reporting status");
        Commands::Status
    });
    run_command(command, &service).await
}
