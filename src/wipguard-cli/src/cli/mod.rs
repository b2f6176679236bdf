//! CLI argument parsing and command dispatch.

pub mod args;

pub use args::{Cli, Commands, LogLevel};

use anyhow::Result;

use crate::utils::resolve_config_path;

/// Dispatch a CLI command to its handler.
pub async fn dispatch_command(cli: Cli) -> Result<()> {
    let config_path = resolve_config_path(cli.config)?;
    match cli.command {
        Commands::Watch(watch_cli) => watch_cli.run(config_path).await,
        Commands::Status(status_cli) => status_cli.run(config_path).await,
        Commands::Revert(revert_cli) => revert_cli.run(config_path).await,
        Commands::CheckCommit(check_cli) => check_cli.run(config_path).await,
        Commands::Test(test_cli) => test_cli.run(config_path).await,
        Commands::PostCommit(post_commit_cli) => post_commit_cli.run().await,
        Commands::Config(config_cli) => config_cli.run(config_path).await,
    }
}
