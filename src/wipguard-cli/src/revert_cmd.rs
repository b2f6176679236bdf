//! Revert command - discard all uncommitted changes once.

use anyhow::{Context, Result, bail};
use clap::Parser;
use std::path::PathBuf;

use wipguard_git::GitRevertAction;

use crate::utils::{load_settings, resolve_repo};

/// Revert CLI.
#[derive(Debug, Parser)]
pub struct RevertCli {
    /// Repository to revert (default: current directory)
    #[arg(long, short = 'r')]
    pub repo: Option<PathBuf>,

    /// Confirm that uncommitted changes should be discarded
    #[arg(long, short = 'y')]
    pub yes: bool,
}

impl RevertCli {
    pub async fn run(self, config_path: PathBuf) -> Result<()> {
        if !self.yes {
            bail!("Refusing to discard uncommitted changes without --yes");
        }
        let repo = resolve_repo(self.repo)?;
        let (config, _) = load_settings(&config_path).await?;

        let action = GitRevertAction::new(&repo).remove_untracked(config.git.include_untracked);
        let reverted = tokio::task::spawn_blocking(move || action.revert())
            .await?
            .context("Failed to revert changes")?;

        if reverted == 0 {
            println!("Nothing to revert.");
        } else {
            println!("Reverted {} file(s) in {}", reverted, repo.display());
        }
        Ok(())
    }
}
