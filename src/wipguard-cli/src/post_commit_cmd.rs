//! Post-commit command - record a commit for TCR, Limbo and the force marker.
//!
//! Meant to run from a git `post-commit` hook when `watch` is not running.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tracing::debug;

use wipguard_git::RepoState;

use crate::utils::resolve_repo;

/// Post-commit CLI.
#[derive(Debug, Parser)]
pub struct PostCommitCli {
    /// Repository that was committed to (default: current directory)
    #[arg(long, short = 'r')]
    pub repo: Option<PathBuf>,
}

impl PostCommitCli {
    pub async fn run(self) -> Result<()> {
        let repo = resolve_repo(self.repo)?;
        tokio::task::spawn_blocking(move || RepoState::update(&repo, RepoState::record_commit))
            .await?
            .context("Failed to update wipguard state")?;
        debug!("Commit recorded");
        Ok(())
    }
}
