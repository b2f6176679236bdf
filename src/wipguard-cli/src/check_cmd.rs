//! Check-commit command - gate commits on change size and test runs.
//!
//! Meant to run from a git `pre-commit` hook: exits non-zero when the staged
//! change is above the threshold and commits above it are disallowed, or when
//! TCR or Limbo have not seen a passing test run for it.

use anyhow::{Context, Result, bail};
use clap::Parser;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

use wipguard_core::{ChangeSizeWatchdog, Settings, WipConfig};
use wipguard_git::{GitChangeSizeProvider, RepoState};

use crate::notifier::LogNotifier;
use crate::utils::{load_settings, resolve_repo, test_modes};

/// Check-commit CLI.
#[derive(Debug, Parser)]
pub struct CheckCommitCli {
    /// Repository to check (default: current directory)
    #[arg(long, short = 'r')]
    pub repo: Option<PathBuf>,

    /// Allow this commit regardless of its size and test runs
    #[arg(long)]
    pub force: bool,
}

impl CheckCommitCli {
    pub async fn run(self, config_path: PathBuf) -> Result<()> {
        let repo = resolve_repo(self.repo)?;
        let (config, settings) = load_settings(&config_path).await?;
        let force = self.force;

        let allowed =
            tokio::task::spawn_blocking(move || check_commit(&repo, &config, settings, force))
                .await??;
        if !allowed {
            bail!("Commit rejected (use --force or `force-commit` in watch to override)");
        }
        Ok(())
    }
}

/// Run every commit gate against the staged change.
///
/// A force marker left by `watch` counts like `--force` and is used up here.
pub fn check_commit(
    repo: &Path,
    config: &WipConfig,
    settings: Settings,
    force: bool,
) -> Result<bool> {
    let notifier = Arc::new(LogNotifier::new());
    let mut state = RepoState::load(repo).context("Failed to read wipguard state")?;
    let forced = force || std::mem::take(&mut state.force_commit);

    let provider = Arc::new(GitChangeSizeProvider::with_config(repo, &config.git));
    let staged = provider
        .staged_sizes()
        .context("Failed to compute staged change size")?;
    let mut watchdog = ChangeSizeWatchdog::new(notifier.clone(), provider, settings);
    let (mut tcr, mut limbo) = test_modes(repo, config, notifier, &state, None)?;

    if forced {
        info!("Commit forced, skipping checks");
        watchdog.force_commit();
        tcr.force_one_commit();
        limbo.allow_one_commit_without_checks();
    }
    let allowed = watchdog.is_commit_allowed(&staged)
        && tcr.is_commit_allowed().context("Failed to read change list")?
        && limbo.is_commit_allowed();

    state.tcr = tcr.state().clone();
    state.limbo = limbo.state().clone();
    state.save(repo).context("Failed to save wipguard state")?;
    Ok(allowed)
}
