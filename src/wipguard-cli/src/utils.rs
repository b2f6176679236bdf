//! Shared helpers for commands.

use anyhow::{Context, Result, anyhow};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use wipguard_core::{Limbo, NotificationSink, Settings, Tcr, WipConfig};
use wipguard_git::{GitCommitAction, GitRevertAction, RepoState};

/// Explicit `--config` path, or the per-user default.
pub fn resolve_config_path(explicit: Option<PathBuf>) -> Result<PathBuf> {
    match explicit {
        Some(path) => Ok(path),
        None => WipConfig::default_path()
            .ok_or_else(|| anyhow!("Could not determine config directory; pass --config")),
    }
}

/// Repository root containing `dir` (default: current directory).
pub fn resolve_repo(dir: Option<PathBuf>) -> Result<PathBuf> {
    let dir = match dir {
        Some(dir) => dir,
        None => std::env::current_dir().context("Failed to read current directory")?,
    };
    wipguard_git::repo_root(&dir).with_context(|| format!("{} is not in a git repository", dir.display()))
}

/// Load the config file (defaults when missing) and validate it.
pub async fn load_settings(path: &Path) -> Result<(WipConfig, Settings)> {
    let config = WipConfig::load_or_default(path)
        .await
        .with_context(|| format!("Failed to load config from {}", path.display()))?;
    let settings = config
        .to_settings()
        .with_context(|| format!("Invalid config in {}", path.display()))?;
    Ok((config, settings))
}

/// TCR and Limbo for `repo`, picking up where the last process left off.
///
/// `message` overrides `[tcr] commit_message` for TCR commits.
pub fn test_modes(
    repo: &Path,
    config: &WipConfig,
    notifications: Arc<dyn NotificationSink>,
    state: &RepoState,
    message: Option<String>,
) -> Result<(Tcr, Limbo)> {
    let tcr_settings = config.tcr_settings().context("Invalid [tcr] config")?;
    let limbo_settings = config.limbo_settings().context("Invalid [limbo] config")?;

    let include_untracked = config.git.include_untracked;
    let actions = Arc::new(GitRevertAction::new(repo).remove_untracked(include_untracked));
    let commits = Arc::new(
        GitCommitAction::new(repo)
            .include_untracked(include_untracked)
            .message(message.unwrap_or_else(|| config.tcr.commit_message.clone())),
    );

    let tcr = Tcr::new(notifications.clone(), actions.clone(), commits, tcr_settings)
        .with_state(state.tcr.clone());
    let limbo =
        Limbo::new(notifications, actions, limbo_settings).with_state(state.limbo.clone());
    Ok((tcr, limbo))
}
