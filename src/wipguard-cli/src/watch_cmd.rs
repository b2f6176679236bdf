//! Watch command - run both state machines against a repository.
//!
//! Wires the pieces together:
//! - a once-per-second timer feeding the session
//! - commit and rollback detection, polled before each tick
//! - config hot reload
//! - console commands from stdin, and Ctrl+C

use anyhow::{Context, Result};
use clap::Parser;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, info, warn};

use wipguard_core::format::{format_time, initial_change_size_text};
use wipguard_core::{SessionHandle, TimerSource, WipSession};
use wipguard_git::{
    GitChangeSizeProvider, GitCommitDetector, GitRevertAction, RepoEvent, RepoState,
};

use crate::console::{ConsoleCommand, HELP_TEXT, spawn_stdin_reader};
use crate::notifier::LogNotifier;
use crate::reload::ConfigWatcher;
use crate::utils::{load_settings, resolve_repo};

/// Watch CLI.
#[derive(Debug, Parser)]
pub struct WatchCli {
    /// Repository to watch (default: current directory)
    #[arg(long, short = 'r')]
    pub repo: Option<PathBuf>,

    /// Start the auto-revert countdown right away
    #[arg(long)]
    pub start: bool,

    /// Do not read commands from stdin
    #[arg(long)]
    pub no_console: bool,

    /// Do not reload the config file when it changes
    #[arg(long)]
    pub no_reload: bool,
}

impl WatchCli {
    pub async fn run(self, config_path: PathBuf) -> Result<()> {
        let repo = resolve_repo(self.repo)?;
        let (config, settings) = load_settings(&config_path).await?;

        if settings.watchdog_enabled {
            info!("{}", initial_change_size_text(settings.max_lines_in_change));
        }

        let provider = Arc::new(GitChangeSizeProvider::with_config(&repo, &config.git));
        let actions =
            Arc::new(GitRevertAction::new(&repo).remove_untracked(config.git.include_untracked));
        let (session, session_task) =
            WipSession::new(Arc::new(LogNotifier::new()), provider, actions, settings).spawn();

        let detector_repo = repo.clone();
        let include_untracked = config.git.include_untracked;
        let mut detector = tokio::task::spawn_blocking(move || {
            GitCommitDetector::new(detector_repo, include_untracked)
        })
        .await?
        .context("Failed to read repository state")?;

        let (_watcher, mut reloads) = if self.no_reload {
            (None, mpsc::unbounded_channel().1)
        } else {
            match ConfigWatcher::start(&config_path) {
                Ok((watcher, rx)) => (Some(watcher), rx),
                Err(e) => {
                    warn!("Config hot reload disabled: {}", e);
                    (None, mpsc::unbounded_channel().1)
                }
            }
        };

        let mut console = if self.no_console {
            mpsc::unbounded_channel().1
        } else {
            info!("{}", HELP_TEXT);
            spawn_stdin_reader()
        };

        if self.start {
            session.start_auto_revert()?;
        }

        let timer = TimerSource::new();
        let mut ticks = timer.subscribe();
        let ticking = timer.spawn();

        info!(repo = %repo.display(), "Watching");

        let ctrl_c = tokio::signal::ctrl_c();
        tokio::pin!(ctrl_c);

        loop {
            tokio::select! {
                tick = ticks.recv() => match tick {
                    Ok(seconds) => {
                        detector = poll_repo(detector, &repo, &session).await?;
                        session.tick(seconds)?;
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!(skipped, "Timer ticks dropped");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                },
                Some(()) = reloads.recv() => reload(&config_path, &session).await,
                Some(command) = console.recv() => {
                    if command == ConsoleCommand::Quit {
                        break;
                    }
                    apply_console_command(command, &repo, &session).await?;
                }
                _ = &mut ctrl_c => {
                    info!("Interrupted");
                    break;
                }
            }
        }

        ticking.abort();
        session.shutdown()?;
        session_task.await?;
        Ok(())
    }
}

/// Poll for commits and rollbacks on a blocking thread, forwarding what
/// happened to the session. Commits are also recorded in the shared state.
async fn poll_repo(
    mut detector: GitCommitDetector,
    repo: &Path,
    session: &SessionHandle,
) -> Result<GitCommitDetector> {
    let repo = repo.to_path_buf();
    let (detector, event) = tokio::task::spawn_blocking(move || {
        let event = detector.poll();
        if let Ok(Some(RepoEvent::Committed(_))) = event {
            if let Err(e) = RepoState::update(&repo, RepoState::record_commit) {
                warn!("Failed to record commit: {}", e);
            }
        }
        (detector, event)
    })
    .await?;

    match event {
        Ok(Some(RepoEvent::Committed(outcome))) => session.checkin(outcome)?,
        Ok(Some(RepoEvent::RolledBack)) => session.all_changes_rolled_back()?,
        Ok(None) => {}
        Err(e) => warn!("Failed to poll repository: {}", e),
    }
    Ok(detector)
}

/// Push new settings if the edited config is valid.
async fn reload(config_path: &Path, session: &SessionHandle) {
    match load_settings(config_path).await {
        Ok((_, settings)) => {
            info!("Config reloaded");
            if let Err(e) = session.settings(settings) {
                warn!("Failed to apply settings: {}", e);
            }
        }
        Err(e) => warn!("Ignoring config change: {:#}", e),
    }
}

async fn apply_console_command(
    command: ConsoleCommand,
    repo: &Path,
    session: &SessionHandle,
) -> Result<()> {
    debug!(?command, "Console command");
    match command {
        ConsoleCommand::Start => session.start_auto_revert()?,
        ConsoleCommand::Stop => session.stop_auto_revert()?,
        ConsoleCommand::Toggle => session.toggle_auto_revert()?,
        ConsoleCommand::Skip => session.set_suppressed(true)?,
        ConsoleCommand::Unskip => session.set_suppressed(false)?,
        ConsoleCommand::ForceCommit => {
            let repo = repo.to_path_buf();
            tokio::task::spawn_blocking(move || {
                RepoState::update(&repo, |state| state.force_commit = true)
            })
            .await?
            .context("Failed to save force-commit marker")?;
            info!("Next commit is allowed regardless of checks");
        }
        ConsoleCommand::Status => {
            let status = session.status().await?;
            let size = status
                .change_size
                .map(|s| s.to_string())
                .unwrap_or_else(|| "-".to_string());
            info!(
                "Auto-revert: {} ({}), change size: {}/{}{}",
                if status.auto_revert_started { "running" } else { "stopped" },
                format_time(u64::from(status.active_timeout_seconds)),
                size,
                status.settings.max_lines_in_change,
                if status.skip_notifications_until_commit {
                    ", notifications muted until commit"
                } else {
                    ""
                }
            );
        }
        ConsoleCommand::Help => info!("{}", HELP_TEXT),
        ConsoleCommand::Quit => {}
    }
    Ok(())
}
