//! Single-writer session actor.
//!
//! [`WipSession`] owns both state machines. Timer ticks, settings pushes,
//! commit events and user toggles arrive as [`SessionCommand`] messages on one
//! queue and are applied one at a time on a blocking thread, so collaborator
//! calls may block without stalling the async runtime.

use crate::{
    ActionSink, AutoRevert, ChangeSize, ChangeSizeProvider, ChangeSizeWatchdog, ChangeSizesByPath,
    NotificationSink, Result, Settings, WipError,
};

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Result of a commit, as seen by the commit detector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckinOutcome {
    pub remaining_uncommitted_files: usize,
}

impl CheckinOutcome {
    pub fn new(remaining_uncommitted_files: usize) -> Self {
        Self {
            remaining_uncommitted_files,
        }
    }

    pub fn all_files_committed(&self) -> bool {
        self.remaining_uncommitted_files == 0
    }
}

/// Snapshot of the session for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionStatus {
    pub auto_revert_started: bool,
    /// Timeout of the countdown in progress, which may differ from settings.
    pub active_timeout_seconds: u32,
    pub skip_notifications_until_commit: bool,
    /// `None` when the size could not be computed.
    pub change_size: Option<ChangeSize>,
    pub settings: Settings,
}

#[derive(Debug)]
pub enum SessionCommand {
    Tick(u64),
    Settings(Settings),
    Checkin(CheckinOutcome),
    AllChangesRolledBack,
    StartAutoRevert,
    StopAutoRevert,
    ToggleAutoRevert,
    SetSuppressed(bool),
    ToggleSuppressed,
    ForceCommit,
    IsCommitAllowed(ChangeSizesByPath, oneshot::Sender<bool>),
    Status(oneshot::Sender<SessionStatus>),
    Shutdown,
}

pub struct WipSession {
    notifications: Arc<dyn NotificationSink>,
    auto_revert: AutoRevert,
    watchdog: ChangeSizeWatchdog,
}

impl WipSession {
    pub fn new(
        notifications: Arc<dyn NotificationSink>,
        provider: Arc<dyn ChangeSizeProvider>,
        actions: Arc<dyn ActionSink>,
        settings: Settings,
    ) -> Self {
        notifications.on_settings_update(&settings);
        Self {
            auto_revert: AutoRevert::new(notifications.clone(), actions, settings.clone()),
            watchdog: ChangeSizeWatchdog::new(notifications.clone(), provider, settings),
            notifications,
        }
    }

    pub fn auto_revert(&self) -> &AutoRevert {
        &self.auto_revert
    }

    pub fn watchdog(&self) -> &ChangeSizeWatchdog {
        &self.watchdog
    }

    /// Apply one command. Errors come from collaborators; the session stays
    /// usable after any of them.
    pub fn handle(&mut self, command: SessionCommand) -> Result<()> {
        match command {
            SessionCommand::Tick(seconds) => {
                let reverted = self.auto_revert.on_timer(seconds);
                let watched = self.watchdog.on_timer(seconds);
                reverted.and(watched)?;
            }
            SessionCommand::Settings(settings) => {
                self.notifications.on_settings_update(&settings);
                self.auto_revert.on_settings(settings.clone());
                self.watchdog.on_settings(settings);
            }
            SessionCommand::Checkin(outcome) => {
                if outcome.all_files_committed() {
                    self.auto_revert.on_all_files_committed();
                    self.watchdog.on_commit();
                } else {
                    debug!(
                        remaining = outcome.remaining_uncommitted_files,
                        "Partial commit, timers left running"
                    );
                }
            }
            SessionCommand::AllChangesRolledBack => self.auto_revert.on_all_changes_rolled_back(),
            SessionCommand::StartAutoRevert => self.auto_revert.start(),
            SessionCommand::StopAutoRevert => self.auto_revert.stop(),
            SessionCommand::ToggleAutoRevert => self.auto_revert.toggle(),
            SessionCommand::SetSuppressed(suppressed) => self.watchdog.set_suppressed(suppressed),
            SessionCommand::ToggleSuppressed => self.watchdog.toggle_suppressed(),
            SessionCommand::ForceCommit => self.watchdog.force_commit(),
            SessionCommand::IsCommitAllowed(sizes, reply) => {
                let _ = reply.send(self.watchdog.is_commit_allowed(&sizes));
            }
            SessionCommand::Status(reply) => {
                let _ = reply.send(self.status());
            }
            SessionCommand::Shutdown => {}
        }
        Ok(())
    }

    pub fn status(&self) -> SessionStatus {
        let change_size = match self.watchdog.current_size() {
            Ok(size) => Some(size),
            Err(e) => {
                warn!("Change size unavailable: {}", e);
                None
            }
        };
        SessionStatus {
            auto_revert_started: self.auto_revert.is_started(),
            active_timeout_seconds: self.auto_revert.active_timeout_seconds(),
            skip_notifications_until_commit: self.watchdog.is_suppressed(),
            change_size,
            settings: self.watchdog.settings().clone(),
        }
    }

    /// Process commands until [`SessionCommand::Shutdown`] or until every
    /// handle is dropped. Blocks the calling thread.
    pub fn run(mut self, mut rx: mpsc::UnboundedReceiver<SessionCommand>) {
        while let Some(command) = rx.blocking_recv() {
            if matches!(command, SessionCommand::Shutdown) {
                break;
            }
            if let Err(e) = self.handle(command) {
                warn!("Session command failed: {}", e);
            }
        }
        info!("Session stopped");
    }

    /// Run the session on a blocking thread.
    pub fn spawn(self) -> (SessionHandle, JoinHandle<()>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let handle = tokio::task::spawn_blocking(move || self.run(rx));
        (SessionHandle { tx }, handle)
    }
}

/// Cloneable sender side of a running session.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    tx: mpsc::UnboundedSender<SessionCommand>,
}

impl SessionHandle {
    pub fn send(&self, command: SessionCommand) -> Result<()> {
        self.tx.send(command).map_err(|_| WipError::SessionClosed)
    }

    pub fn tick(&self, seconds: u64) -> Result<()> {
        self.send(SessionCommand::Tick(seconds))
    }

    pub fn settings(&self, settings: Settings) -> Result<()> {
        self.send(SessionCommand::Settings(settings))
    }

    pub fn checkin(&self, outcome: CheckinOutcome) -> Result<()> {
        self.send(SessionCommand::Checkin(outcome))
    }

    pub fn all_changes_rolled_back(&self) -> Result<()> {
        self.send(SessionCommand::AllChangesRolledBack)
    }

    pub fn start_auto_revert(&self) -> Result<()> {
        self.send(SessionCommand::StartAutoRevert)
    }

    pub fn stop_auto_revert(&self) -> Result<()> {
        self.send(SessionCommand::StopAutoRevert)
    }

    pub fn toggle_auto_revert(&self) -> Result<()> {
        self.send(SessionCommand::ToggleAutoRevert)
    }

    pub fn set_suppressed(&self, suppressed: bool) -> Result<()> {
        self.send(SessionCommand::SetSuppressed(suppressed))
    }

    pub fn toggle_suppressed(&self) -> Result<()> {
        self.send(SessionCommand::ToggleSuppressed)
    }

    pub fn force_commit(&self) -> Result<()> {
        self.send(SessionCommand::ForceCommit)
    }

    pub async fn is_commit_allowed(&self, sizes: ChangeSizesByPath) -> Result<bool> {
        let (reply, rx) = oneshot::channel();
        self.send(SessionCommand::IsCommitAllowed(sizes, reply))?;
        rx.await.map_err(|_| WipError::SessionClosed)
    }

    pub async fn status(&self) -> Result<SessionStatus> {
        let (reply, rx) = oneshot::channel();
        self.send(SessionCommand::Status(reply))?;
        rx.await.map_err(|_| WipError::SessionClosed)
    }

    pub fn shutdown(&self) -> Result<()> {
        self.send(SessionCommand::Shutdown)
    }

    /// Forward timer ticks into the session until either side closes.
    pub fn forward_ticks(&self, mut ticks: broadcast::Receiver<u64>) -> JoinHandle<()> {
        let session = self.clone();
        tokio::spawn(async move {
            loop {
                match ticks.recv().await {
                    Ok(seconds) => {
                        if session.tick(seconds).is_err() {
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!(skipped, "Session fell behind the timer");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        })
    }
}
