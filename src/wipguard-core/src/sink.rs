//! Collaborator traits the state machines depend on.
//!
//! Calls into these traits are synchronous and may block for a bounded time.
//! Implementations are shared between threads, so they take `&self`.

use crate::tcr::{ChangeListModifications, TcrAction};
use crate::{ChangeSize, ChangeSizesByPath, PathMatcher, Result, Settings, WipError};

/// Source of the current uncommitted change size.
pub trait ChangeSizeProvider: Send + Sync {
    /// Per-file sizes of the current change list.
    ///
    /// Implementations bound their own running time and return approximate
    /// sizes when the budget runs out.
    fn change_sizes_by_path(&self) -> Result<ChangeSizesByPath>;

    fn current_change_list_size_in_lines(&self) -> Result<ChangeSize> {
        Ok(self.change_sizes_by_path()?.total())
    }
}

/// Performs the destructive revert of the working set.
pub trait ActionSink: Send + Sync {
    /// Returns `true` if anything was reverted. Must be a no-op returning
    /// `false` when there is nothing to revert.
    fn revert_current_change_list(&self) -> Result<bool>;

    /// Revert every changed file except those matched by `keep`, returning
    /// the number of files reverted.
    fn revert_current_change_list_except(&self, keep: &[PathMatcher]) -> Result<usize> {
        if keep.is_empty() {
            return Ok(usize::from(self.revert_current_change_list()?));
        }
        Err(WipError::RevertFailed(
            "this action cannot keep files while reverting".to_string(),
        ))
    }
}

/// Commits on behalf of TCR.
pub trait CommitSink: Send + Sync {
    /// Modification stamps of every file in the current change list.
    fn change_list_modifications(&self) -> Result<ChangeListModifications>;

    /// Commit the current change list. [`TcrAction::AllowCommit`] commits
    /// nothing.
    fn commit(&self, action: TcrAction) -> Result<()>;
}

/// Receives state changes for display.
///
/// Every method defaults to doing nothing so adapters only implement what
/// they render.
#[allow(unused_variables)]
pub trait NotificationSink: Send + Sync {
    fn on_auto_revert_started(&self, seconds_till_revert: u32) {}

    fn on_auto_revert_stopped(&self) {}

    fn on_time_till_revert(&self, seconds_left: u64) {}

    fn on_commit(&self, seconds_till_revert: u32) {}

    /// The countdown was reset because everything was rolled back by hand.
    fn on_rollback(&self, seconds_till_revert: u32) {}

    fn on_changes_revert(&self) {}

    fn on_change_size_too_big(&self, size: ChangeSize, threshold: u32) {}

    /// Size dropped back under the threshold after an alert.
    fn on_change_size_within_limit(&self) {}

    fn current_change_list_size(&self, size: ChangeSize, threshold: u32) {}

    fn on_skip_notification_until_commit(&self, skip: bool) {}

    fn on_commit_cancelled(&self, size: ChangeSize, threshold: u32) {}

    /// A commit was refused because no passing test run covers it.
    fn on_untested_commit_cancelled(&self) {}

    /// A test run passed and TCR committed with `action`.
    fn on_tcr_commit(&self, action: TcrAction) {}

    /// Called once per settings push, before either machine sees it.
    fn on_settings_update(&self, settings: &Settings) {}
}

/// Sink that drops everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopSink;

impl NotificationSink for NoopSink {}
