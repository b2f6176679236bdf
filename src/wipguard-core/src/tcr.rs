//! Test && commit || revert.
//!
//! A passing test run commits the change list, a failing one reverts it.
//! With [`TcrAction::AllowCommit`] nothing is committed automatically, but a
//! commit is only allowed when the change list is exactly the one the last
//! passing run saw.

use crate::{ActionSink, CommitSink, NotificationSink, PathMatcher, Result};

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// What to do with the change list after a passing test run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TcrAction {
    /// Leave the commit to the user; it is allowed while nothing changes.
    AllowCommit,
    #[default]
    Commit,
    AmendCommit,
    CommitAndPush,
}

impl fmt::Display for TcrAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TcrAction::AllowCommit => write!(f, "allow-commit"),
            TcrAction::Commit => write!(f, "commit"),
            TcrAction::AmendCommit => write!(f, "amend-commit"),
            TcrAction::CommitAndPush => write!(f, "commit-and-push"),
        }
    }
}

/// Modification stamp per changed path.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChangeListModifications(BTreeMap<String, u64>);

impl ChangeListModifications {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, path: impl Into<String>, stamp: u64) {
        self.0.insert(path.into(), stamp);
    }

    pub fn with(mut self, path: impl Into<String>, stamp: u64) -> Self {
        self.insert(path, stamp);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }
}

impl FromIterator<(String, u64)> for ChangeListModifications {
    fn from_iter<I: IntoIterator<Item = (String, u64)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TcrSettings {
    pub enabled: bool,
    pub notify_on_revert: bool,
    pub action_on_passed_test: TcrAction,
    /// Keep files matching `test_patterns` when reverting.
    pub do_not_revert_tests: bool,
    pub test_patterns: Vec<String>,
    /// Files that are never reverted.
    pub do_not_revert_files: Vec<String>,
}

impl TcrSettings {
    /// Patterns for files kept on revert.
    pub fn keep_matchers(&self) -> Result<Vec<PathMatcher>> {
        let tests = self
            .test_patterns
            .iter()
            .filter(|_| self.do_not_revert_tests);
        self.do_not_revert_files
            .iter()
            .chain(tests)
            .map(|p| PathMatcher::parse(p))
            .collect()
    }
}

impl Default for TcrSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            notify_on_revert: false,
            action_on_passed_test: TcrAction::Commit,
            do_not_revert_tests: false,
            test_patterns: default_test_patterns(),
            do_not_revert_files: Vec::new(),
        }
    }
}

/// File patterns that usually hold tests.
pub fn default_test_patterns() -> Vec<String> {
    [
        "*Test.*",
        "*Tests.*",
        "*_test.*",
        "*_tests.*",
        "test_*.*",
        "*.test.*",
        "*.spec.*",
        "**/tests/**/*",
        "**/test/**/*",
    ]
    .iter()
    .map(|p| p.to_string())
    .collect()
}

/// TCR state that outlives a single process.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TcrState {
    #[serde(default)]
    pub allowed_to_commit: bool,
    #[serde(default)]
    pub tested_modifications: Option<ChangeListModifications>,
}

impl TcrState {
    pub fn on_successful_commit(&mut self) {
        self.allowed_to_commit = false;
    }
}

pub struct Tcr {
    notifications: Arc<dyn NotificationSink>,
    actions: Arc<dyn ActionSink>,
    commits: Arc<dyn CommitSink>,
    settings: TcrSettings,
    keep: Vec<PathMatcher>,
    state: TcrState,
    forced: bool,
}

impl Tcr {
    pub fn new(
        notifications: Arc<dyn NotificationSink>,
        actions: Arc<dyn ActionSink>,
        commits: Arc<dyn CommitSink>,
        settings: TcrSettings,
    ) -> Self {
        let mut tcr = Self {
            notifications,
            actions,
            commits,
            settings: TcrSettings::default(),
            keep: Vec::new(),
            state: TcrState::default(),
            forced: false,
        };
        tcr.on_settings(settings);
        tcr
    }

    pub fn with_state(mut self, state: TcrState) -> Self {
        self.state = state;
        self
    }

    pub fn state(&self) -> &TcrState {
        &self.state
    }

    pub fn settings(&self) -> &TcrSettings {
        &self.settings
    }

    /// Returns whether a commit was made.
    pub fn on_unit_test_succeeded(&mut self) -> Result<bool> {
        if !self.settings.enabled {
            return Ok(false);
        }
        let modifications = self.commits.change_list_modifications()?;
        let has_changes = !modifications.is_empty();
        self.state.allowed_to_commit = true;
        self.state.tested_modifications = Some(modifications);

        let action = self.settings.action_on_passed_test;
        if !has_changes || action == TcrAction::AllowCommit {
            debug!(has_changes, %action, "Tests passed, nothing to commit");
            return Ok(false);
        }
        self.commits.commit(action)?;
        debug!(%action, "Committed after passing tests");
        self.notifications.on_tcr_commit(action);
        self.on_successful_commit();
        Ok(true)
    }

    pub fn on_unit_test_failed(&mut self) -> Result<()> {
        if !self.settings.enabled {
            return Ok(());
        }
        self.state.allowed_to_commit = false;
        let reverted = self.actions.revert_current_change_list_except(&self.keep)?;
        info!(reverted, "Tests failed, change list reverted");
        if reverted > 0 && self.settings.notify_on_revert {
            self.notifications.on_changes_revert();
        }
        Ok(())
    }

    pub fn force_one_commit(&mut self) {
        self.forced = true;
    }

    /// Allowed only if the change list has not been touched since the last
    /// passing test run.
    pub fn is_commit_allowed(&mut self) -> Result<bool> {
        if self.forced || !self.settings.enabled {
            return Ok(true);
        }
        let current = self.commits.change_list_modifications()?;
        if self.state.tested_modifications.as_ref() != Some(&current) {
            self.state.allowed_to_commit = false;
        }
        if !self.state.allowed_to_commit {
            info!("Commit cancelled, no passing test run covers it");
            self.notifications.on_untested_commit_cancelled();
        }
        Ok(self.state.allowed_to_commit)
    }

    pub fn on_successful_commit(&mut self) {
        self.forced = false;
        self.state.on_successful_commit();
    }

    pub fn on_settings(&mut self, settings: TcrSettings) {
        self.keep = match settings.keep_matchers() {
            Ok(keep) => keep,
            Err(e) => {
                warn!("Ignoring files to keep on revert: {}", e);
                Vec::new()
            }
        };
        self.settings = settings;
    }
}
