//! Limbo: commits need a test run, failing tests revert everything.

use crate::{ActionSink, NotificationSink, Result};

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LimboSettings {
    pub enabled: bool,
    pub notify_on_revert: bool,
}

/// Limbo state that outlives a single process.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LimboState {
    /// Passing test runs since the last commit.
    #[serde(default)]
    pub tests_run: u32,
}

impl LimboState {
    pub fn on_successful_commit(&mut self) {
        self.tests_run = 0;
    }
}

pub struct Limbo {
    notifications: Arc<dyn NotificationSink>,
    actions: Arc<dyn ActionSink>,
    settings: LimboSettings,
    state: LimboState,
    forced: bool,
}

impl Limbo {
    pub fn new(
        notifications: Arc<dyn NotificationSink>,
        actions: Arc<dyn ActionSink>,
        settings: LimboSettings,
    ) -> Self {
        Self {
            notifications,
            actions,
            settings,
            state: LimboState::default(),
            forced: false,
        }
    }

    pub fn with_state(mut self, state: LimboState) -> Self {
        self.state = state;
        self
    }

    pub fn state(&self) -> &LimboState {
        &self.state
    }

    pub fn on_unit_test_succeeded(&mut self) {
        self.state.tests_run = self.state.tests_run.saturating_add(1);
    }

    pub fn on_unit_test_failed(&mut self) -> Result<()> {
        if !self.settings.enabled {
            return Ok(());
        }
        self.state.tests_run = 0;
        let reverted = self.actions.revert_current_change_list()?;
        info!(reverted, "Tests failed, change list reverted");
        if reverted && self.settings.notify_on_revert {
            self.notifications.on_changes_revert();
        }
        Ok(())
    }

    pub fn allow_one_commit_without_checks(&mut self) {
        self.forced = true;
    }

    pub fn is_commit_allowed(&mut self) -> bool {
        if self.forced || !self.settings.enabled {
            return true;
        }
        if self.state.tests_run == 0 {
            info!("Commit cancelled, no tests were run");
            self.notifications.on_untested_commit_cancelled();
            return false;
        }
        true
    }

    pub fn on_successful_commit(&mut self) {
        self.forced = false;
        self.state.on_successful_commit();
    }

    pub fn on_settings(&mut self, settings: LimboSettings) {
        self.settings = settings;
    }
}
