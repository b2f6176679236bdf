//! Immutable settings shared by both state machines.

use crate::{PathMatcher, Result};

use serde::{Deserialize, Serialize};

/// Notification interval that disables "too big" alerts entirely.
pub const NEVER: u32 = u32::MAX;

/// Settings snapshot pushed into the machines.
///
/// Always replaced wholesale; the machines never mutate it. Ranges are not
/// checked here, see [`crate::WipConfig::to_settings`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    pub auto_revert_enabled: bool,
    pub seconds_till_revert: u32,
    pub notify_on_revert: bool,
    pub show_timer_in_toolbar: bool,

    pub watchdog_enabled: bool,
    pub max_lines_in_change: u32,
    pub notification_interval_seconds: u32,
    pub show_remaining_changes_in_toolbar: bool,
    pub no_commits_above_threshold: bool,
    /// Wildcard patterns for paths the watchdog ignores.
    pub exclusions: Vec<String>,
}

impl Settings {
    /// Auto-revert enabled with the given timeout, watchdog left at defaults.
    pub fn with_revert_timeout(seconds_till_revert: u32) -> Self {
        Self {
            auto_revert_enabled: true,
            seconds_till_revert,
            ..Self::default()
        }
    }

    /// Watchdog enabled with the given threshold and interval.
    pub fn with_watchdog(max_lines_in_change: u32, notification_interval_seconds: u32) -> Self {
        Self {
            watchdog_enabled: true,
            max_lines_in_change,
            notification_interval_seconds,
            ..Self::default()
        }
    }

    pub fn exclusion_matchers(&self) -> Result<Vec<PathMatcher>> {
        self.exclusions
            .iter()
            .map(|p| PathMatcher::parse(p))
            .collect()
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            auto_revert_enabled: false,
            seconds_till_revert: 120,
            notify_on_revert: true,
            show_timer_in_toolbar: true,
            watchdog_enabled: true,
            max_lines_in_change: 80,
            notification_interval_seconds: NEVER,
            show_remaining_changes_in_toolbar: true,
            no_commits_above_threshold: false,
            exclusions: Vec::new(),
        }
    }
}
