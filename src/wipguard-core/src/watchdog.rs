//! Change-size watchdog.
//!
//! Samples the change size on every tick, always reports it for display, and
//! raises a "too big" alert at most once per notification interval while the
//! size is over the threshold. The user can mute alerts until the next
//! commit.

use crate::{
    ChangeSize, ChangeSizeProvider, ChangeSizesByPath, NEVER, NotificationSink, PathMatcher,
    Result, Settings,
};

use std::sync::Arc;
use tracing::{debug, info, warn};

pub struct ChangeSizeWatchdog {
    notifications: Arc<dyn NotificationSink>,
    provider: Arc<dyn ChangeSizeProvider>,
    settings: Settings,
    exclusions: Vec<PathMatcher>,
    last_notified_at: Option<u64>,
    suppressed: bool,
    alert_visible: bool,
    allow_one_commit: bool,
}

impl ChangeSizeWatchdog {
    pub fn new(
        notifications: Arc<dyn NotificationSink>,
        provider: Arc<dyn ChangeSizeProvider>,
        settings: Settings,
    ) -> Self {
        let mut watchdog = Self {
            notifications,
            provider,
            settings: Settings::default(),
            exclusions: Vec::new(),
            last_notified_at: None,
            suppressed: false,
            alert_visible: false,
            allow_one_commit: false,
        };
        watchdog.on_settings(settings);
        watchdog
    }

    pub fn is_suppressed(&self) -> bool {
        self.suppressed
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn on_timer(&mut self, seconds: u64) -> Result<()> {
        if !self.settings.watchdog_enabled {
            return Ok(());
        }

        let size = self.current_size()?;
        let threshold = self.settings.max_lines_in_change;
        let exceeded = size.value > threshold;
        if !exceeded && self.alert_visible {
            self.alert_visible = false;
            self.notifications.on_change_size_within_limit();
        }

        if !self.suppressed && self.settings.notification_interval_seconds != NEVER {
            let due = self.last_notified_at.is_none_or(|last| {
                seconds.saturating_sub(last)
                    >= u64::from(self.settings.notification_interval_seconds)
            });
            if exceeded && due {
                info!(%size, threshold, "Change size is above threshold");
                self.notifications.on_change_size_too_big(size, threshold);
                self.last_notified_at = Some(seconds);
                self.alert_visible = true;
            }
        }

        self.notifications.current_change_list_size(size, threshold);
        Ok(())
    }

    pub fn on_settings(&mut self, settings: Settings) {
        self.exclusions = compile_exclusions(&settings.exclusions);
        self.last_notified_at = None;
        self.settings = settings;
    }

    /// A commit went through with nothing left uncommitted.
    pub fn on_commit(&mut self) {
        self.allow_one_commit = false;
        if self.alert_visible {
            self.alert_visible = false;
            self.notifications.on_change_size_within_limit();
        }
        self.set_suppressed(false);
    }

    pub fn set_suppressed(&mut self, suppressed: bool) {
        if self.suppressed == suppressed {
            return;
        }
        self.suppressed = suppressed;
        self.last_notified_at = None;
        debug!(suppressed, "Skip notifications until commit");
        self.notifications.on_skip_notification_until_commit(suppressed);
    }

    pub fn toggle_suppressed(&mut self) {
        self.set_suppressed(!self.suppressed);
    }

    /// Let the next commit through regardless of its size.
    pub fn force_commit(&mut self) {
        self.allow_one_commit = true;
    }

    /// Whether a commit of `sizes` may proceed.
    pub fn is_commit_allowed(&mut self, sizes: &ChangeSizesByPath) -> bool {
        if self.allow_one_commit
            || !self.settings.no_commits_above_threshold
            || !self.settings.watchdog_enabled
        {
            return true;
        }
        let size = sizes.excluding(&self.exclusions).total();
        let threshold = self.settings.max_lines_in_change;
        if size.value > threshold {
            info!(%size, threshold, "Commit cancelled, change size is above threshold");
            self.notifications.on_commit_cancelled(size, threshold);
            return false;
        }
        true
    }

    /// Current size after exclusions.
    pub fn current_size(&self) -> Result<ChangeSize> {
        Ok(self
            .provider
            .change_sizes_by_path()?
            .excluding(&self.exclusions)
            .total())
    }
}

fn compile_exclusions(patterns: &[String]) -> Vec<PathMatcher> {
    patterns
        .iter()
        .filter_map(|pattern| match PathMatcher::parse(pattern) {
            Ok(matcher) => Some(matcher),
            Err(e) => {
                warn!("Ignoring exclusion: {}", e);
                None
            }
        })
        .collect()
}
