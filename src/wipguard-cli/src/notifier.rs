//! Renders session events as log lines.

use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, info, warn};

use wipguard_core::format::{
    AUTO_REVERT_STOPPED_TEXT, CHANGES_REVERTED_TEXT, UNTESTED_COMMIT_CANCELLED_TEXT,
    change_size_text, change_size_too_big_text, commit_cancelled_text, format_time,
    time_till_revert_text,
};
use wipguard_core::{ChangeSize, NotificationSink, Settings, TcrAction};

/// Countdown values at or below this are logged at info level.
const COUNTDOWN_INFO_SECONDS: u64 = 10;

/// Status line and alert output for `watch`.
///
/// The countdown is logged at debug level except near the end and on whole
/// minutes. The change size is logged only when it changes.
pub struct LogNotifier {
    show_timer: AtomicBool,
    show_size: AtomicBool,
    last_size: Mutex<Option<(ChangeSize, u32)>>,
}

impl LogNotifier {
    pub fn new() -> Self {
        Self {
            show_timer: AtomicBool::new(true),
            show_size: AtomicBool::new(true),
            last_size: Mutex::new(None),
        }
    }

    /// Remember `size` and report whether it differs from the last one.
    fn size_changed(&self, size: ChangeSize, threshold: u32) -> bool {
        let Ok(mut last) = self.last_size.lock() else {
            return true;
        };
        if *last == Some((size, threshold)) {
            return false;
        }
        *last = Some((size, threshold));
        true
    }
}

impl Default for LogNotifier {
    fn default() -> Self {
        Self::new()
    }
}

impl NotificationSink for LogNotifier {
    fn on_auto_revert_started(&self, seconds_till_revert: u32) {
        info!(
            "Auto-revert started, reverting every {}",
            format_time(u64::from(seconds_till_revert))
        );
    }

    fn on_auto_revert_stopped(&self) {
        info!("{}", AUTO_REVERT_STOPPED_TEXT);
    }

    fn on_time_till_revert(&self, seconds_left: u64) {
        if !self.show_timer.load(Ordering::Relaxed) {
            return;
        }
        if seconds_left <= COUNTDOWN_INFO_SECONDS || seconds_left % 60 == 0 {
            info!("{}", time_till_revert_text(seconds_left));
        } else {
            debug!("{}", time_till_revert_text(seconds_left));
        }
    }

    fn on_commit(&self, seconds_till_revert: u32) {
        info!(
            "Commit detected, auto-revert restarted at {}",
            format_time(u64::from(seconds_till_revert))
        );
    }

    fn on_rollback(&self, seconds_till_revert: u32) {
        debug!(
            "Changes rolled back, auto-revert restarted at {}",
            format_time(u64::from(seconds_till_revert))
        );
    }

    fn on_changes_revert(&self) {
        warn!("{}", CHANGES_REVERTED_TEXT);
    }

    fn on_change_size_too_big(&self, size: ChangeSize, threshold: u32) {
        warn!("{}", change_size_too_big_text(size, threshold));
    }

    fn on_change_size_within_limit(&self) {
        info!("Change size is back within limit");
    }

    fn current_change_list_size(&self, size: ChangeSize, threshold: u32) {
        if self.show_size.load(Ordering::Relaxed) && self.size_changed(size, threshold) {
            info!("{}", change_size_text(size, threshold));
        }
    }

    fn on_skip_notification_until_commit(&self, skip: bool) {
        if skip {
            info!("Change size notifications muted until next commit");
        } else {
            info!("Change size notifications enabled");
        }
    }

    fn on_commit_cancelled(&self, size: ChangeSize, threshold: u32) {
        warn!("{}", commit_cancelled_text(size, threshold));
    }

    fn on_untested_commit_cancelled(&self) {
        warn!("{}", UNTESTED_COMMIT_CANCELLED_TEXT);
    }

    fn on_tcr_commit(&self, action: TcrAction) {
        info!(%action, "Tests passed, change list committed");
    }

    fn on_settings_update(&self, settings: &Settings) {
        self.show_timer
            .store(settings.show_timer_in_toolbar, Ordering::Relaxed);
        self.show_size
            .store(settings.show_remaining_changes_in_toolbar, Ordering::Relaxed);
    }
}
