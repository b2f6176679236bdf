//! Auto-revert state machine.
//!
//! Once started, the working set is reverted every `seconds_till_revert`
//! ticks unless a commit resets the countdown. A changed timeout is staged
//! and only promoted at a boundary (start, revert, commit or rollback) so
//! a countdown the user is watching never jumps.

use crate::{ActionSink, NotificationSink, Result, Settings};

use std::sync::Arc;
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Stopped,
    /// `armed_at` is unset until the first tick after arming.
    Running { armed_at: Option<u64> },
}

/// Timeout in effect for the current countdown and the one waiting for the
/// next boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Timeout {
    active: u32,
    pending: u32,
}

impl Timeout {
    fn new(seconds: u32) -> Self {
        Self {
            active: seconds,
            pending: seconds,
        }
    }

    fn stage(&mut self, seconds: u32) {
        self.pending = seconds;
    }

    fn promote(&mut self) -> u32 {
        if self.active != self.pending {
            debug!(from = self.active, to = self.pending, "Applying new revert timeout");
            self.active = self.pending;
        }
        self.active
    }
}

pub struct AutoRevert {
    notifications: Arc<dyn NotificationSink>,
    actions: Arc<dyn ActionSink>,
    settings: Settings,
    state: State,
    timeout: Timeout,
}

impl AutoRevert {
    pub fn new(
        notifications: Arc<dyn NotificationSink>,
        actions: Arc<dyn ActionSink>,
        settings: Settings,
    ) -> Self {
        Self {
            notifications,
            actions,
            timeout: Timeout::new(settings.seconds_till_revert),
            settings,
            state: State::Stopped,
        }
    }

    pub fn is_started(&self) -> bool {
        matches!(self.state, State::Running { .. })
    }

    /// Timeout of the countdown currently running (or the last one).
    pub fn active_timeout_seconds(&self) -> u32 {
        self.timeout.active
    }

    pub fn start(&mut self) {
        if !self.settings.auto_revert_enabled {
            debug!("Auto-revert is disabled, ignoring start");
            return;
        }
        self.state = State::Running { armed_at: None };
        let timeout = self.timeout.promote();
        info!(seconds_till_revert = timeout, "Auto-revert started");
        self.notifications.on_auto_revert_started(timeout);
    }

    pub fn stop(&mut self) {
        if !self.is_started() {
            return;
        }
        self.state = State::Stopped;
        info!("Auto-revert stopped");
        self.notifications.on_auto_revert_stopped();
    }

    pub fn toggle(&mut self) {
        if self.is_started() {
            self.stop();
        } else {
            self.start();
        }
    }

    /// Advance the countdown. Errors come from the revert itself; the
    /// countdown has already been re-armed by then.
    pub fn on_timer(&mut self, seconds: u64) -> Result<()> {
        let State::Running { armed_at } = &mut self.state else {
            return Ok(());
        };
        let start = *armed_at.get_or_insert(seconds.saturating_sub(1));
        let elapsed = seconds.saturating_sub(start);
        let active = u64::from(self.timeout.active);

        self.notifications
            .on_time_till_revert(active.saturating_sub(elapsed) + 1);

        if elapsed >= active {
            *armed_at = None;
            self.timeout.promote();
            let reverted = self.actions.revert_current_change_list()?;
            info!(reverted, "Auto-revert timeout reached");
            if reverted && self.settings.notify_on_revert {
                self.notifications.on_changes_revert();
            }
        }
        Ok(())
    }

    pub fn on_all_files_committed(&mut self) {
        if self.rearm() {
            self.notifications.on_commit(self.timeout.active);
        }
    }

    pub fn on_all_changes_rolled_back(&mut self) {
        if self.rearm() {
            self.notifications.on_rollback(self.timeout.active);
        }
    }

    pub fn on_settings(&mut self, settings: Settings) {
        self.timeout.stage(settings.seconds_till_revert);
        let disabled = !settings.auto_revert_enabled;
        self.settings = settings;
        if disabled {
            self.stop();
        }
    }

    /// Restart the countdown on the next tick. Returns whether running.
    fn rearm(&mut self) -> bool {
        let State::Running { armed_at } = &mut self.state else {
            return false;
        };
        *armed_at = None;
        self.timeout.promote();
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::WipError;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    #[derive(Debug, Clone, PartialEq, Eq)]
    enum Event {
        Started(u32),
        Stopped,
        TimeTillRevert(u64),
        Commit(u32),
        Rollback(u32),
        Reverted,
    }

    #[derive(Default)]
    struct Recorder {
        events: Mutex<Vec<Event>>,
    }

    impl Recorder {
        fn events(&self) -> Vec<Event> {
            self.events.lock().unwrap().clone()
        }

        fn count(&self, f: impl Fn(&Event) -> bool) -> usize {
            self.events().iter().filter(|e| f(e)).count()
        }

        fn push(&self, event: Event) {
            self.events.lock().unwrap().push(event);
        }
    }

    impl NotificationSink for Recorder {
        fn on_auto_revert_started(&self, seconds: u32) {
            self.push(Event::Started(seconds));
        }
        fn on_auto_revert_stopped(&self) {
            self.push(Event::Stopped);
        }
        fn on_time_till_revert(&self, seconds_left: u64) {
            self.push(Event::TimeTillRevert(seconds_left));
        }
        fn on_commit(&self, seconds: u32) {
            self.push(Event::Commit(seconds));
        }
        fn on_rollback(&self, seconds: u32) {
            self.push(Event::Rollback(seconds));
        }
        fn on_changes_revert(&self) {
            self.push(Event::Reverted);
        }
    }

    struct Actions {
        reverts: AtomicUsize,
        has_changes: AtomicBool,
        fail: AtomicBool,
    }

    impl Actions {
        fn new() -> Self {
            Self {
                reverts: AtomicUsize::new(0),
                has_changes: AtomicBool::new(true),
                fail: AtomicBool::new(false),
            }
        }

        fn reverts(&self) -> usize {
            self.reverts.load(Ordering::SeqCst)
        }
    }

    impl ActionSink for Actions {
        fn revert_current_change_list(&self) -> Result<bool> {
            self.reverts.fetch_add(1, Ordering::SeqCst);
            if self.fail.load(Ordering::SeqCst) {
                return Err(WipError::RevertFailed("disk full".to_string()));
            }
            Ok(self.has_changes.load(Ordering::SeqCst))
        }
    }

    struct Fixture {
        recorder: Arc<Recorder>,
        actions: Arc<Actions>,
        auto_revert: AutoRevert,
        seconds: u64,
    }

    impl Fixture {
        fn new(seconds_till_revert: u32) -> Self {
            let recorder = Arc::new(Recorder::default());
            let actions = Arc::new(Actions::new());
            let auto_revert = AutoRevert::new(
                recorder.clone(),
                actions.clone(),
                Settings::with_revert_timeout(seconds_till_revert),
            );
            Self {
                recorder,
                actions,
                auto_revert,
                seconds: 0,
            }
        }

        fn tick(&mut self) {
            self.seconds += 1;
            self.auto_revert.on_timer(self.seconds).unwrap();
        }

        fn ticks(&mut self, n: usize) {
            for _ in 0..n {
                self.tick();
            }
        }
    }

    #[test]
    fn test_sends_started_notification() {
        let mut f = Fixture::new(2);
        f.auto_revert.start();
        assert_eq!(f.recorder.events(), vec![Event::Started(2)]);
    }

    #[test]
    fn test_timer_notifications_only_when_started() {
        let mut f = Fixture::new(2);
        f.tick();
        assert!(f.recorder.events().is_empty());

        f.auto_revert.start();
        f.tick();
        assert_eq!(
            f.recorder.events(),
            vec![Event::Started(2), Event::TimeTillRevert(2)]
        );
    }

    #[test]
    fn test_reverts_every_timeout() {
        let mut f = Fixture::new(2);
        f.auto_revert.start();
        f.ticks(4);

        assert_eq!(f.actions.reverts(), 2);
        assert_eq!(f.recorder.count(|e| *e == Event::Reverted), 2);
        assert_eq!(f.recorder.count(|e| matches!(e, Event::Started(_))), 1);
    }

    #[test]
    fn test_countdown_values() {
        let mut f = Fixture::new(3);
        f.auto_revert.start();
        f.ticks(4);
        let left: Vec<u64> = f
            .recorder
            .events()
            .into_iter()
            .filter_map(|e| match e {
                Event::TimeTillRevert(s) => Some(s),
                _ => None,
            })
            .collect();
        assert_eq!(left, vec![3, 2, 1, 3]);
    }

    #[test]
    fn test_no_revert_when_stopped() {
        let mut f = Fixture::new(2);
        f.auto_revert.start();
        f.tick();
        f.auto_revert.stop();
        f.tick();

        assert_eq!(f.actions.reverts(), 0);
        assert_eq!(f.recorder.count(|e| *e == Event::Stopped), 1);
    }

    #[test]
    fn test_stop_is_idempotent() {
        let mut f = Fixture::new(2);
        f.auto_revert.start();
        f.auto_revert.stop();
        f.auto_revert.stop();
        assert_eq!(f.recorder.events(), vec![Event::Started(2), Event::Stopped]);
    }

    #[test]
    fn test_restart_resets_countdown() {
        let mut f = Fixture::new(2);
        f.auto_revert.start();
        f.tick();
        f.auto_revert.stop();
        f.auto_revert.start();
        f.ticks(2);
        assert_eq!(
            f.recorder.events(),
            vec![
                Event::Started(2),
                Event::TimeTillRevert(2),
                Event::Stopped,
                Event::Started(2),
                Event::TimeTillRevert(2),
                Event::TimeTillRevert(1),
                Event::Reverted,
            ]
        );
    }

    #[test]
    fn test_commit_resets_countdown() {
        let mut f = Fixture::new(2);
        f.auto_revert.start();
        f.tick();
        f.auto_revert.on_all_files_committed();
        f.ticks(2);
        assert_eq!(
            f.recorder.events(),
            vec![
                Event::Started(2),
                Event::TimeTillRevert(2),
                Event::Commit(2),
                Event::TimeTillRevert(2),
                Event::TimeTillRevert(1),
                Event::Reverted,
            ]
        );
    }

    #[test]
    fn test_commit_before_start_is_ignored() {
        let mut f = Fixture::new(2);
        f.auto_revert.on_all_files_committed();
        assert!(f.recorder.events().is_empty());

        f.auto_revert.start();
        f.auto_revert.on_all_files_committed();
        assert_eq!(f.recorder.events(), vec![Event::Started(2), Event::Commit(2)]);
    }

    #[test]
    fn test_rollback_resets_countdown() {
        let mut f = Fixture::new(2);
        f.auto_revert.on_all_changes_rolled_back();
        f.auto_revert.start();
        f.tick();
        f.auto_revert.on_all_changes_rolled_back();
        f.tick();
        assert_eq!(f.actions.reverts(), 0);
        assert_eq!(f.recorder.count(|e| *e == Event::Rollback(2)), 1);
    }

    #[test]
    fn test_new_timeout_applies_after_start() {
        let mut f = Fixture::new(2);
        f.auto_revert.on_settings(Settings::with_revert_timeout(1));
        f.auto_revert.start();
        f.ticks(2);
        assert_eq!(f.actions.reverts(), 2);
    }

    #[test]
    fn test_new_timeout_applies_after_current_countdown() {
        let mut f = Fixture::new(2);
        f.auto_revert.start();
        f.auto_revert.on_settings(Settings::with_revert_timeout(1));
        f.tick();
        assert_eq!(f.auto_revert.active_timeout_seconds(), 2);
        f.tick(); // reverts after the 2nd tick
        f.tick(); // then after every tick
        f.tick();
        assert_eq!(f.actions.reverts(), 3);
    }

    #[test]
    fn test_new_timeout_applies_after_commit() {
        let mut f = Fixture::new(2);
        f.auto_revert.start();
        f.auto_revert.on_settings(Settings::with_revert_timeout(1));
        f.tick();
        f.auto_revert.on_all_files_committed();
        assert_eq!(f.recorder.count(|e| *e == Event::Commit(1)), 1);
        f.ticks(3);
        assert_eq!(f.actions.reverts(), 3);
    }

    #[test]
    fn test_start_ignored_when_disabled() {
        let mut f = Fixture::new(2);
        let disabled = Settings {
            auto_revert_enabled: false,
            ..Settings::with_revert_timeout(2)
        };
        f.auto_revert.on_settings(disabled);
        f.auto_revert.start();
        assert!(!f.auto_revert.is_started());
        assert!(f.recorder.events().is_empty());
    }

    #[test]
    fn test_disabling_stops_running_countdown() {
        let mut f = Fixture::new(2);
        f.auto_revert.start();
        f.tick();
        f.auto_revert.on_settings(Settings {
            auto_revert_enabled: false,
            ..Settings::with_revert_timeout(2)
        });
        f.tick();
        assert_eq!(f.actions.reverts(), 0);
        assert!(!f.auto_revert.is_started());
        assert_eq!(f.recorder.count(|e| *e == Event::Stopped), 1);
    }

    #[test]
    fn test_no_revert_notification_when_nothing_reverted() {
        let mut f = Fixture::new(1);
        f.actions.has_changes.store(false, Ordering::SeqCst);
        f.auto_revert.start();
        f.tick();
        assert_eq!(f.actions.reverts(), 1);
        assert_eq!(f.recorder.count(|e| *e == Event::Reverted), 0);
    }

    #[test]
    fn test_no_revert_notification_when_disabled_in_settings() {
        let mut f = Fixture::new(1);
        f.auto_revert.on_settings(Settings {
            notify_on_revert: false,
            ..Settings::with_revert_timeout(1)
        });
        f.auto_revert.start();
        f.tick();
        assert_eq!(f.actions.reverts(), 1);
        assert_eq!(f.recorder.count(|e| *e == Event::Reverted), 0);
    }

    #[test]
    fn test_failed_revert_keeps_countdown_in_sync() {
        let mut f = Fixture::new(2);
        f.auto_revert.start();
        f.tick();
        f.actions.fail.store(true, Ordering::SeqCst);
        f.seconds += 1;
        assert!(f.auto_revert.on_timer(f.seconds).is_err());
        f.actions.fail.store(false, Ordering::SeqCst);
        f.ticks(2);
        assert_eq!(f.actions.reverts(), 2);
        assert_eq!(f.recorder.count(|e| *e == Event::Reverted), 1);
    }

    #[test]
    fn test_toggle() {
        let mut f = Fixture::new(2);
        f.auto_revert.toggle();
        assert!(f.auto_revert.is_started());
        f.auto_revert.toggle();
        assert!(!f.auto_revert.is_started());
    }
}
