//! Integration tests driving both state machines through the session actor.

use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use pretty_assertions::assert_eq;

use wipguard_core::{
    ActionSink, ChangeSize, ChangeSizeProvider, ChangeSizesByPath, CheckinOutcome,
    NotificationSink, Result, SessionHandle, Settings, WipError, WipSession,
};

// =============================================================================
// Recording collaborators
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
enum Event {
    Started(u32),
    Stopped,
    TimeLeft(u64),
    Commit(u32),
    Reverted,
    TooBig(u32),
    Skip(bool),
    CommitCancelled(u32),
}

#[derive(Default)]
struct Recorder {
    events: Mutex<Vec<Event>>,
}

impl Recorder {
    fn push(&self, event: Event) {
        self.events.lock().unwrap().push(event);
    }

    fn events(&self) -> Vec<Event> {
        self.events.lock().unwrap().clone()
    }

    fn count(&self, f: impl Fn(&Event) -> bool) -> usize {
        self.events().iter().filter(|e| f(e)).count()
    }
}

impl NotificationSink for Recorder {
    fn on_auto_revert_started(&self, seconds_till_revert: u32) {
        self.push(Event::Started(seconds_till_revert));
    }
    fn on_auto_revert_stopped(&self) {
        self.push(Event::Stopped);
    }
    fn on_time_till_revert(&self, seconds_left: u64) {
        self.push(Event::TimeLeft(seconds_left));
    }
    fn on_commit(&self, seconds_till_revert: u32) {
        self.push(Event::Commit(seconds_till_revert));
    }
    fn on_changes_revert(&self) {
        self.push(Event::Reverted);
    }
    fn on_change_size_too_big(&self, size: ChangeSize, _threshold: u32) {
        self.push(Event::TooBig(size.value));
    }
    fn on_skip_notification_until_commit(&self, skip: bool) {
        self.push(Event::Skip(skip));
    }
    fn on_commit_cancelled(&self, size: ChangeSize, _threshold: u32) {
        self.push(Event::CommitCancelled(size.value));
    }
}

struct Provider {
    size: AtomicUsize,
    fail: AtomicBool,
}

impl Provider {
    fn new(size: usize) -> Self {
        Self {
            size: AtomicUsize::new(size),
            fail: AtomicBool::new(false),
        }
    }
}

impl ChangeSizeProvider for Provider {
    fn change_sizes_by_path(&self) -> Result<ChangeSizesByPath> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(WipError::ChangeSizeUnavailable("git is gone".to_string()));
        }
        let size = self.size.load(Ordering::SeqCst) as u32;
        Ok(ChangeSizesByPath::new().with("src/lib.rs", ChangeSize::new(size)))
    }
}

#[derive(Default)]
struct Actions {
    reverts: AtomicUsize,
}

impl ActionSink for Actions {
    fn revert_current_change_list(&self) -> Result<bool> {
        self.reverts.fetch_add(1, Ordering::SeqCst);
        Ok(true)
    }
}

struct Harness {
    recorder: Arc<Recorder>,
    provider: Arc<Provider>,
    actions: Arc<Actions>,
    session: SessionHandle,
    join: tokio::task::JoinHandle<()>,
}

impl Harness {
    fn new(settings: Settings, size: usize) -> Self {
        let recorder = Arc::new(Recorder::default());
        let provider = Arc::new(Provider::new(size));
        let actions = Arc::new(Actions::default());
        let (session, join) = WipSession::new(
            recorder.clone(),
            provider.clone(),
            actions.clone(),
            settings,
        )
        .spawn();
        Self {
            recorder,
            provider,
            actions,
            session,
            join,
        }
    }

    fn ticks(&self, range: std::ops::RangeInclusive<u64>) {
        for second in range {
            self.session.tick(second).unwrap();
        }
    }

    /// Wait for every queued command to be applied.
    async fn settle(&self) {
        self.session.status().await.unwrap();
    }

    fn reverts(&self) -> usize {
        self.actions.reverts.load(Ordering::SeqCst)
    }

    async fn shutdown(self) {
        self.session.shutdown().unwrap();
        self.join.await.unwrap();
    }
}

fn settings(seconds_till_revert: u32) -> Settings {
    Settings {
        watchdog_enabled: false,
        ..Settings::with_revert_timeout(seconds_till_revert)
    }
}

// =============================================================================
// Auto-revert through the session
// =============================================================================

#[tokio::test]
async fn test_reverts_every_timeout() {
    let h = Harness::new(settings(2), 0);
    h.session.start_auto_revert().unwrap();
    h.ticks(1..=4);
    h.settle().await;

    assert_eq!(h.reverts(), 2);
    assert_eq!(h.recorder.count(|e| *e == Event::Started(2)), 1);
    assert_eq!(h.recorder.count(|e| *e == Event::Reverted), 2);
    h.shutdown().await;
}

#[tokio::test]
async fn test_no_countdown_before_start() {
    let h = Harness::new(settings(2), 0);
    h.ticks(1..=4);
    h.session.checkin(CheckinOutcome::new(0)).unwrap();
    h.settle().await;

    assert_eq!(h.reverts(), 0);
    assert!(h.recorder.events().is_empty());
    h.shutdown().await;
}

#[tokio::test]
async fn test_timeout_change_waits_for_boundary() {
    let h = Harness::new(settings(3), 0);
    h.session.start_auto_revert().unwrap();
    h.ticks(1..=1);
    h.session.settings(settings(1)).unwrap();
    h.ticks(2..=3);
    h.settle().await;
    assert_eq!(h.reverts(), 1);

    h.ticks(4..=5);
    h.settle().await;
    assert_eq!(h.reverts(), 3);
    h.shutdown().await;
}

#[tokio::test]
async fn test_commit_resets_countdown() {
    let h = Harness::new(settings(2), 0);
    h.session.start_auto_revert().unwrap();
    h.ticks(1..=1);
    h.session.checkin(CheckinOutcome::new(0)).unwrap();
    h.ticks(2..=2);
    h.settle().await;

    assert_eq!(h.reverts(), 0);
    assert_eq!(
        h.recorder.events(),
        vec![
            Event::Started(2),
            Event::TimeLeft(2),
            Event::Commit(2),
            Event::TimeLeft(2),
        ]
    );
    h.shutdown().await;
}

#[tokio::test]
async fn test_partial_commit_does_not_reset() {
    let h = Harness::new(settings(2), 0);
    h.session.start_auto_revert().unwrap();
    h.ticks(1..=1);
    h.session.checkin(CheckinOutcome::new(3)).unwrap();
    h.ticks(2..=2);
    h.settle().await;

    assert_eq!(h.reverts(), 1);
    h.shutdown().await;
}

#[tokio::test]
async fn test_double_stop_notifies_once() {
    let h = Harness::new(settings(2), 0);
    h.session.start_auto_revert().unwrap();
    h.session.stop_auto_revert().unwrap();
    h.session.stop_auto_revert().unwrap();
    h.settle().await;

    assert_eq!(h.recorder.count(|e| *e == Event::Stopped), 1);
    h.shutdown().await;
}

// =============================================================================
// Watchdog through the session
// =============================================================================

fn watchdog_settings() -> Settings {
    Settings {
        no_commits_above_threshold: true,
        ..Settings::with_watchdog(100, 2)
    }
}

#[tokio::test]
async fn test_watchdog_alerts_are_debounced() {
    let h = Harness::new(watchdog_settings(), 200);
    h.ticks(1..=4);
    h.settle().await;

    assert_eq!(h.recorder.count(|e| *e == Event::TooBig(200)), 2);
    h.shutdown().await;
}

#[tokio::test]
async fn test_suppression_cleared_by_commit() {
    let h = Harness::new(watchdog_settings(), 200);
    h.session.set_suppressed(true).unwrap();
    h.session.set_suppressed(true).unwrap();
    h.ticks(1..=3);
    h.settle().await;
    assert_eq!(h.recorder.count(|e| matches!(e, Event::TooBig(_))), 0);

    h.session.checkin(CheckinOutcome::new(0)).unwrap();
    h.ticks(4..=4);
    let status = h.session.status().await.unwrap();

    assert!(!status.skip_notifications_until_commit);
    assert_eq!(
        h.recorder.events(),
        vec![Event::Skip(true), Event::Skip(false), Event::TooBig(200)]
    );
    h.shutdown().await;
}

#[tokio::test]
async fn test_commit_gating() {
    let h = Harness::new(watchdog_settings(), 200);
    let sizes = ChangeSizesByPath::total_only(ChangeSize::new(200));

    assert!(!h.session.is_commit_allowed(sizes.clone()).await.unwrap());
    h.session.force_commit().unwrap();
    assert!(h.session.is_commit_allowed(sizes.clone()).await.unwrap());

    assert_eq!(h.recorder.events(), vec![Event::CommitCancelled(200)]);
    h.shutdown().await;
}

#[tokio::test]
async fn test_failing_provider_does_not_stall_auto_revert() {
    let h = Harness::new(
        Settings {
            watchdog_enabled: true,
            ..settings(2)
        },
        0,
    );
    h.provider.fail.store(true, Ordering::SeqCst);
    h.session.start_auto_revert().unwrap();
    h.ticks(1..=4);
    let status = h.session.status().await.unwrap();

    assert_eq!(h.reverts(), 2);
    assert_eq!(status.change_size, None);
    h.shutdown().await;
}

// =============================================================================
// Tick forwarding
// =============================================================================

#[tokio::test]
async fn test_forwarded_ticks_drive_session() {
    let h = Harness::new(settings(2), 0);
    let (ticks, rx) = tokio::sync::broadcast::channel(16);
    let forwarder = h.session.forward_ticks(rx);

    h.session.start_auto_revert().unwrap();
    for second in 1..=4 {
        ticks.send(second).unwrap();
    }
    drop(ticks);
    forwarder.await.unwrap();
    h.settle().await;

    assert_eq!(h.reverts(), 2);
    h.shutdown().await;
}
