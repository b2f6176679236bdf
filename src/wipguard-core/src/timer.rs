//! Once-per-second tick source.
//!
//! Polls at a sub-second period and broadcasts the number of whole seconds
//! elapsed since the source was spawned, once for each new value. Ticks are
//! positive and strictly increasing; a slow subscriber may miss some.

use std::time::Duration;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::debug;

const DEFAULT_POLL_PERIOD: Duration = Duration::from_millis(500);
const CHANNEL_CAPACITY: usize = 16;

#[derive(Debug, Clone)]
pub struct TimerSource {
    tx: broadcast::Sender<u64>,
    poll_period: Duration,
}

impl TimerSource {
    pub fn new() -> Self {
        Self::with_poll_period(DEFAULT_POLL_PERIOD)
    }

    pub fn with_poll_period(poll_period: Duration) -> Self {
        let (tx, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self { tx, poll_period }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<u64> {
        self.tx.subscribe()
    }

    /// Start ticking. Abort the returned handle to stop.
    pub fn spawn(&self) -> JoinHandle<()> {
        let tx = self.tx.clone();
        let poll_period = self.poll_period;

        tokio::spawn(async move {
            let started = Instant::now();
            let mut interval = tokio::time::interval(poll_period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
            let mut last_second = 0;

            loop {
                interval.tick().await;
                let second = started.elapsed().as_secs();
                if second <= last_second {
                    continue;
                }
                last_second = second;
                if tx.send(second).is_err() {
                    debug!(second, "Tick dropped, no subscribers");
                }
            }
        })
    }
}

impl Default for TimerSource {
    fn default() -> Self {
        Self::new()
    }
}
