//! Host clock for the timer engine.
//!
//! A [`Ticker`] owns a tokio task that emits one unit message per period
//! through an mpsc channel. The task is aborted by [`Ticker::stop`] and on
//! drop, so no tick can be delivered after the owner is gone.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};

const CHANNEL_CAPACITY: usize = 4;

/// Handle to a running once-per-period tick source.
#[derive(Debug)]
pub struct Ticker {
    handle: Option<JoinHandle<()>>,
}

impl Ticker {
    /// Spawn a ticker on the current tokio runtime.
    ///
    /// The first tick arrives one full `period` after spawning.
    /// Must be called from within a runtime.
    pub fn spawn(period: Duration) -> (Self, mpsc::Receiver<()>) {
        let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
        let handle = tokio::spawn(async move {
            let mut interval = time::interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                if tx.send(()).await.is_err() {
                    break;
                }
            }
        });
        tracing::debug!(period_ms = period.as_millis() as u64, "ticker spawned");
        (
            Self {
                handle: Some(handle),
            },
            rx,
        )
    }

    /// One tick per second, the cadence the timer engine expects.
    pub fn every_second() -> (Self, mpsc::Receiver<()>) {
        Self::spawn(Duration::from_secs(1))
    }

    /// Stop the tick source. Idempotent.
    pub fn stop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
            tracing::debug!("ticker stopped");
        }
    }

    pub fn is_active(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }
}

impl Drop for Ticker {
    fn drop(&mut self) {
        self.stop();
    }
}
