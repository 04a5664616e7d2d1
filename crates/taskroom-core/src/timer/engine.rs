//! Timer engine implementation.
//!
//! The timer engine is a tick-driven state machine over three modes. It does
//! not own a clock - the caller is responsible for calling `tick()` once per
//! elapsed second while the engine is running (see [`super::Ticker`]).
//!
//! ## State Transitions
//!
//! ```text
//! Work --expire--> ShortBreak | LongBreak --expire--> Work
//! ```
//!
//! Every n-th completed work session (n = 4 by default) leads to a long break.
//!
//! ## Usage
//!
//! ```ignore
//! let mut engine = TimerEngine::new();
//! engine.start();
//! // Once per second:
//! if let Some(event) = engine.tick() { /* TimerCompleted */ }
//! ```

use chrono::Utc;
use serde::{Deserialize, Serialize};

use super::mode::{TimerDurations, TimerMode};
use crate::events::Event;

/// Core timer engine.
///
/// Remaining time is kept in whole seconds and always stays within
/// `[0, duration(mode)]`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimerEngine {
    durations: TimerDurations,
    mode: TimerMode,
    remaining_secs: u64,
    running: bool,
    /// Completed work sessions since the engine was created.
    completed_sessions: u32,
}

impl TimerEngine {
    /// Create an idle engine in work mode with the default durations.
    pub fn new() -> Self {
        Self::with_durations(TimerDurations::default())
    }

    pub fn with_durations(durations: TimerDurations) -> Self {
        Self {
            durations,
            mode: TimerMode::Work,
            remaining_secs: durations.for_mode(TimerMode::Work),
            running: false,
            completed_sessions: 0,
        }
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn mode(&self) -> TimerMode {
        self.mode
    }

    pub fn remaining_secs(&self) -> u64 {
        self.remaining_secs
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn completed_sessions(&self) -> u32 {
        self.completed_sessions
    }

    pub fn durations(&self) -> TimerDurations {
        self.durations
    }

    pub fn total_secs(&self) -> u64 {
        self.durations.for_mode(self.mode)
    }

    /// 0.0 .. 1.0 progress within the current mode.
    pub fn progress(&self) -> f64 {
        let total = self.total_secs();
        if total == 0 {
            return 0.0;
        }
        1.0 - (self.remaining_secs as f64 / total as f64)
    }

    /// Remaining time as `MM:SS`.
    pub fn formatted_remaining(&self) -> String {
        format_mm_ss(self.remaining_secs)
    }

    /// Work sessions left before the next long break (1..=n).
    pub fn sessions_until_long_break(&self) -> u32 {
        let n = self.durations.sessions_before_long_break;
        n - (self.completed_sessions % n)
    }

    /// Build a full state snapshot event.
    pub fn snapshot(&self) -> Event {
        Event::StateSnapshot {
            mode: self.mode,
            running: self.running,
            remaining_secs: self.remaining_secs,
            total_secs: self.total_secs(),
            completed_sessions: self.completed_sessions,
            progress: self.progress(),
            at: Utc::now(),
        }
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Start the countdown. Starting with nothing left completes at once.
    pub fn start(&mut self) -> Option<Event> {
        if self.running {
            return None;
        }
        if self.remaining_secs == 0 {
            return Some(self.on_expire());
        }
        self.running = true;
        tracing::debug!(mode = %self.mode, remaining = self.remaining_secs, "timer started");
        Some(Event::TimerStarted {
            mode: self.mode,
            remaining_secs: self.remaining_secs,
            at: Utc::now(),
        })
    }

    /// Stop the countdown, keeping the remaining time as-is.
    pub fn pause(&mut self) -> Option<Event> {
        if !self.running {
            return None;
        }
        self.running = false;
        tracing::debug!(mode = %self.mode, remaining = self.remaining_secs, "timer paused");
        Some(Event::TimerPaused {
            mode: self.mode,
            remaining_secs: self.remaining_secs,
            at: Utc::now(),
        })
    }

    pub fn toggle(&mut self) -> Option<Event> {
        if self.running {
            self.pause()
        } else {
            self.start()
        }
    }

    /// Switch mode. Ignored while running.
    pub fn set_mode(&mut self, mode: TimerMode) -> Option<Event> {
        if self.running {
            tracing::debug!(requested = %mode, "mode change ignored while running");
            return None;
        }
        let from = self.mode;
        self.apply_mode(mode);
        Some(Event::ModeChanged {
            from,
            to: mode,
            at: Utc::now(),
        })
    }

    /// Stop and restore the full duration of the current mode.
    /// The completed-session counter is left untouched.
    pub fn reset(&mut self) -> Option<Event> {
        self.running = false;
        self.remaining_secs = self.total_secs();
        Some(Event::TimerReset {
            mode: self.mode,
            at: Utc::now(),
        })
    }

    /// Replace the durations. Ignored while running; otherwise the current
    /// mode restarts at its new full duration.
    pub fn set_durations(&mut self, durations: TimerDurations) -> bool {
        if self.running {
            return false;
        }
        self.durations = durations;
        self.remaining_secs = self.total_secs();
        true
    }

    /// Call once per elapsed second. Returns `Some(Event::TimerCompleted)`
    /// on the tick that brings the countdown to zero.
    pub fn tick(&mut self) -> Option<Event> {
        if !self.running {
            return None;
        }
        self.remaining_secs = self.remaining_secs.saturating_sub(1);
        if self.remaining_secs == 0 {
            return Some(self.on_expire());
        }
        None
    }

    // ── Internal ─────────────────────────────────────────────────────

    /// The session counter moves before the break decision so the modulus
    /// sees the session that just ended.
    fn on_expire(&mut self) -> Event {
        self.running = false;
        let finished = self.mode;
        let next = match finished {
            TimerMode::Work => {
                self.completed_sessions += 1;
                if self.completed_sessions % self.durations.sessions_before_long_break == 0 {
                    TimerMode::LongBreak
                } else {
                    TimerMode::ShortBreak
                }
            }
            TimerMode::ShortBreak | TimerMode::LongBreak => TimerMode::Work,
        };
        self.apply_mode(next);
        tracing::info!(
            finished = %finished,
            next = %next,
            completed_sessions = self.completed_sessions,
            "timer completed"
        );
        Event::TimerCompleted {
            finished,
            next,
            completed_sessions: self.completed_sessions,
            at: Utc::now(),
        }
    }

    fn apply_mode(&mut self, mode: TimerMode) {
        self.mode = mode;
        self.running = false;
        self.remaining_secs = self.durations.for_mode(mode);
    }
}

impl Default for TimerEngine {
    fn default() -> Self {
        Self::new()
    }
}

pub fn format_mm_ss(secs: u64) -> String {
    format!("{:02}:{:02}", secs / 60, secs % 60)
}
