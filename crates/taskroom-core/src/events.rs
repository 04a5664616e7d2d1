use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::timer::TimerMode;

/// Every timer state change produces an Event.
/// The coordinator consumes completions; front ends print them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    TimerStarted {
        mode: TimerMode,
        remaining_secs: u64,
        at: DateTime<Utc>,
    },
    TimerPaused {
        mode: TimerMode,
        remaining_secs: u64,
        at: DateTime<Utc>,
    },
    TimerReset {
        mode: TimerMode,
        at: DateTime<Utc>,
    },
    ModeChanged {
        from: TimerMode,
        to: TimerMode,
        at: DateTime<Utc>,
    },
    /// A countdown reached zero. `finished` is the mode that just ended,
    /// `next` the mode the engine switched to.
    TimerCompleted {
        finished: TimerMode,
        next: TimerMode,
        completed_sessions: u32,
        at: DateTime<Utc>,
    },
    StateSnapshot {
        mode: TimerMode,
        running: bool,
        remaining_secs: u64,
        total_secs: u64,
        completed_sessions: u32,
        progress: f64,
        at: DateTime<Utc>,
    },
}

impl Event {
    /// Returns `(finished, next)` when this is a completion event.
    pub fn completion(&self) -> Option<(TimerMode, TimerMode)> {
        match self {
            Event::TimerCompleted { finished, next, .. } => Some((*finished, *next)),
            _ => None,
        }
    }
}
