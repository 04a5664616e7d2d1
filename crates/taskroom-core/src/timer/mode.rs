use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ValidationError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimerMode {
    Work,
    ShortBreak,
    LongBreak,
}

impl TimerMode {
    pub const ALL: [TimerMode; 3] = [TimerMode::Work, TimerMode::ShortBreak, TimerMode::LongBreak];

    pub fn is_break(self) -> bool {
        !matches!(self, TimerMode::Work)
    }

    /// Human label shown next to the countdown.
    pub fn label(self) -> &'static str {
        match self {
            TimerMode::Work => "Focus Time",
            TimerMode::ShortBreak => "Short Break",
            TimerMode::LongBreak => "Long Break",
        }
    }
}

impl fmt::Display for TimerMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TimerMode::Work => "work",
            TimerMode::ShortBreak => "short-break",
            TimerMode::LongBreak => "long-break",
        };
        f.write_str(s)
    }
}

impl FromStr for TimerMode {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('_', "-").as_str() {
            "work" | "focus" => Ok(TimerMode::Work),
            "short-break" | "shortbreak" | "short" => Ok(TimerMode::ShortBreak),
            "long-break" | "longbreak" | "long" => Ok(TimerMode::LongBreak),
            other => Err(ValidationError::InvalidValue {
                field: "mode".into(),
                message: format!("unknown timer mode '{other}'"),
            }),
        }
    }
}

/// Fixed length of each timer mode, in whole seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimerDurations {
    pub work_secs: u64,
    pub short_break_secs: u64,
    pub long_break_secs: u64,
    /// Every n-th completed work session is followed by a long break.
    pub sessions_before_long_break: u32,
}

impl TimerDurations {
    /// Build durations from minute values.
    ///
    /// Uses saturating arithmetic so oversized config values cannot overflow.
    /// A zero session interval is clamped to 1.
    pub fn from_minutes(work: u64, short_break: u64, long_break: u64, sessions: u32) -> Self {
        Self {
            work_secs: work.saturating_mul(60),
            short_break_secs: short_break.saturating_mul(60),
            long_break_secs: long_break.saturating_mul(60),
            sessions_before_long_break: sessions.max(1),
        }
    }

    pub fn for_mode(&self, mode: TimerMode) -> u64 {
        match mode {
            TimerMode::Work => self.work_secs,
            TimerMode::ShortBreak => self.short_break_secs,
            TimerMode::LongBreak => self.long_break_secs,
        }
    }
}

impl Default for TimerDurations {
    fn default() -> Self {
        Self::from_minutes(25, 5, 15, 4)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_durations_match_classic_pomodoro() {
        let d = TimerDurations::default();
        assert_eq!(d.for_mode(TimerMode::Work), 1500);
        assert_eq!(d.for_mode(TimerMode::ShortBreak), 300);
        assert_eq!(d.for_mode(TimerMode::LongBreak), 900);
        assert_eq!(d.sessions_before_long_break, 4);
    }

    #[test]
    fn zero_session_interval_is_clamped() {
        let d = TimerDurations::from_minutes(1, 1, 1, 0);
        assert_eq!(d.sessions_before_long_break, 1);
    }

    #[test]
    fn mode_parses_cli_spellings() {
        assert_eq!("work".parse::<TimerMode>().unwrap(), TimerMode::Work);
        assert_eq!("short-break".parse::<TimerMode>().unwrap(), TimerMode::ShortBreak);
        assert_eq!("LONG_BREAK".parse::<TimerMode>().unwrap(), TimerMode::LongBreak);
        assert!("nap".parse::<TimerMode>().is_err());
    }

    #[test]
    fn display_roundtrips_through_from_str() {
        for mode in TimerMode::ALL {
            assert_eq!(mode.to_string().parse::<TimerMode>().unwrap(), mode);
        }
    }
}
