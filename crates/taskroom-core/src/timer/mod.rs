mod engine;
mod mode;
mod ticker;

pub use engine::{format_mm_ss, TimerEngine};
pub use mode::{TimerDurations, TimerMode};
pub use ticker::Ticker;
