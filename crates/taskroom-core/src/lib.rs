//! # Taskroom Core Library
//!
//! Core logic for Taskroom, a Pomodoro timer paired with a page-organized
//! task store. Every operation is available to a front end through the
//! [`Coordinator`]; the `taskroom` CLI is a thin layer over it.
//!
//! ## Architecture
//!
//! - **Timer Engine**: a tick-driven state machine; the caller invokes
//!   `tick()` once per second, usually from a [`Ticker`]
//! - **Tasks and Pages**: ordered task collections held by pages stored in
//!   a flat [`PageArena`]
//! - **Notifications**: an in-memory list plus a pluggable host sink
//! - **Views**: paginated export and the month calendar grid
//! - **Storage**: TOML configuration only; task state lives in memory
//!
//! ## Key Components
//!
//! - [`TimerEngine`]: timer state machine
//! - [`TaskCollection`]: task CRUD, filtering and grouping
//! - [`Coordinator`]: single owner of application state
//! - [`Config`]: application configuration management

pub mod calendar;
pub mod coordinator;
pub mod error;
pub mod events;
pub mod export;
pub mod notification;
pub mod page;
pub mod storage;
pub mod task;
pub mod timer;

pub use calendar::{CalendarDay, MonthGrid};
pub use coordinator::Coordinator;
pub use error::{ConfigError, CoreError, ValidationError};
pub use events::Event;
pub use export::{ExportDocument, ExportOptions};
pub use notification::{Notification, NotificationCenter, NotificationKind, NotificationSink};
pub use page::{Page, PageArena};
pub use storage::Config;
pub use task::{
    GroupBy, Priority, PriorityFilter, Task, TaskCollection, TaskDraft, TaskFilter, TaskGroup,
    TaskPatch,
};
pub use timer::{Ticker, TimerDurations, TimerEngine, TimerMode};
