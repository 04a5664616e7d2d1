//! Task types and caller-level input validation.
//!
//! A [`Task`] always lives inside exactly one page's [`TaskCollection`].
//! Drafts and patches are validated here, before they reach the store; the
//! store itself trusts its input.

mod collection;

pub use collection::{
    group_tasks, GroupBy, PriorityFilter, TaskCollection, TaskFilter, TaskGroup,
    ALL_TASKS_GROUP, COMPLETED_GROUP, PENDING_GROUP,
};

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ValidationError;

/// Ordinal urgency of a task. Ordering is by convention only:
/// urgent > high > medium > low.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Urgent,
    High,
    #[default]
    Medium,
    Low,
}

impl Priority {
    pub const ALL: [Priority; 4] = [
        Priority::Urgent,
        Priority::High,
        Priority::Medium,
        Priority::Low,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Priority::Urgent => "urgent",
            Priority::High => "high",
            Priority::Medium => "medium",
            Priority::Low => "low",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Priority {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "urgent" => Ok(Priority::Urgent),
            "high" => Ok(Priority::High),
            "medium" => Ok(Priority::Medium),
            "low" => Ok(Priority::Low),
            other => Err(ValidationError::InvalidValue {
                field: "priority".into(),
                message: format!("expected urgent, high, medium or low, got '{other}'"),
            }),
        }
    }
}

/// A file attached to a task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    pub id: String,
    pub name: String,
    pub url: String,
    /// MIME type
    #[serde(rename = "type")]
    pub content_type: String,
    /// Size in bytes
    pub size: u64,
    pub uploaded_at: DateTime<Utc>,
}

impl Attachment {
    pub fn new(
        name: impl Into<String>,
        url: impl Into<String>,
        content_type: impl Into<String>,
        size: u64,
    ) -> Self {
        Self {
            id: format!("att-{}", uuid::Uuid::new_v4()),
            name: name.into(),
            url: url.into(),
            content_type: content_type.into(),
            size,
            uploaded_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    /// Unique identifier
    pub id: String,
    /// Task title, never empty
    pub title: String,
    /// Optional description
    pub description: Option<String>,
    pub completed: bool,
    pub priority: Priority,
    pub due_date: Option<DateTime<Utc>>,
    /// Tags in insertion order
    pub tags: Vec<String>,
    /// Reserved for subtasks; no operation reads or writes it.
    pub parent_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub attachments: Vec<Attachment>,
    /// Completed work sessions spent on this task. Only ever increments.
    pub pomodoro_sessions: u32,
}

impl Task {
    /// Build a task from a draft, stamping a fresh id and `now` timestamps.
    pub(crate) fn from_draft(draft: TaskDraft) -> Self {
        let now = Utc::now();
        Task {
            id: format!("task-{}", uuid::Uuid::new_v4()),
            title: draft.title,
            description: draft.description,
            completed: false,
            priority: draft.priority.unwrap_or_default(),
            due_date: draft.due_date,
            tags: draft.tags,
            parent_id: draft.parent_id,
            created_at: now,
            updated_at: now,
            attachments: Vec::new(),
            pomodoro_sessions: 0,
        }
    }

    /// Incomplete with a due date strictly before `now`.
    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        !self.completed && self.due_date.is_some_and(|due| due < now)
    }

    /// Case-insensitive match against title or description.
    /// The needle must already be lowercase.
    pub(crate) fn matches_lowercase(&self, needle: &str) -> bool {
        if needle.is_empty() {
            return true;
        }
        self.title.to_lowercase().contains(needle)
            || self
                .description
                .as_deref()
                .is_some_and(|d| d.to_lowercase().contains(needle))
    }

    /// Relative due label: "Overdue", "Today", "Tomorrow" or "N days".
    /// Days are counted by rounding the remaining time up to whole days.
    pub fn due_label(&self, now: DateTime<Utc>) -> Option<String> {
        let due = self.due_date?;
        const DAY_MS: i64 = 24 * 60 * 60 * 1000;
        let diff_ms = (due - now).num_milliseconds();
        let days = diff_ms.div_euclid(DAY_MS) + i64::from(diff_ms.rem_euclid(DAY_MS) != 0);
        Some(match days {
            d if d < 0 => "Overdue".to_string(),
            0 => "Today".to_string(),
            1 => "Tomorrow".to_string(),
            d => format!("{d} days"),
        })
    }

    /// Refresh `updated_at`, keeping it strictly increasing.
    pub(crate) fn touch(&mut self) {
        self.updated_at = next_timestamp(self.updated_at);
    }
}

/// `now`, or one microsecond past `prev` if the clock has not moved.
pub(crate) fn next_timestamp(prev: DateTime<Utc>) -> DateTime<Utc> {
    let now = Utc::now();
    if now > prev {
        now
    } else {
        prev + chrono::Duration::microseconds(1)
    }
}

/// Fields accepted when creating a task.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TaskDraft {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    /// Defaults to medium when unset
    #[serde(default)]
    pub priority: Option<Priority>,
    #[serde(default)]
    pub due_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub parent_id: Option<String>,
}

impl TaskDraft {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Default::default()
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = Some(priority);
        self
    }

    pub fn with_due_date(mut self, due: DateTime<Utc>) -> Self {
        self.due_date = Some(due);
        self
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    /// Trim and check the draft the way the task form does.
    ///
    /// # Errors
    /// Returns [`ValidationError::EmptyTitle`] when the title is blank.
    pub fn validated(mut self) -> Result<Self, ValidationError> {
        self.title = validate_title(&self.title, "task")?;
        self.description = normalize_description(self.description);
        self.tags = normalize_tags(self.tags);
        Ok(self)
    }
}

/// Partial update. Each `Some` field replaces the stored value; `None`
/// leaves it untouched. Nullable fields use a nested `Option` so they can
/// be cleared.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TaskPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<Priority>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<Option<DateTime<Utc>>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attachments: Option<Vec<Attachment>>,
}

impl TaskPatch {
    pub fn completed(completed: bool) -> Self {
        Self {
            completed: Some(completed),
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Trim and check the provided fields.
    ///
    /// # Errors
    /// Returns [`ValidationError::EmptyTitle`] when a blank title is provided.
    pub fn validated(mut self) -> Result<Self, ValidationError> {
        if let Some(title) = self.title.take() {
            self.title = Some(validate_title(&title, "task")?);
        }
        if let Some(description) = self.description.take() {
            self.description = Some(normalize_description(description));
        }
        if let Some(tags) = self.tags.take() {
            self.tags = Some(normalize_tags(tags));
        }
        Ok(self)
    }

    /// Shallow merge into `task`. Does not touch timestamps.
    pub(crate) fn apply_to(self, task: &mut Task) {
        if let Some(title) = self.title {
            task.title = title;
        }
        if let Some(description) = self.description {
            task.description = description;
        }
        if let Some(completed) = self.completed {
            task.completed = completed;
        }
        if let Some(priority) = self.priority {
            task.priority = priority;
        }
        if let Some(due_date) = self.due_date {
            task.due_date = due_date;
        }
        if let Some(tags) = self.tags {
            task.tags = tags;
        }
        if let Some(attachments) = self.attachments {
            task.attachments = attachments;
        }
    }
}

/// Trimmed title, or an error if nothing is left.
pub fn validate_title(raw: &str, entity: &'static str) -> Result<String, ValidationError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::EmptyTitle { entity });
    }
    Ok(trimmed.to_string())
}

fn normalize_description(description: Option<String>) -> Option<String> {
    description
        .map(|d| d.trim().to_string())
        .filter(|d| !d.is_empty())
}

/// Trim tags, drop empty ones and keep the first of any duplicates.
pub fn normalize_tags<I, S>(tags: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut out: Vec<String> = Vec::new();
    for tag in tags {
        let tag = tag.as_ref().trim();
        if !tag.is_empty() && !out.iter().any(|t| t == tag) {
            out.push(tag.to_string());
        }
    }
    out
}

/// Parse `YYYY-MM-DD` (midnight UTC) or an RFC 3339 timestamp.
pub fn parse_due_date(raw: &str) -> Result<DateTime<Utc>, ValidationError> {
    let raw = raw.trim();
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        if let Some(dt) = date.and_hms_opt(0, 0, 0) {
            return Ok(dt.and_utc());
        }
    }
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|_| ValidationError::InvalidValue {
            field: "due_date".into(),
            message: format!("expected YYYY-MM-DD or RFC 3339, got '{raw}'"),
        })
}
