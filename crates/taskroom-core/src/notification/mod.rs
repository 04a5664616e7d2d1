//! In-app notifications and the optional host notification surface.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// How many read notifications a notification panel shows by default.
pub const READ_DISPLAY_LIMIT: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
    Reminder,
    Deadline,
    Info,
}

impl fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            NotificationKind::Reminder => "reminder",
            NotificationKind::Deadline => "deadline",
            NotificationKind::Info => "info",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub id: String,
    pub title: String,
    pub message: String,
    #[serde(rename = "type")]
    pub kind: NotificationKind,
    pub task_id: Option<String>,
    pub read: bool,
    pub created_at: DateTime<Utc>,
}

/// Process-wide notification list. Entries stay until marked read or cleared.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NotificationCenter {
    items: Vec<Notification>,
}

impl NotificationCenter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an unread notification and return its id.
    pub fn push(
        &mut self,
        title: impl Into<String>,
        message: impl Into<String>,
        kind: NotificationKind,
        task_id: Option<String>,
    ) -> String {
        let notification = Notification {
            id: format!("notif-{}", uuid::Uuid::new_v4()),
            title: title.into(),
            message: message.into(),
            kind,
            task_id,
            read: false,
            created_at: Utc::now(),
        };
        tracing::info!(kind = %kind, title = %notification.title, "notification added");
        let id = notification.id.clone();
        self.items.push(notification);
        id
    }

    pub fn all(&self) -> &[Notification] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&Notification> {
        self.items.iter().find(|n| n.id == id)
    }

    pub fn unread(&self) -> Vec<&Notification> {
        self.items.iter().filter(|n| !n.read).collect()
    }

    pub fn unread_count(&self) -> usize {
        self.items.iter().filter(|n| !n.read).count()
    }

    /// Read notifications in insertion order, at most `limit`.
    pub fn recent_read(&self, limit: usize) -> Vec<&Notification> {
        self.items.iter().filter(|n| n.read).take(limit).collect()
    }

    /// Returns false when the id is unknown.
    pub fn mark_read(&mut self, id: &str) -> bool {
        match self.items.iter_mut().find(|n| n.id == id) {
            Some(n) => {
                n.read = true;
                true
            }
            None => false,
        }
    }

    /// Mark every notification read; returns how many changed.
    pub fn mark_all_read(&mut self) -> usize {
        let mut changed = 0;
        for n in self.items.iter_mut().filter(|n| !n.read) {
            n.read = true;
            changed += 1;
        }
        changed
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    /// Whether a notification of `kind` already references `task_id`.
    pub fn has_for_task(&self, kind: NotificationKind, task_id: &str) -> bool {
        self.items
            .iter()
            .any(|n| n.kind == kind && n.task_id.as_deref() == Some(task_id))
    }
}

/// Host notification surface, e.g. a desktop notifier.
///
/// Delivery is best effort: callers log failures and carry on.
pub trait NotificationSink: Send {
    fn notify(
        &mut self,
        title: &str,
        body: &str,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;
}
