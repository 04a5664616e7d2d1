//! The task collection owned by a single page.
//!
//! All operations are synchronous and run to completion. Unknown ids are
//! silent no-ops; the boolean returns only tell the caller whether anything
//! changed.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::{Priority, Task, TaskDraft, TaskPatch};
use crate::error::ValidationError;

/// Priority criterion of a [`TaskFilter`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PriorityFilter {
    #[default]
    All,
    #[serde(untagged)]
    Only(Priority),
}

impl PriorityFilter {
    pub fn matches(self, priority: Priority) -> bool {
        match self {
            PriorityFilter::All => true,
            PriorityFilter::Only(p) => p == priority,
        }
    }
}

impl FromStr for PriorityFilter {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().eq_ignore_ascii_case("all") {
            return Ok(PriorityFilter::All);
        }
        s.parse().map(PriorityFilter::Only)
    }
}

/// Search text plus priority; both must match.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskFilter {
    #[serde(default)]
    pub search_text: String,
    #[serde(default)]
    pub priority: PriorityFilter,
}

impl TaskFilter {
    pub fn new(search_text: impl Into<String>, priority: PriorityFilter) -> Self {
        Self {
            search_text: search_text.into(),
            priority,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GroupBy {
    #[default]
    None,
    Priority,
    Status,
}

impl fmt::Display for GroupBy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            GroupBy::None => "none",
            GroupBy::Priority => "priority",
            GroupBy::Status => "status",
        })
    }
}

impl FromStr for GroupBy {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "none" => Ok(GroupBy::None),
            "priority" => Ok(GroupBy::Priority),
            "status" => Ok(GroupBy::Status),
            other => Err(ValidationError::InvalidValue {
                field: "group_by".into(),
                message: format!("expected none, priority or status, got '{other}'"),
            }),
        }
    }
}

/// A labelled run of tasks, in their original relative order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TaskGroup<'a> {
    pub key: String,
    pub tasks: Vec<&'a Task>,
}

pub const ALL_TASKS_GROUP: &str = "All Tasks";
pub const PENDING_GROUP: &str = "Pending";
pub const COMPLETED_GROUP: &str = "Completed";

/// Group an already filtered sequence of tasks.
///
/// - `None`: one "All Tasks" group.
/// - `Priority`: one group per priority present, keyed in first-encounter order.
/// - `Status`: always "Pending" then "Completed", even when empty.
pub fn group_tasks<'a>(tasks: &[&'a Task], by: GroupBy) -> Vec<TaskGroup<'a>> {
    match by {
        GroupBy::None => vec![TaskGroup {
            key: ALL_TASKS_GROUP.to_string(),
            tasks: tasks.to_vec(),
        }],
        GroupBy::Priority => {
            let mut groups: Vec<TaskGroup<'a>> = Vec::new();
            for &task in tasks {
                let key = task.priority.as_str();
                match groups.iter_mut().find(|g| g.key == key) {
                    Some(group) => group.tasks.push(task),
                    None => groups.push(TaskGroup {
                        key: key.to_string(),
                        tasks: vec![task],
                    }),
                }
            }
            groups
        }
        GroupBy::Status => {
            let (completed, pending): (Vec<&Task>, Vec<&Task>) =
                tasks.iter().copied().partition(|t| t.completed);
            vec![
                TaskGroup {
                    key: PENDING_GROUP.to_string(),
                    tasks: pending,
                },
                TaskGroup {
                    key: COMPLETED_GROUP.to_string(),
                    tasks: completed,
                },
            ]
        }
    }
}

/// Ordered tasks of one page.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskCollection {
    tasks: Vec<Task>,
}

impl TaskCollection {
    pub fn new() -> Self {
        Self::default()
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Task> {
        self.tasks.iter()
    }

    pub fn as_slice(&self) -> &[Task] {
        &self.tasks
    }

    pub fn get(&self, id: &str) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.get(id).is_some()
    }

    /// Tasks matching `filter`, in collection order. Never mutates.
    pub fn filter_tasks(&self, filter: &TaskFilter) -> Vec<&Task> {
        let needle = filter.search_text.to_lowercase();
        self.tasks
            .iter()
            .filter(|t| t.matches_lowercase(&needle) && filter.priority.matches(t.priority))
            .collect()
    }

    pub fn group_tasks(&self, by: GroupBy) -> Vec<TaskGroup<'_>> {
        let all: Vec<&Task> = self.tasks.iter().collect();
        group_tasks(&all, by)
    }

    pub fn pending_count(&self) -> usize {
        self.tasks.iter().filter(|t| !t.completed).count()
    }

    pub fn completed_count(&self) -> usize {
        self.len() - self.pending_count()
    }

    pub fn overdue_count(&self) -> usize {
        self.overdue_count_at(Utc::now())
    }

    pub fn overdue_count_at(&self, now: DateTime<Utc>) -> usize {
        self.tasks.iter().filter(|t| t.is_overdue(now)).count()
    }

    pub fn overdue_at(&self, now: DateTime<Utc>) -> Vec<&Task> {
        self.tasks.iter().filter(|t| t.is_overdue(now)).collect()
    }

    /// Tasks whose due date falls on `day` (UTC calendar day).
    pub fn tasks_due_on(&self, day: NaiveDate) -> Vec<&Task> {
        self.tasks
            .iter()
            .filter(|t| t.due_date.is_some_and(|d| d.date_naive() == day))
            .collect()
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Append a new task built from `draft`. The draft is trusted: callers
    /// validate titles beforehand.
    pub fn create_task(&mut self, draft: TaskDraft) -> &Task {
        let task = Task::from_draft(draft);
        tracing::debug!(task_id = %task.id, title = %task.title, "task created");
        self.tasks.push(task);
        &self.tasks[self.tasks.len() - 1]
    }

    /// Shallow-merge `patch` into the task and refresh `updated_at`.
    /// Returns false when the id is unknown.
    pub fn update_task(&mut self, id: &str, patch: TaskPatch) -> bool {
        let Some(task) = self.tasks.iter_mut().find(|t| t.id == id) else {
            return false;
        };
        patch.apply_to(task);
        task.touch();
        tracing::debug!(task_id = %id, "task updated");
        true
    }

    pub fn delete_task(&mut self, id: &str) -> bool {
        self.take_task(id).is_some()
    }

    /// Remove and return a task, for moves between pages.
    pub fn take_task(&mut self, id: &str) -> Option<Task> {
        let index = self.tasks.iter().position(|t| t.id == id)?;
        tracing::debug!(task_id = %id, "task removed");
        Some(self.tasks.remove(index))
    }

    /// Append a task that was taken from another collection.
    pub fn insert_existing(&mut self, mut task: Task) {
        task.touch();
        self.tasks.push(task);
    }

    /// Flip the completion flag. Returns the new value.
    pub fn toggle_completed(&mut self, id: &str) -> Option<bool> {
        let completed = !self.get(id)?.completed;
        self.update_task(id, TaskPatch::completed(completed));
        Some(completed)
    }

    /// Count one finished work session against the task.
    pub fn record_pomodoro(&mut self, id: &str) -> bool {
        let Some(task) = self.tasks.iter_mut().find(|t| t.id == id) else {
            return false;
        };
        task.pomodoro_sessions = task.pomodoro_sessions.saturating_add(1);
        task.touch();
        true
    }
}

impl<'a> IntoIterator for &'a TaskCollection {
    type Item = &'a Task;
    type IntoIter = std::slice::Iter<'a, Task>;

    fn into_iter(self) -> Self::IntoIter {
        self.tasks.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn sample() -> TaskCollection {
        let mut tasks = TaskCollection::new();
        tasks.create_task(TaskDraft::new("Low one").with_priority(Priority::Low));
        tasks.create_task(TaskDraft::new("Urgent one").with_priority(Priority::Urgent));
        tasks.create_task(TaskDraft::new("Low two").with_description("groceries"));
        tasks.create_task(TaskDraft::new("Urgent two").with_priority(Priority::Urgent));
        tasks
    }

    fn titles(tasks: &[&Task]) -> Vec<String> {
        tasks.iter().map(|t| t.title.clone()).collect()
    }

    #[test]
    fn create_applies_defaults() {
        let mut tasks = TaskCollection::new();
        let task = tasks.create_task(TaskDraft::new("Write spec"));
        assert!(task.id.starts_with("task-"));
        assert!(!task.completed);
        assert_eq!(task.priority, Priority::Medium);
        assert!(task.tags.is_empty());
        assert!(task.attachments.is_empty());
        assert_eq!(task.pomodoro_sessions, 0);
        assert_eq!(task.created_at, task.updated_at);
    }

    #[test]
    fn update_merges_only_given_fields() {
        let mut tasks = TaskCollection::new();
        let id = tasks
            .create_task(TaskDraft::new("Write spec").with_tags(["docs"]))
            .id
            .clone();
        let before = tasks.get(&id).unwrap().clone();

        assert!(tasks.update_task(
            &id,
            TaskPatch {
                priority: Some(Priority::Urgent),
                ..Default::default()
            }
        ));
        let after = tasks.get(&id).unwrap();
        assert_eq!(after.priority, Priority::Urgent);
        assert_eq!(after.title, before.title);
        assert_eq!(after.tags, before.tags);
        assert_eq!(after.created_at, before.created_at);
        assert!(after.updated_at > before.updated_at);
    }

    #[test]
    fn unknown_ids_are_no_ops() {
        let mut tasks = sample();
        let snapshot = tasks.clone();
        assert!(!tasks.update_task("missing", TaskPatch::completed(true)));
        assert!(!tasks.delete_task("missing"));
        assert!(tasks.toggle_completed("missing").is_none());
        assert!(!tasks.record_pomodoro("missing"));
        assert_eq!(tasks, snapshot);
    }

    #[test]
    fn filter_by_text_and_priority() {
        let tasks = sample();
        let all = tasks.filter_tasks(&TaskFilter::default());
        assert_eq!(all.len(), 4);

        let urgent =
            tasks.filter_tasks(&TaskFilter::new("", PriorityFilter::Only(Priority::Urgent)));
        assert_eq!(titles(&urgent), vec!["Urgent one", "Urgent two"]);

        let by_description = tasks.filter_tasks(&TaskFilter::new("GROCER", PriorityFilter::All));
        assert_eq!(titles(&by_description), vec!["Low two"]);

        let none =
            tasks.filter_tasks(&TaskFilter::new("one", PriorityFilter::Only(Priority::High)));
        assert!(none.is_empty());
    }

    #[test]
    fn group_by_priority_keeps_first_encounter_order() {
        let tasks = sample();
        let groups = tasks.group_tasks(GroupBy::Priority);
        let keys: Vec<_> = groups.iter().map(|g| g.key.as_str()).collect();
        assert_eq!(keys, vec!["low", "urgent", "medium"]);
        assert_eq!(titles(&groups[1].tasks), vec!["Urgent one", "Urgent two"]);
    }

    #[test]
    fn group_by_status_always_has_two_groups() {
        let mut tasks = sample();
        let empty = TaskCollection::new();
        let groups = empty.group_tasks(GroupBy::Status);
        assert_eq!(groups.len(), 2);
        assert!(groups.iter().all(|g| g.tasks.is_empty()));

        let id = tasks.iter().nth(1).unwrap().id.clone();
        tasks.toggle_completed(&id);
        let groups = tasks.group_tasks(GroupBy::Status);
        assert_eq!(groups[0].key, PENDING_GROUP);
        assert_eq!(groups[0].tasks.len(), 3);
        assert_eq!(groups[1].key, COMPLETED_GROUP);
        assert_eq!(titles(&groups[1].tasks), vec!["Urgent one"]);
    }

    #[test]
    fn group_none_is_single_group() {
        let tasks = sample();
        let groups = tasks.group_tasks(GroupBy::None);
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].key, ALL_TASKS_GROUP);
        assert_eq!(groups[0].tasks.len(), 4);
    }

    #[test]
    fn counts() {
        let now = Utc.with_ymd_and_hms(2026, 1, 15, 9, 0, 0).unwrap();
        let mut tasks = TaskCollection::new();
        tasks.create_task(TaskDraft::new("past").with_due_date(now - Duration::days(1)));
        tasks.create_task(TaskDraft::new("future").with_due_date(now + Duration::days(1)));
        let done = tasks
            .create_task(TaskDraft::new("past but done").with_due_date(now - Duration::days(2)))
            .id
            .clone();
        tasks.create_task(TaskDraft::new("no date"));
        tasks.update_task(&done, TaskPatch::completed(true));

        assert_eq!(tasks.pending_count(), 3);
        assert_eq!(tasks.completed_count(), 1);
        assert_eq!(tasks.overdue_count_at(now), 1);
        assert_eq!(titles(&tasks.overdue_at(now)), vec!["past"]);
    }

    #[test]
    fn record_pomodoro_only_increments() {
        let mut tasks = TaskCollection::new();
        let id = tasks.create_task(TaskDraft::new("focus")).id.clone();
        tasks.record_pomodoro(&id);
        tasks.record_pomodoro(&id);
        tasks.update_task(&id, TaskPatch::completed(true));
        assert_eq!(tasks.get(&id).unwrap().pomodoro_sessions, 2);
    }

    #[test]
    fn tasks_due_on_matches_calendar_day() {
        let mut tasks = TaskCollection::new();
        let day = Utc.with_ymd_and_hms(2026, 2, 3, 23, 0, 0).unwrap();
        tasks.create_task(TaskDraft::new("late").with_due_date(day));
        tasks.create_task(TaskDraft::new("next").with_due_date(day + Duration::hours(2)));
        let due = tasks.tasks_due_on(NaiveDate::from_ymd_opt(2026, 2, 3).unwrap());
        assert_eq!(titles(&due), vec!["late"]);
    }

    #[test]
    fn priority_filter_parses_all() {
        assert_eq!("ALL".parse::<PriorityFilter>().unwrap(), PriorityFilter::All);
        assert_eq!(
            "low".parse::<PriorityFilter>().unwrap(),
            PriorityFilter::Only(Priority::Low)
        );
        assert!("whatever".parse::<PriorityFilter>().is_err());
    }
}
