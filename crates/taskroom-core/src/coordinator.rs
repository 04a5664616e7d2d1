//! The single owner of application state.
//!
//! [`Coordinator`] holds the page arena, the notification center, the timer
//! engine and the current selections. Front ends read through its accessors
//! and request every mutation through its methods; nothing else holds
//! mutable references to the state.

use std::collections::HashSet;

use chrono::{DateTime, Utc};

use crate::calendar::{self, MonthGrid};
use crate::error::{Result, ValidationError};
use crate::events::Event;
use crate::export::{self, ExportDocument, ExportOptions};
use crate::notification::{NotificationCenter, NotificationKind, NotificationSink};
use crate::page::{Page, PageArena};
use crate::storage::Config;
use crate::task::{validate_title, Task, TaskDraft, TaskPatch};
use crate::timer::{TimerEngine, TimerMode};

pub const DEFAULT_PAGE_ID: &str = "default";
pub const DEFAULT_PAGE_TITLE: &str = "My Tasks";
pub const STARTUP_PAGE_ICON: &str = "📋";

pub const TIMER_NOTIFICATION_TITLE: &str = "Pomodoro Timer";
pub const BREAK_MESSAGE: &str = "Time for a break!";
pub const FOCUS_MESSAGE: &str = "Time to focus!";

pub struct Coordinator {
    pages: PageArena,
    notifications: NotificationCenter,
    timer: TimerEngine,
    sink: Option<Box<dyn NotificationSink>>,
    forward_to_sink: bool,
    export_options: ExportOptions,
    current_page: Option<String>,
    /// `(page_id, task_id)` of the task the timer is working on
    current_task: Option<(String, String)>,
    /// Tasks already flagged overdue; survives clearing notifications
    deadline_notified: HashSet<String>,
}

impl Coordinator {
    /// Fresh state with the default "My Tasks" page selected.
    pub fn new() -> Self {
        Self::with_config(&Config::default())
    }

    pub fn with_config(config: &Config) -> Self {
        let mut pages = PageArena::new();
        pages.create_page_with_id(
            DEFAULT_PAGE_ID,
            DEFAULT_PAGE_TITLE,
            Some(STARTUP_PAGE_ICON.into()),
        );
        Self {
            pages,
            notifications: NotificationCenter::new(),
            timer: TimerEngine::with_durations(config.durations()),
            sink: None,
            forward_to_sink: config.notifications.enabled,
            export_options: config.export_options(),
            current_page: Some(DEFAULT_PAGE_ID.to_string()),
            current_task: None,
            deadline_notified: HashSet::new(),
        }
    }

    /// Attach the host notification surface.
    pub fn with_sink(mut self, sink: Box<dyn NotificationSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    // ── Read access ──────────────────────────────────────────────────

    pub fn pages(&self) -> &PageArena {
        &self.pages
    }

    pub fn page(&self, id: &str) -> Option<&Page> {
        self.pages.get(id)
    }

    pub fn notifications(&self) -> &NotificationCenter {
        &self.notifications
    }

    pub fn timer(&self) -> &TimerEngine {
        &self.timer
    }

    pub fn current_page(&self) -> Option<&Page> {
        self.current_page.as_deref().and_then(|id| self.pages.get(id))
    }

    pub fn current_page_id(&self) -> Option<&str> {
        self.current_page.as_deref()
    }

    pub fn current_task(&self) -> Option<&Task> {
        let (page_id, task_id) = self.current_task.as_ref()?;
        self.pages.get(page_id)?.tasks.get(task_id)
    }

    pub fn find_task(&self, task_id: &str) -> Option<(&Page, &Task)> {
        let page_id = self.pages.task_owner(task_id)?;
        let page = self.pages.get(page_id)?;
        Some((page, page.tasks.get(task_id)?))
    }

    // ── Pages ────────────────────────────────────────────────────────

    /// Create a page under `parent` (or at the top level).
    ///
    /// # Errors
    /// Rejects blank titles and unknown parents.
    pub fn create_page(
        &mut self,
        title: &str,
        icon: Option<String>,
        parent: Option<&str>,
    ) -> Result<String> {
        let title = validate_title(title, "page")?;
        if let Some(parent) = parent {
            self.require_page(parent)?;
        }
        Ok(self.pages.create_page(title, icon, parent).id.clone())
    }

    pub fn rename_page(&mut self, id: &str, title: &str) -> Result<bool> {
        let title = validate_title(title, "page")?;
        Ok(self.pages.rename_page(id, title))
    }

    /// Delete a page and its subtree, clearing selections that pointed
    /// into it. Deleting the last page recreates the default page.
    pub fn delete_page(&mut self, id: &str) -> bool {
        let removed = self.pages.delete_page(id);
        if removed.is_empty() {
            return false;
        }
        if self.current_page.as_ref().is_some_and(|p| removed.contains(p)) {
            self.current_page = self.pages.roots().first().map(|p| p.id.clone());
        }
        if self.current_task.as_ref().is_some_and(|(p, _)| removed.contains(p)) {
            self.current_task = None;
        }
        if self.pages.is_empty() {
            self.pages.create_page_with_id(
                DEFAULT_PAGE_ID,
                DEFAULT_PAGE_TITLE,
                Some(STARTUP_PAGE_ICON.into()),
            );
            self.current_page = Some(DEFAULT_PAGE_ID.to_string());
        }
        true
    }

    pub fn select_page(&mut self, id: &str) -> Result<()> {
        self.require_page(id)?;
        self.current_page = Some(id.to_string());
        Ok(())
    }

    // ── Tasks ────────────────────────────────────────────────────────

    /// Validate `draft` and append it to `page_id`. Returns the new task id.
    pub fn create_task(&mut self, page_id: &str, draft: TaskDraft) -> Result<String> {
        let draft = draft.validated()?;
        let page = self.page_mut(page_id)?;
        let id = page.tasks.create_task(draft).id.clone();
        page.touch();
        Ok(id)
    }

    /// Returns Ok(false) when the task is not on that page.
    pub fn update_task(&mut self, page_id: &str, task_id: &str, patch: TaskPatch) -> Result<bool> {
        let patch = patch.validated()?;
        let page = self.page_mut(page_id)?;
        let changed = page.tasks.update_task(task_id, patch);
        if changed {
            page.touch();
        }
        Ok(changed)
    }

    pub fn toggle_task(&mut self, page_id: &str, task_id: &str) -> Result<Option<bool>> {
        let page = self.page_mut(page_id)?;
        let flipped = page.tasks.toggle_completed(task_id);
        if flipped.is_some() {
            page.touch();
        }
        Ok(flipped)
    }

    pub fn delete_task(&mut self, page_id: &str, task_id: &str) -> Result<bool> {
        let page = self.page_mut(page_id)?;
        let removed = page.tasks.delete_task(task_id);
        if removed {
            page.touch();
            if self
                .current_task
                .as_ref()
                .is_some_and(|(p, t)| p == page_id && t == task_id)
            {
                self.current_task = None;
            }
        }
        Ok(removed)
    }

    /// Move a task to the end of another page. The task keeps its id and
    /// fields; it is removed from the source before it is appended.
    pub fn move_task(&mut self, from: &str, task_id: &str, to: &str) -> Result<bool> {
        self.require_page(to)?;
        let Some(task) = self.page_mut(from)?.tasks.take_task(task_id) else {
            return Ok(false);
        };
        if let Some(page) = self.pages.get_mut(from) {
            page.touch();
        }
        let target = self.page_mut(to)?;
        target.tasks.insert_existing(task);
        target.touch();
        if let Some((page, task)) = self.current_task.as_mut() {
            if task.as_str() == task_id && page.as_str() == from {
                *page = to.to_string();
            }
        }
        Ok(true)
    }

    /// Choose the task the timer is working on. `None` clears it.
    pub fn select_task(&mut self, selection: Option<(&str, &str)>) -> Result<()> {
        match selection {
            None => self.current_task = None,
            Some((page_id, task_id)) => {
                let page = self
                    .pages
                    .get(page_id)
                    .ok_or_else(|| ValidationError::UnknownPage(page_id.to_string()))?;
                if !page.tasks.contains(task_id) {
                    return Err(ValidationError::InvalidValue {
                        field: "task".into(),
                        message: format!("no task {task_id} on page {page_id}"),
                    }
                    .into());
                }
                self.current_task = Some((page_id.to_string(), task_id.to_string()));
            }
        }
        Ok(())
    }

    // ── Timer ────────────────────────────────────────────────────────

    pub fn start_timer(&mut self) -> Option<Event> {
        let event = self.timer.start();
        self.observe(event)
    }

    pub fn pause_timer(&mut self) -> Option<Event> {
        self.timer.pause()
    }

    pub fn toggle_timer(&mut self) -> Option<Event> {
        let event = self.timer.toggle();
        self.observe(event)
    }

    pub fn reset_timer(&mut self) -> Option<Event> {
        self.timer.reset()
    }

    /// Ignored while the timer runs.
    pub fn set_timer_mode(&mut self, mode: TimerMode) -> Option<Event> {
        self.timer.set_mode(mode)
    }

    /// Advance the countdown by one second.
    pub fn tick(&mut self) -> Option<Event> {
        let event = self.timer.tick();
        self.observe(event)
    }

    fn observe(&mut self, event: Option<Event>) -> Option<Event> {
        if let Some(event) = &event {
            self.handle_timer_event(event);
        }
        event
    }

    /// React to a timer completion: credit the current task, add a
    /// reminder, and forward it to the host surface when one is attached.
    pub fn handle_timer_event(&mut self, event: &Event) {
        let Some((finished, _next)) = event.completion() else {
            return;
        };

        let task_id = self.current_task.as_ref().map(|(_, t)| t.clone());
        if finished == TimerMode::Work {
            if let Some((page_id, task_id)) = self.current_task.clone() {
                if let Some(page) = self.pages.get_mut(&page_id) {
                    if page.tasks.record_pomodoro(&task_id) {
                        page.touch();
                    }
                }
            }
        }

        let message = if finished == TimerMode::Work {
            BREAK_MESSAGE
        } else {
            FOCUS_MESSAGE
        };
        self.notifications
            .push(TIMER_NOTIFICATION_TITLE, message, NotificationKind::Reminder, task_id);

        if self.forward_to_sink {
            if let Some(sink) = self.sink.as_mut() {
                if let Err(e) = sink.notify(TIMER_NOTIFICATION_TITLE, message) {
                    tracing::warn!(error = %e, "host notification failed");
                }
            }
        }
    }

    // ── Notifications ────────────────────────────────────────────────

    pub fn notify(&mut self, title: &str, message: &str, kind: NotificationKind) -> String {
        self.notifications.push(title, message, kind, None)
    }

    pub fn mark_notification_read(&mut self, id: &str) -> bool {
        self.notifications.mark_read(id)
    }

    pub fn mark_all_notifications_read(&mut self) -> usize {
        self.notifications.mark_all_read()
    }

    pub fn clear_notifications(&mut self) {
        self.notifications.clear();
    }

    /// Add one deadline notification per overdue task that has not had
    /// one yet. Returns how many were added.
    pub fn check_deadlines(&mut self, now: DateTime<Utc>) -> usize {
        let overdue: Vec<(String, String)> = self
            .pages
            .walk()
            .into_iter()
            .flat_map(|(_, page)| page.tasks.overdue_at(now))
            .filter(|t| !self.deadline_notified.contains(&t.id))
            .map(|t| (t.id.clone(), t.title.clone()))
            .collect();

        for (task_id, title) in &overdue {
            self.deadline_notified.insert(task_id.clone());
            self.notifications.push(
                "Task overdue",
                format!("\"{title}\" is past its due date"),
                NotificationKind::Deadline,
                Some(task_id.clone()),
            );
        }
        overdue.len()
    }

    // ── Views ────────────────────────────────────────────────────────

    pub fn export_page(&self, id: &str) -> Result<ExportDocument> {
        let page = self.require_page(id)?;
        Ok(export::render_page(page, self.export_options))
    }

    pub fn calendar_month(&self, id: &str, year: i32, month: u32) -> Result<MonthGrid<'_>> {
        let page = self.require_page(id)?;
        let today = Utc::now().date_naive();
        Ok(calendar::month_grid(&page.tasks, year, month, today)?)
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn require_page(&self, id: &str) -> Result<&Page> {
        self.pages
            .get(id)
            .ok_or_else(|| ValidationError::UnknownPage(id.to_string()).into())
    }

    fn page_mut(&mut self, id: &str) -> Result<&mut Page> {
        self.pages
            .get_mut(id)
            .ok_or_else(|| ValidationError::UnknownPage(id.to_string()).into())
    }
}

impl Default for Coordinator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timer::TimerDurations;
    use std::sync::{Arc, Mutex};

    struct RecordingSink(Arc<Mutex<Vec<String>>>);

    impl NotificationSink for RecordingSink {
        fn notify(
            &mut self,
            _title: &str,
            body: &str,
        ) -> std::result::Result<(), Box<dyn std::error::Error + Send + Sync>> {
            self.0.lock().unwrap().push(body.to_string());
            Ok(())
        }
    }

    struct FailingSink;

    impl NotificationSink for FailingSink {
        fn notify(
            &mut self,
            _title: &str,
            _body: &str,
        ) -> std::result::Result<(), Box<dyn std::error::Error + Send + Sync>> {
            Err("permission denied".into())
        }
    }

    fn one_minute_config() -> Config {
        let mut config = Config::default();
        config.timer.work_minutes = 1;
        config.timer.short_break_minutes = 1;
        config.timer.long_break_minutes = 1;
        config
    }

    fn finish(coord: &mut Coordinator) -> Event {
        coord.start_timer();
        loop {
            if let Some(event) = coord.tick() {
                return event;
            }
        }
    }

    #[test]
    fn starts_with_default_page_selected() {
        let coord = Coordinator::new();
        let page = coord.current_page().unwrap();
        assert_eq!(page.id, DEFAULT_PAGE_ID);
        assert_eq!(page.title, "My Tasks");
        assert_eq!(page.icon.as_deref(), Some("📋"));
        assert_eq!(coord.timer().durations(), TimerDurations::default());
    }

    #[test]
    fn blank_titles_never_reach_the_store() {
        let mut coord = Coordinator::new();
        assert!(coord.create_task(DEFAULT_PAGE_ID, TaskDraft::new("   ")).is_err());
        assert!(coord.create_page("", None, None).is_err());
        assert!(coord.current_page().unwrap().tasks.is_empty());
    }

    #[test]
    fn unknown_page_is_rejected() {
        let mut coord = Coordinator::new();
        assert!(coord.create_task("nope", TaskDraft::new("x")).is_err());
        assert!(coord.select_page("nope").is_err());
        assert!(coord.create_page("Child", None, Some("nope")).is_err());
    }

    #[test]
    fn work_completion_credits_task_and_notifies() {
        let sent = Arc::new(Mutex::new(Vec::new()));
        let mut coord = Coordinator::with_config(&one_minute_config())
            .with_sink(Box::new(RecordingSink(sent.clone())));
        let task = coord.create_task(DEFAULT_PAGE_ID, TaskDraft::new("Deep work")).unwrap();
        coord.select_task(Some((DEFAULT_PAGE_ID, task.as_str()))).unwrap();

        finish(&mut coord);
        assert_eq!(coord.current_task().unwrap().pomodoro_sessions, 1);
        let unread = coord.notifications().unread();
        assert_eq!(unread.len(), 1);
        assert_eq!(unread[0].message, BREAK_MESSAGE);
        assert_eq!(unread[0].task_id.as_deref(), Some(task.as_str()));

        // Break completion notifies but does not credit the task.
        finish(&mut coord);
        assert_eq!(coord.current_task().unwrap().pomodoro_sessions, 1);
        assert_eq!(*sent.lock().unwrap(), vec![BREAK_MESSAGE, FOCUS_MESSAGE]);
    }

    #[test]
    fn sink_failure_does_not_affect_timer() {
        let mut coord =
            Coordinator::with_config(&one_minute_config()).with_sink(Box::new(FailingSink));
        finish(&mut coord);
        assert_eq!(coord.timer().completed_sessions(), 1);
        assert_eq!(coord.notifications().unread_count(), 1);
    }

    #[test]
    fn disabled_notifications_skip_the_sink() {
        let sent = Arc::new(Mutex::new(Vec::new()));
        let mut config = one_minute_config();
        config.notifications.enabled = false;
        let mut coord =
            Coordinator::with_config(&config).with_sink(Box::new(RecordingSink(sent.clone())));
        finish(&mut coord);
        assert!(sent.lock().unwrap().is_empty());
        assert_eq!(coord.notifications().len(), 1);
    }

    #[test]
    fn move_task_between_pages() {
        let mut coord = Coordinator::new();
        let target = coord.create_page("Later", None, None).unwrap();
        let task = coord.create_task(DEFAULT_PAGE_ID, TaskDraft::new("Shift me")).unwrap();
        coord.select_task(Some((DEFAULT_PAGE_ID, task.as_str()))).unwrap();

        assert!(coord.move_task(DEFAULT_PAGE_ID, &task, &target).unwrap());
        assert!(coord.page(DEFAULT_PAGE_ID).unwrap().tasks.is_empty());
        assert!(coord.page(&target).unwrap().tasks.contains(&task));
        assert_eq!(coord.current_task().unwrap().id, task);
        assert!(!coord.move_task(DEFAULT_PAGE_ID, &task, &target).unwrap());
    }

    #[test]
    fn deleting_selected_task_clears_selection() {
        let mut coord = Coordinator::new();
        let task = coord.create_task(DEFAULT_PAGE_ID, TaskDraft::new("Temp")).unwrap();
        coord.select_task(Some((DEFAULT_PAGE_ID, task.as_str()))).unwrap();
        assert!(coord.delete_task(DEFAULT_PAGE_ID, &task).unwrap());
        assert!(coord.current_task().is_none());
        assert!(!coord.delete_task(DEFAULT_PAGE_ID, &task).unwrap());
    }

    #[test]
    fn deleting_last_page_recreates_default() {
        let mut coord = Coordinator::new();
        assert!(coord.delete_page(DEFAULT_PAGE_ID));
        assert_eq!(coord.current_page_id(), Some(DEFAULT_PAGE_ID));
        assert_eq!(coord.pages().len(), 1);
    }

    #[test]
    fn deadlines_notify_once_per_task() {
        let mut coord = Coordinator::new();
        let now = Utc::now();
        coord
            .create_task(
                DEFAULT_PAGE_ID,
                TaskDraft::new("Late report").with_due_date(now - chrono::Duration::days(1)),
            )
            .unwrap();
        coord
            .create_task(
                DEFAULT_PAGE_ID,
                TaskDraft::new("Fine").with_due_date(now + chrono::Duration::days(1)),
            )
            .unwrap();
        assert_eq!(coord.check_deadlines(now), 1);
        assert_eq!(coord.check_deadlines(now), 0);
        let n = &coord.notifications().all()[0];
        assert_eq!(n.kind, NotificationKind::Deadline);
        assert!(n.message.contains("Late report"));
    }

    #[test]
    fn overdue_task_is_flagged_once_even_after_clear() {
        let mut coord = Coordinator::new();
        let now = Utc::now();
        coord
            .create_task(
                DEFAULT_PAGE_ID,
                TaskDraft::new("Late report").with_due_date(now - chrono::Duration::days(1)),
            )
            .unwrap();
        assert_eq!(coord.check_deadlines(now), 1);
        coord.clear_notifications();
        assert_eq!(coord.check_deadlines(now), 0);
        assert!(coord.notifications().is_empty());
    }

    #[test]
    fn page_touch_on_task_mutation() {
        let mut coord = Coordinator::new();
        let before = coord.page(DEFAULT_PAGE_ID).unwrap().updated_at;
        coord.create_task(DEFAULT_PAGE_ID, TaskDraft::new("x")).unwrap();
        assert!(coord.page(DEFAULT_PAGE_ID).unwrap().updated_at > before);
    }
}
