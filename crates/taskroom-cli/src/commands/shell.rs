//! Interactive shell.
//!
//! Every line is split with `shlex` and parsed as a subcommand. All state
//! lives in one [`Coordinator`] for the life of the process; nothing is
//! written to disk except explicit exports. While the timer runs, a
//! [`Ticker`] feeds it one tick per second between commands.

use std::io::{IsTerminal, Write};
use std::path::PathBuf;

use chrono::{Datelike, Utc};
use clap::{Parser, Subcommand};
use tokio::sync::mpsc;

use taskroom_core::calendar::{self, WEEKDAY_LABELS};
use taskroom_core::export::status_mark;
use taskroom_core::notification::READ_DISPLAY_LIMIT;
use taskroom_core::task::{parse_due_date, GroupBy, PriorityFilter};
use taskroom_core::{
    Config, Coordinator, Event, Page, Priority, Task, TaskDraft, TaskFilter, TaskPatch, Ticker,
    TimerMode,
};

use super::sink::TerminalSink;

type CmdResult<T = ()> = Result<T, Box<dyn std::error::Error>>;

#[derive(Parser)]
#[command(name = "taskroom", no_binary_name = true, disable_version_flag = true)]
struct ShellLine {
    #[command(subcommand)]
    command: ShellCommand,
}

#[derive(Subcommand)]
enum ShellCommand {
    /// Page management
    Page {
        #[command(subcommand)]
        action: PageAction,
    },
    /// Tasks on the current page
    Task {
        #[command(subcommand)]
        action: TaskAction,
    },
    /// Pomodoro timer
    Timer {
        #[command(subcommand)]
        action: TimerAction,
    },
    /// In-app notifications
    Notify {
        #[command(subcommand)]
        action: NotifyAction,
    },
    /// Flag overdue tasks on every page
    Deadlines,
    /// Export the current page; prints it when no path is given
    Export {
        /// Output file, or a directory to place the default file name in
        path: Option<PathBuf>,
    },
    /// Month view of the current page
    Calendar {
        /// Month as YYYY-MM (default: this month)
        month: Option<String>,
    },
    /// Leave the shell
    #[command(alias = "exit")]
    Quit,
}

#[derive(Subcommand)]
enum PageAction {
    /// Create a page
    New {
        #[arg(required = true, num_args = 1..)]
        title: Vec<String>,
        #[arg(long)]
        icon: Option<String>,
        /// Parent page (number, id or title)
        #[arg(long)]
        parent: Option<String>,
    },
    /// Show the page tree
    List,
    /// Switch the current page
    Use { page: String },
    /// Rename a page
    Rename {
        page: String,
        #[arg(required = true, num_args = 1..)]
        title: Vec<String>,
    },
    /// Delete a page and its subpages
    Delete { page: String },
}

#[derive(Subcommand)]
enum TaskAction {
    /// Add a task
    Add {
        #[arg(required = true, num_args = 1..)]
        title: Vec<String>,
        #[arg(short, long)]
        description: Option<String>,
        #[arg(short, long)]
        priority: Option<Priority>,
        /// YYYY-MM-DD or RFC 3339
        #[arg(long)]
        due: Option<String>,
        /// Comma-separated tags
        #[arg(short, long)]
        tags: Option<String>,
    },
    /// List tasks
    List {
        #[arg(short, long, default_value = "")]
        search: String,
        /// urgent, high, medium, low or all
        #[arg(short, long, default_value = "all")]
        priority: PriorityFilter,
        /// none, priority or status
        #[arg(short, long, default_value = "none")]
        group: GroupBy,
    },
    /// Edit a task
    Edit {
        task: String,
        #[arg(long)]
        title: Option<String>,
        #[arg(short, long)]
        description: Option<String>,
        #[arg(long, conflicts_with = "description")]
        clear_description: bool,
        #[arg(short, long)]
        priority: Option<Priority>,
        #[arg(long)]
        due: Option<String>,
        #[arg(long, conflicts_with = "due")]
        clear_due: bool,
        /// Comma-separated tags, replacing the current ones
        #[arg(short, long)]
        tags: Option<String>,
    },
    /// Toggle completion
    Done { task: String },
    /// Delete a task
    Delete { task: String },
    /// Move a task to another page
    Move { task: String, page: String },
    /// Choose the task the timer credits; no argument clears it
    Select { task: Option<String> },
    /// List grouped by none, priority or status
    Group { by: GroupBy },
}

#[derive(Subcommand)]
enum TimerAction {
    Start,
    Pause,
    Reset,
    /// Switch to work, short-break or long-break
    Mode { mode: TimerMode },
    /// Advance the countdown by hand
    Tick {
        #[arg(default_value = "1")]
        seconds: u64,
    },
    Status,
}

#[derive(Subcommand)]
enum NotifyAction {
    List,
    /// Mark one notification read (number in the unread list, or id)
    Read { notification: String },
    ReadAll,
    Clear,
}

enum Flow {
    Continue,
    Quit,
}

struct Shell {
    coord: Coordinator,
    json: bool,
}

pub fn run(json: bool) -> CmdResult {
    let config = Config::load_or_default();
    let coord = Coordinator::with_config(&config)
        .with_sink(Box::new(TerminalSink::new(config.notifications.bell)));
    let mut shell = Shell { coord, json };

    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(shell.run_loop());
    Ok(())
}

/// Stdin is read on a plain thread so that quitting never waits on a
/// pending read.
fn spawn_line_reader() -> mpsc::Receiver<String> {
    let (tx, rx) = mpsc::channel(16);
    std::thread::spawn(move || {
        for line in std::io::stdin().lines() {
            let Ok(line) = line else { break };
            if tx.blocking_send(line).is_err() {
                break;
            }
        }
    });
    rx
}

async fn next_tick(ticker: &mut Option<(Ticker, mpsc::Receiver<()>)>) -> Option<()> {
    match ticker {
        Some((_, ticks)) => ticks.recv().await,
        None => std::future::pending().await,
    }
}

impl Shell {
    async fn run_loop(&mut self) {
        let interactive = std::io::stdin().is_terminal();
        let mut lines = spawn_line_reader();
        let mut ticker: Option<(Ticker, mpsc::Receiver<()>)> = None;

        if interactive {
            println!("taskroom shell. Type 'help' for commands, 'quit' to leave.");
            prompt();
        }

        loop {
            tokio::select! {
                line = lines.recv() => {
                    let Some(line) = line else { break };
                    if let Flow::Quit = self.execute(&line) {
                        break;
                    }
                    self.sync_ticker(&mut ticker);
                    if interactive {
                        prompt();
                    }
                }
                Some(()) = next_tick(&mut ticker) => {
                    if let Some(event) = self.coord.tick() {
                        self.report(&event);
                        if interactive {
                            prompt();
                        }
                    }
                    self.sync_ticker(&mut ticker);
                }
            }
        }
    }

    /// Keep a ticker alive exactly while the engine runs.
    fn sync_ticker(&self, ticker: &mut Option<(Ticker, mpsc::Receiver<()>)>) {
        match (self.coord.timer().is_running(), ticker.is_some()) {
            (true, false) => *ticker = Some(Ticker::every_second()),
            (false, true) => *ticker = None,
            _ => {}
        }
    }

    fn execute(&mut self, line: &str) -> Flow {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            return Flow::Continue;
        }
        let Some(words) = shlex::split(line) else {
            eprintln!("error: unbalanced quotes");
            return Flow::Continue;
        };
        tracing::debug!(command = %line, "shell command");
        let parsed = match ShellLine::try_parse_from(words) {
            Ok(parsed) => parsed,
            Err(e) => {
                let _ = e.print();
                return Flow::Continue;
            }
        };
        match self.dispatch(parsed.command) {
            Ok(flow) => flow,
            Err(e) => {
                eprintln!("error: {e}");
                Flow::Continue
            }
        }
    }

    fn dispatch(&mut self, command: ShellCommand) -> CmdResult<Flow> {
        match command {
            ShellCommand::Page { action } => self.page(action)?,
            ShellCommand::Task { action } => self.task(action)?,
            ShellCommand::Timer { action } => self.timer(action)?,
            ShellCommand::Notify { action } => self.notify(action)?,
            ShellCommand::Deadlines => {
                let flagged = self.coord.check_deadlines(Utc::now());
                println!("{flagged} overdue task(s) flagged");
            }
            ShellCommand::Export { path } => self.export(path)?,
            ShellCommand::Calendar { month } => self.calendar(month.as_deref())?,
            ShellCommand::Quit => return Ok(Flow::Quit),
        }
        Ok(Flow::Continue)
    }

    // ── Pages ────────────────────────────────────────────────────────

    fn page(&mut self, action: PageAction) -> CmdResult {
        match action {
            PageAction::New { title, icon, parent } => {
                let parent = parent.map(|p| self.resolve_page(&p)).transpose()?;
                let id = self.coord.create_page(&title.join(" "), icon, parent.as_deref())?;
                let page = self.page_by_id(&id)?;
                println!("Created page {} {} ({})", icon_of(page), page.title, page.id);
            }
            PageAction::List => self.print_pages()?,
            PageAction::Use { page } => {
                let id = self.resolve_page(&page)?;
                self.coord.select_page(&id)?;
                println!("Switched to {}", self.page_by_id(&id)?.title);
            }
            PageAction::Rename { page, title } => {
                let id = self.resolve_page(&page)?;
                self.coord.rename_page(&id, &title.join(" "))?;
                println!("Renamed page to {}", self.page_by_id(&id)?.title);
            }
            PageAction::Delete { page } => {
                let id = self.resolve_page(&page)?;
                let title = self.page_by_id(&id)?.title.clone();
                self.coord.delete_page(&id);
                println!("Deleted page {title}");
            }
        }
        Ok(())
    }

    fn print_pages(&self) -> CmdResult {
        let current = self.coord.current_page_id();
        let rows = self.coord.pages().walk();
        if self.json {
            let out: Vec<serde_json::Value> = rows
                .iter()
                .map(|(depth, page)| {
                    serde_json::json!({
                        "id": page.id,
                        "title": page.title,
                        "icon": page.icon,
                        "depth": depth,
                        "tasks": page.tasks.len(),
                        "current": Some(page.id.as_str()) == current,
                    })
                })
                .collect();
            println!("{}", serde_json::to_string_pretty(&out)?);
            return Ok(());
        }
        for (i, (depth, page)) in rows.iter().enumerate() {
            let marker = if Some(page.id.as_str()) == current { '*' } else { ' ' };
            println!(
                "{marker}{:>3}. {}{} {} ({} pending)",
                i + 1,
                "  ".repeat(*depth),
                icon_of(page),
                page.title,
                page.tasks.pending_count()
            );
        }
        Ok(())
    }

    /// A list number, an id, a title or a unique id prefix.
    fn resolve_page(&self, key: &str) -> CmdResult<String> {
        let rows = self.coord.pages().walk();
        if let Ok(n) = key.parse::<usize>() {
            if let Some((_, page)) = n.checked_sub(1).and_then(|i| rows.get(i)) {
                return Ok(page.id.clone());
            }
        }
        if self.coord.pages().contains(key) {
            return Ok(key.to_string());
        }
        let by_title: Vec<&Page> = rows
            .iter()
            .map(|(_, p)| *p)
            .filter(|p| p.title.eq_ignore_ascii_case(key))
            .collect();
        if let [page] = by_title.as_slice() {
            return Ok(page.id.clone());
        }
        let by_prefix: Vec<&Page> = rows
            .iter()
            .map(|(_, p)| *p)
            .filter(|p| p.id.starts_with(key))
            .collect();
        match by_prefix.as_slice() {
            [page] => Ok(page.id.clone()),
            [] => Err(format!("no page matching '{key}'").into()),
            _ => Err(format!("'{key}' matches more than one page").into()),
        }
    }

    fn page_by_id(&self, id: &str) -> CmdResult<&Page> {
        self.coord
            .page(id)
            .ok_or_else(|| format!("no page {id}").into())
    }

    fn current_page(&self) -> CmdResult<&Page> {
        self.coord.current_page().ok_or_else(|| "no page selected".into())
    }

    // ── Tasks ────────────────────────────────────────────────────────

    fn task(&mut self, action: TaskAction) -> CmdResult {
        let page_id = self.current_page()?.id.clone();
        match action {
            TaskAction::Add {
                title,
                description,
                priority,
                due,
                tags,
            } => {
                let mut draft = TaskDraft::new(title.join(" "));
                draft.description = description;
                draft.priority = priority;
                draft.due_date = due.as_deref().map(parse_due_date).transpose()?;
                draft.tags = split_tags(tags.as_deref());
                let id = self.coord.create_task(&page_id, draft)?;
                let page = self.page_by_id(&page_id)?;
                let task = page.tasks.get(&id).ok_or("task vanished")?;
                if self.json {
                    println!("{}", serde_json::to_string_pretty(task)?);
                } else {
                    println!("Added task {}: {}", page.tasks.len(), task.title);
                }
            }
            TaskAction::List {
                search,
                priority,
                group,
            } => self.print_tasks(&TaskFilter::new(search, priority), group)?,
            TaskAction::Group { by } => self.print_tasks(&TaskFilter::default(), by)?,
            TaskAction::Edit {
                task,
                title,
                description,
                clear_description,
                priority,
                due,
                clear_due,
                tags,
            } => {
                let task_id = self.resolve_task(&task)?;
                let patch = TaskPatch {
                    title,
                    description: if clear_description {
                        Some(None)
                    } else {
                        description.map(Some)
                    },
                    priority,
                    due_date: if clear_due {
                        Some(None)
                    } else {
                        due.as_deref().map(parse_due_date).transpose()?.map(Some)
                    },
                    tags: tags.as_deref().map(|t| split_tags(Some(t))),
                    ..Default::default()
                };
                if patch.is_empty() {
                    return Err("nothing to change".into());
                }
                self.coord.update_task(&page_id, &task_id, patch)?;
                println!("Updated: {}", self.task_title(&page_id, &task_id));
            }
            TaskAction::Done { task } => {
                let task_id = self.resolve_task(&task)?;
                let state = self.coord.toggle_task(&page_id, &task_id)?;
                let title = self.task_title(&page_id, &task_id);
                match state {
                    Some(true) => println!("Completed: {title}"),
                    Some(false) => println!("Reopened: {title}"),
                    None => {}
                }
            }
            TaskAction::Delete { task } => {
                let task_id = self.resolve_task(&task)?;
                let title = self.task_title(&page_id, &task_id);
                self.coord.delete_task(&page_id, &task_id)?;
                println!("Deleted: {title}");
            }
            TaskAction::Move { task, page } => {
                let task_id = self.resolve_task(&task)?;
                let target = self.resolve_page(&page)?;
                let title = self.task_title(&page_id, &task_id);
                if self.coord.move_task(&page_id, &task_id, &target)? {
                    println!("Moved '{title}' to {}", self.page_by_id(&target)?.title);
                }
            }
            TaskAction::Select { task: None } => {
                self.coord.select_task(None)?;
                println!("Timer is not tracking a task");
            }
            TaskAction::Select { task: Some(task) } => {
                let task_id = self.resolve_task(&task)?;
                self.coord
                    .select_task(Some((page_id.as_str(), task_id.as_str())))?;
                println!("Timer is tracking '{}'", self.task_title(&page_id, &task_id));
            }
        }
        Ok(())
    }

    fn print_tasks(&self, filter: &TaskFilter, group: GroupBy) -> CmdResult {
        let page = self.current_page()?;
        let matching = page.tasks.filter_tasks(filter);
        let groups = taskroom_core::task::group_tasks(&matching, group);
        if self.json {
            println!("{}", serde_json::to_string_pretty(&groups)?);
            return Ok(());
        }

        let now = Utc::now();
        println!("{} {}", icon_of(page), page.title);
        for group_entry in &groups {
            if group != GroupBy::None {
                println!("{} ({})", group_entry.key, group_entry.tasks.len());
            }
            for task in &group_entry.tasks {
                let number = page
                    .tasks
                    .iter()
                    .position(|t| t.id == task.id)
                    .map_or(0, |i| i + 1);
                println!("{:>4}. {}", number, task_line(task, now));
            }
        }
        println!(
            "{} pending, {} overdue",
            page.tasks.pending_count(),
            page.tasks.overdue_count_at(now)
        );
        Ok(())
    }

    /// A list number on the current page, an id or a unique id prefix.
    fn resolve_task(&self, key: &str) -> CmdResult<String> {
        let page = self.current_page()?;
        if let Ok(n) = key.parse::<usize>() {
            if let Some(task) = n.checked_sub(1).and_then(|i| page.tasks.as_slice().get(i)) {
                return Ok(task.id.clone());
            }
        }
        if page.tasks.contains(key) {
            return Ok(key.to_string());
        }
        let matches: Vec<&Task> = page.tasks.iter().filter(|t| t.id.starts_with(key)).collect();
        match matches.as_slice() {
            [task] => Ok(task.id.clone()),
            [] => Err(format!("no task matching '{key}' on {}", page.title).into()),
            _ => Err(format!("'{key}' matches more than one task").into()),
        }
    }

    fn task_title(&self, page_id: &str, task_id: &str) -> String {
        self.coord
            .page(page_id)
            .and_then(|p| p.tasks.get(task_id))
            .map(|t| t.title.clone())
            .unwrap_or_else(|| task_id.to_string())
    }

    // ── Timer ────────────────────────────────────────────────────────

    fn timer(&mut self, action: TimerAction) -> CmdResult {
        let event = match action {
            TimerAction::Start => self.coord.start_timer(),
            TimerAction::Pause => self.coord.pause_timer(),
            TimerAction::Reset => self.coord.reset_timer(),
            TimerAction::Mode { mode } => {
                let event = self.coord.set_timer_mode(mode);
                if event.is_none() {
                    return Err("pause the timer before changing mode".into());
                }
                event
            }
            TimerAction::Tick { seconds } => {
                // Ticks after a completion or pause would all be no-ops.
                for _ in 0..seconds {
                    if !self.coord.timer().is_running() {
                        break;
                    }
                    if let Some(event) = self.coord.tick() {
                        self.report(&event);
                        break;
                    }
                }
                None
            }
            TimerAction::Status => Some(self.coord.timer().snapshot()),
        };
        if let Some(event) = event {
            self.report(&event);
        }
        Ok(())
    }

    fn report(&self, event: &Event) {
        if self.json {
            match serde_json::to_string(event) {
                Ok(line) => println!("{line}"),
                Err(e) => eprintln!("error: {e}"),
            }
            return;
        }
        let timer = self.coord.timer();
        match event {
            Event::TimerStarted { mode, remaining_secs, .. } => {
                println!(
                    "Started {} ({})",
                    mode.label(),
                    taskroom_core::timer::format_mm_ss(*remaining_secs)
                );
            }
            Event::TimerPaused { mode, remaining_secs, .. } => {
                println!(
                    "Paused {} at {}",
                    mode.label(),
                    taskroom_core::timer::format_mm_ss(*remaining_secs)
                );
            }
            Event::TimerReset { mode, .. } => {
                println!("Reset {} to {}", mode.label(), timer.formatted_remaining());
            }
            Event::ModeChanged { to, .. } => {
                println!("Mode: {} ({})", to.label(), timer.formatted_remaining());
            }
            Event::TimerCompleted {
                finished,
                next,
                completed_sessions,
                ..
            } => {
                println!(
                    "{} complete. Next: {} (sessions: {completed_sessions})",
                    finished.label(),
                    next.label()
                );
            }
            Event::StateSnapshot {
                mode,
                running,
                remaining_secs,
                completed_sessions,
                ..
            } => {
                println!(
                    "{} {} [{}] sessions: {completed_sessions} ({} until long break)",
                    mode.label(),
                    taskroom_core::timer::format_mm_ss(*remaining_secs),
                    if *running { "running" } else { "paused" },
                    timer.sessions_until_long_break()
                );
                if let Some(task) = self.coord.current_task() {
                    println!("Tracking: {} ({} pomodoros)", task.title, task.pomodoro_sessions);
                }
            }
        }
    }

    // ── Notifications ────────────────────────────────────────────────

    fn notify(&mut self, action: NotifyAction) -> CmdResult {
        match action {
            NotifyAction::List => {
                let center = self.coord.notifications();
                let unread = center.unread();
                let read = center.recent_read(READ_DISPLAY_LIMIT);
                if self.json {
                    let out = serde_json::json!({ "unread": unread, "read": read });
                    println!("{}", serde_json::to_string_pretty(&out)?);
                    return Ok(());
                }
                println!("Unread ({})", unread.len());
                for (i, n) in unread.iter().enumerate() {
                    println!("{:>4}. [{}] {}: {}", i + 1, n.kind, n.title, n.message);
                }
                if !read.is_empty() {
                    println!("Read");
                    for n in &read {
                        println!("      [{}] {}: {}", n.kind, n.title, n.message);
                    }
                }
            }
            NotifyAction::Read { notification } => {
                let id = self.resolve_notification(&notification)?;
                self.coord.mark_notification_read(&id);
                println!("Marked read");
            }
            NotifyAction::ReadAll => {
                let n = self.coord.mark_all_notifications_read();
                println!("Marked {n} notification(s) read");
            }
            NotifyAction::Clear => {
                self.coord.clear_notifications();
                println!("Cleared notifications");
            }
        }
        Ok(())
    }

    fn resolve_notification(&self, key: &str) -> CmdResult<String> {
        let center = self.coord.notifications();
        if let Ok(n) = key.parse::<usize>() {
            if let Some(found) = n.checked_sub(1).and_then(|i| center.unread().get(i).copied()) {
                return Ok(found.id.clone());
            }
        }
        center
            .all()
            .iter()
            .find(|n| n.id == key || n.id.starts_with(key))
            .map(|n| n.id.clone())
            .ok_or_else(|| format!("no notification matching '{key}'").into())
    }

    // ── Views ────────────────────────────────────────────────────────

    fn export(&self, path: Option<PathBuf>) -> CmdResult {
        let page_id = self.current_page()?.id.clone();
        let doc = self.coord.export_page(&page_id)?;
        match path {
            None if self.json => println!("{}", serde_json::to_string_pretty(&doc)?),
            None => print!("{}", doc.to_text()),
            Some(path) => {
                let path = if path.is_dir() {
                    path.join(&doc.file_name)
                } else {
                    path
                };
                std::fs::write(&path, doc.to_text())?;
                println!("Exported {} page(s) to {}", doc.page_count(), path.display());
            }
        }
        Ok(())
    }

    fn calendar(&self, month: Option<&str>) -> CmdResult {
        let today = Utc::now().date_naive();
        let (year, month) = match month {
            Some(raw) => calendar::parse_year_month(raw)?,
            None => (today.year(), today.month()),
        };
        let page_id = self.current_page()?.id.clone();
        let grid = self.coord.calendar_month(&page_id, year, month)?;
        if self.json {
            println!("{}", serde_json::to_string_pretty(&grid)?);
            return Ok(());
        }

        println!("{}", grid.title());
        println!("{}", WEEKDAY_LABELS.join(" "));
        for week in grid.weeks() {
            let row: String = week
                .iter()
                .map(|day| {
                    if !day.in_month {
                        return "    ".to_string();
                    }
                    let lead = if day.is_today { '>' } else { ' ' };
                    let mark = if day.tasks.is_empty() { ' ' } else { '*' };
                    format!("{lead}{:>2}{mark}", day.date.day())
                })
                .collect();
            println!("{}", row.trim_end());
        }
        for day in grid.days.iter().filter(|d| d.in_month && !d.tasks.is_empty()) {
            let titles: Vec<&str> = day.tasks.iter().map(|t| t.title.as_str()).collect();
            println!("{}: {}", day.date.format("%b %-d"), titles.join(", "));
        }
        Ok(())
    }
}

fn prompt() {
    print!("taskroom> ");
    let _ = std::io::stdout().flush();
}

fn icon_of(page: &Page) -> &str {
    page.icon.as_deref().unwrap_or(taskroom_core::page::DEFAULT_PAGE_ICON)
}

fn split_tags(raw: Option<&str>) -> Vec<String> {
    raw.map(|r| r.split(',').map(str::to_string).collect())
        .unwrap_or_default()
}

fn task_line(task: &Task, now: chrono::DateTime<Utc>) -> String {
    let mut line = format!("{} {} [{}]", status_mark(task), task.title, task.priority);
    if let (Some(due), Some(label)) = (task.due_date, task.due_label(now)) {
        line.push_str(&format!(" due {} ({label})", due.format("%Y-%m-%d")));
    }
    for tag in &task.tags {
        line.push_str(&format!(" #{tag}"));
    }
    if task.pomodoro_sessions > 0 {
        line.push_str(&format!(" 🍅{}", task.pomodoro_sessions));
    }
    line
}
