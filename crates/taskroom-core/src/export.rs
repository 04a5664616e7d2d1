//! Paginated export of a page's tasks.
//!
//! Layout follows a vertical cursor measured in abstract units: the page
//! title sits at the top margin, the first task at `first_line`, and every
//! task advances the cursor by 15 units (20 with a description). Once the
//! cursor passes `line_budget` a new page begins at the top margin.
//!
//! Export is stateless: it reads a [`Page`] and produces an
//! [`ExportDocument`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::page::Page;
use crate::task::Task;

const TASK_ADVANCE: u32 = 15;
const DESCRIPTION_ADVANCE: u32 = 5;
const LINE_GAP: u32 = 5;

/// Page separator used by [`ExportDocument::to_text`].
pub const PAGE_BREAK: char = '\u{c}';

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportOptions {
    pub line_budget: u32,
    pub top_margin: u32,
    pub first_line: u32,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            line_budget: 270,
            top_margin: 30,
            first_line: 50,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LineStyle {
    Heading,
    Body,
    Detail,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportLine {
    /// Vertical cursor position of the line
    pub y: u32,
    pub style: LineStyle,
    pub text: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportPage {
    pub lines: Vec<ExportLine>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportDocument {
    pub title: String,
    pub file_name: String,
    pub pages: Vec<ExportPage>,
}

impl ExportDocument {
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Plain text rendering, pages separated by a form feed.
    pub fn to_text(&self) -> String {
        let mut out = String::new();
        for (i, page) in self.pages.iter().enumerate() {
            if i > 0 {
                out.push(PAGE_BREAK);
                out.push('\n');
            }
            for line in &page.lines {
                out.push_str(&line.text);
                out.push('\n');
            }
        }
        out
    }
}

/// `My Tasks` becomes `My_Tasks_tasks.txt`.
pub fn file_name_for(title: &str) -> String {
    let stem: Vec<&str> = title.split_whitespace().collect();
    format!("{}_tasks.txt", stem.join("_"))
}

pub fn status_mark(task: &Task) -> char {
    if task.completed {
        '✓'
    } else {
        '○'
    }
}

pub fn format_due_date(due: Option<DateTime<Utc>>) -> String {
    match due {
        Some(d) => d.format("%-m/%-d/%Y").to_string(),
        None => "No due date".to_string(),
    }
}

pub fn render_page(page: &Page, options: ExportOptions) -> ExportDocument {
    let mut pages = vec![ExportPage::default()];
    let mut y = options.top_margin;

    pages[0].lines.push(ExportLine {
        y,
        style: LineStyle::Heading,
        text: page.title.clone(),
    });
    y = options.first_line;

    for task in &page.tasks {
        let mut lines = vec![ExportLine {
            y,
            style: LineStyle::Body,
            text: format!(
                "{} [{}] {}",
                status_mark(task),
                task.priority.as_str().to_uppercase(),
                task.title
            ),
        }];
        if let Some(description) = &task.description {
            lines.push(ExportLine {
                y: y.saturating_add(LINE_GAP),
                style: LineStyle::Detail,
                text: format!("    {description}"),
            });
            y = y.saturating_add(DESCRIPTION_ADVANCE);
        }
        lines.push(ExportLine {
            y: y.saturating_add(LINE_GAP),
            style: LineStyle::Body,
            text: format!("    Due: {}", format_due_date(task.due_date)),
        });
        y = y.saturating_add(TASK_ADVANCE);

        if let Some(current) = pages.last_mut() {
            current.lines.extend(lines);
        }

        if y > options.line_budget {
            pages.push(ExportPage::default());
            y = options.top_margin;
        }
    }

    // A break after the final task would leave a blank trailing page.
    if pages.len() > 1 && pages.last().is_some_and(|p| p.lines.is_empty()) {
        pages.pop();
    }

    tracing::debug!(page_id = %page.id, pages = pages.len(), "page exported");
    ExportDocument {
        title: page.title.clone(),
        file_name: file_name_for(&page.title),
        pages,
    }
}
