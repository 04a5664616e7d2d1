//! Pages and the arena that owns them.
//!
//! Pages form a tree, but no page embeds another: every page is stored flat
//! in a [`PageArena`] keyed by id, with `parent_id` and `subpages` holding
//! id references. Traversal goes through id lookups.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::task::{next_timestamp, TaskCollection};

/// Icon given to pages created without one.
pub const DEFAULT_PAGE_ICON: &str = "📄";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page {
    pub id: String,
    pub title: String,
    pub icon: Option<String>,
    pub parent_id: Option<String>,
    pub tasks: TaskCollection,
    /// Child page ids in creation order
    pub subpages: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Page {
    fn new(id: String, title: String, icon: Option<String>, parent_id: Option<String>) -> Self {
        let now = Utc::now();
        Self {
            id,
            title,
            icon: Some(icon.unwrap_or_else(|| DEFAULT_PAGE_ICON.to_string())),
            parent_id,
            tasks: TaskCollection::new(),
            subpages: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn touch(&mut self) {
        self.updated_at = next_timestamp(self.updated_at);
    }
}

/// Flat store of every page.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PageArena {
    pages: HashMap<String, Page>,
    /// Top-level page ids in creation order
    roots: Vec<String>,
}

impl PageArena {
    pub fn new() -> Self {
        Self::default()
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn len(&self) -> usize {
        self.pages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.pages.contains_key(id)
    }

    pub fn get(&self, id: &str) -> Option<&Page> {
        self.pages.get(id)
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut Page> {
        self.pages.get_mut(id)
    }

    pub fn roots(&self) -> Vec<&Page> {
        self.roots.iter().filter_map(|id| self.pages.get(id)).collect()
    }

    pub fn children(&self, id: &str) -> Vec<&Page> {
        self.pages
            .get(id)
            .map(|p| p.subpages.iter().filter_map(|c| self.pages.get(c)).collect())
            .unwrap_or_default()
    }

    /// Parent chain of `id`, nearest first.
    pub fn ancestors(&self, id: &str) -> Vec<&Page> {
        let mut out = Vec::new();
        let mut cursor = self.pages.get(id).and_then(|p| p.parent_id.as_deref());
        while let Some(parent_id) = cursor {
            let Some(parent) = self.pages.get(parent_id) else {
                break;
            };
            out.push(parent);
            cursor = parent.parent_id.as_deref();
        }
        out
    }

    /// Depth-first pre-order walk over every tree, with depth (roots at 0).
    pub fn walk(&self) -> Vec<(usize, &Page)> {
        let mut out = Vec::with_capacity(self.pages.len());
        let mut stack: Vec<(usize, &str)> =
            self.roots.iter().rev().map(|id| (0, id.as_str())).collect();
        while let Some((depth, id)) = stack.pop() {
            let Some(page) = self.pages.get(id) else {
                continue;
            };
            out.push((depth, page));
            stack.extend(page.subpages.iter().rev().map(|c| (depth + 1, c.as_str())));
        }
        out
    }

    /// Id of the page that owns `task_id`.
    pub fn task_owner(&self, task_id: &str) -> Option<&str> {
        self.walk()
            .into_iter()
            .find(|(_, p)| p.tasks.contains(task_id))
            .map(|(_, p)| p.id.as_str())
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Create a page. A parent that does not exist makes the page a root.
    /// The title is trusted; callers validate it.
    pub fn create_page(
        &mut self,
        title: impl Into<String>,
        icon: Option<String>,
        parent_id: Option<&str>,
    ) -> &Page {
        let id = format!("page-{}", uuid::Uuid::new_v4());
        self.insert_with_id(id, title.into(), icon, parent_id)
    }

    /// Create a page with a caller-chosen id, e.g. the startup page.
    pub fn create_page_with_id(
        &mut self,
        id: impl Into<String>,
        title: impl Into<String>,
        icon: Option<String>,
    ) -> &Page {
        self.insert_with_id(id.into(), title.into(), icon, None)
    }

    fn insert_with_id(
        &mut self,
        id: String,
        title: String,
        icon: Option<String>,
        parent_id: Option<&str>,
    ) -> &Page {
        let parent_id = parent_id.filter(|p| self.pages.contains_key(*p)).map(str::to_string);
        match parent_id.as_deref().and_then(|p| self.pages.get_mut(p)) {
            Some(parent) => {
                parent.subpages.push(id.clone());
                parent.touch();
            }
            None => self.roots.push(id.clone()),
        }
        tracing::debug!(page_id = %id, title = %title, parent = ?parent_id, "page created");
        let page = Page::new(id.clone(), title, icon, parent_id);
        self.pages.entry(id).or_insert(page)
    }

    pub fn rename_page(&mut self, id: &str, title: impl Into<String>) -> bool {
        let Some(page) = self.pages.get_mut(id) else {
            return false;
        };
        page.title = title.into();
        page.touch();
        true
    }

    pub fn set_icon(&mut self, id: &str, icon: Option<String>) -> bool {
        let Some(page) = self.pages.get_mut(id) else {
            return false;
        };
        page.icon = icon;
        page.touch();
        true
    }

    /// Remove a page with its whole subtree. Returns the removed ids,
    /// empty when `id` is unknown.
    pub fn delete_page(&mut self, id: &str) -> Vec<String> {
        let Some(page) = self.pages.get(id) else {
            return Vec::new();
        };
        match page.parent_id.clone() {
            Some(parent_id) => {
                if let Some(parent) = self.pages.get_mut(&parent_id) {
                    parent.subpages.retain(|c| c != id);
                    parent.touch();
                }
            }
            None => self.roots.retain(|r| r != id),
        }

        let mut removed = Vec::new();
        let mut stack = vec![id.to_string()];
        while let Some(next) = stack.pop() {
            if let Some(page) = self.pages.remove(&next) {
                stack.extend(page.subpages);
                removed.push(next);
            }
        }
        tracing::debug!(page_id = %id, removed = removed.len(), "page deleted");
        removed
    }
}
