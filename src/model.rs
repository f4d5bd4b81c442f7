use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Task priority. Stored as a small signed integer: -1 blocked, 0 normal, 1 low, 2 high.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Priority {
    Blocked,
    #[default]
    Normal,
    Low,
    High,
}

impl Priority {
    /// Keyword form used by the inline `!priority` sigil. Case-insensitive.
    pub fn from_keyword(word: &str) -> Option<Self> {
        match word.to_lowercase().as_str() {
            "high" | "h" => Some(Priority::High),
            "low" | "l" => Some(Priority::Low),
            "blocked" | "b" => Some(Priority::Blocked),
            "normal" | "n" => Some(Priority::Normal),
            _ => None,
        }
    }

    /// `:priority` argument: keyword or its numeric value.
    pub fn from_arg(arg: &str) -> Option<Self> {
        match arg {
            "2" => Some(Priority::High),
            "1" => Some(Priority::Low),
            "-1" => Some(Priority::Blocked),
            "0" => Some(Priority::Normal),
            other => Self::from_keyword(other),
        }
    }

    pub fn from_i64(value: i64) -> Self {
        match value {
            v if v >= 2 => Priority::High,
            1 => Priority::Low,
            v if v < 0 => Priority::Blocked,
            _ => Priority::Normal,
        }
    }

    pub fn as_i64(self) -> i64 {
        match self {
            Priority::Blocked => -1,
            Priority::Normal => 0,
            Priority::Low => 1,
            Priority::High => 2,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Priority::Blocked => "blocked",
            Priority::Normal => "normal",
            Priority::Low => "low",
            Priority::High => "high",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: i64,
    pub parent_id: Option<i64>,
    pub workspace_id: i64,
    pub title: String,
    /// Authoritative only for leaves; see `TaskTree::is_complete`.
    pub completed: bool,
    pub tags: Vec<String>,
    /// `YYYY-MM-DD`, or any literal string the user typed, or empty.
    pub due_date: String,
    pub priority: Priority,
    pub order: i64,
    pub created_at: DateTime<Utc>,
    /// Child ids in sibling order. Filled in by the tree, never persisted.
    #[serde(skip)]
    pub children: Vec<i64>,
}

impl Task {
    pub fn is_blocked(&self) -> bool {
        self.priority == Priority::Blocked
    }

    pub fn has_children(&self) -> bool {
        !self.children.is_empty()
    }

    /// Appends tags, skipping empty strings and ones already present.
    pub fn push_tags<I, S>(&mut self, tags: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for tag in tags {
            let tag = tag.into();
            if !tag.is_empty() && !self.tags.contains(&tag) {
                self.tags.push(tag);
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Workspace {
    pub id: i64,
    pub name: String,
    pub order: i64,
    pub task_count: i64,
    pub completed_count: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    #[default]
    Normal,
    Insert,
    Command,
    Search,
}

impl Mode {
    pub fn label(self) -> &'static str {
        match self {
            Mode::Normal => "NORMAL",
            Mode::Insert => "INSERT",
            Mode::Command => "COMMAND",
            Mode::Search => "SEARCH",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Pane {
    #[default]
    Tasks,
    Workspaces,
}

impl Pane {
    pub fn label(self) -> &'static str {
        match self {
            Pane::Tasks => "TASKS",
            Pane::Workspaces => "WORKSPACES",
        }
    }
}
