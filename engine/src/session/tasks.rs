//! Task registry
//!
//! Ordered tasks for one session. The backing sequence keeps creation order
//! forever: completing a task flips its flag in place and deleting removes it
//! by id. Ordinals are positions within the *current* active subsequence and
//! are recomputed on every call, so they are not stable identifiers.

use serde::{Deserialize, Serialize};
use std::fmt::Write as _;

/// Reply shown when a session has no tasks at all
pub const NO_TASKS_REPLY: &str =
    "You don't have any tasks yet. Try adding one by saying 'Add task: Your task description'";

/// A single task
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    /// Generated once at creation, never reused
    pub id: String,
    pub title: String,
    pub completed: bool,
    /// Creation time in epoch milliseconds
    pub created_at: i64,
}

impl Task {
    /// Create an active task with a fresh id
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            id: format!("task-{}", uuid::Uuid::new_v4()),
            title: title.into(),
            completed: false,
            created_at: chrono::Utc::now().timestamp_millis(),
        }
    }
}

/// Ordinal lookup failures
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TaskError {
    #[error("Task {requested} not found. You have {active} active tasks.")]
    NotFound { requested: usize, active: usize },
}

/// Ordered collection of one session's tasks
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct TaskRegistry {
    tasks: Vec<Task>,
}

impl TaskRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a new active task and return it
    pub fn add(&mut self, title: impl Into<String>) -> Task {
        let task = Task::new(title);
        self.tasks.push(task.clone());
        task
    }

    /// All tasks in creation order
    pub fn iter(&self) -> impl Iterator<Item = &Task> {
        self.tasks.iter()
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn active(&self) -> impl Iterator<Item = &Task> {
        self.tasks.iter().filter(|t| !t.completed)
    }

    pub fn completed(&self) -> impl Iterator<Item = &Task> {
        self.tasks.iter().filter(|t| t.completed)
    }

    pub fn active_count(&self) -> usize {
        self.active().count()
    }

    pub fn completed_count(&self) -> usize {
        self.completed().count()
    }

    /// Render active and completed tasks as two independently numbered lists
    pub fn list_formatted(&self) -> String {
        if self.tasks.is_empty() {
            return NO_TASKS_REPLY.to_string();
        }

        let mut out = String::from("📋 Your Tasks:\n\n");

        let mut active = self.active().peekable();
        if active.peek().is_some() {
            out.push_str("Active:\n");
            for (i, task) in active.enumerate() {
                let _ = writeln!(out, "{}. {}", i + 1, task.title);
            }
        }

        let mut completed = self.completed().peekable();
        if completed.peek().is_some() {
            out.push_str("\n✓ Completed:\n");
            for (i, task) in completed.enumerate() {
                let _ = writeln!(out, "{}. {}", i + 1, task.title);
            }
        }

        out
    }

    /// Mark the `n`-th active task (1-based) as completed
    pub fn complete_by_ordinal(&mut self, n: usize) -> Result<&Task, TaskError> {
        let index = self.resolve_active(n)?;
        let task = &mut self.tasks[index];
        task.completed = true;
        Ok(task)
    }

    /// Remove the `n`-th active task (1-based)
    pub fn delete_by_ordinal(&mut self, n: usize) -> Result<Task, TaskError> {
        let index = self.resolve_active(n)?;
        let removed = self.tasks[index].clone();
        self.tasks.retain(|t| t.id != removed.id);
        Ok(removed)
    }

    /// Map an active-subsequence ordinal to a position in the backing sequence
    fn resolve_active(&self, n: usize) -> Result<usize, TaskError> {
        let not_found = || TaskError::NotFound {
            requested: n,
            active: self.active_count(),
        };

        if n == 0 {
            return Err(not_found());
        }

        self.tasks
            .iter()
            .enumerate()
            .filter(|(_, t)| !t.completed)
            .nth(n - 1)
            .map(|(i, _)| i)
            .ok_or_else(not_found)
    }
}
