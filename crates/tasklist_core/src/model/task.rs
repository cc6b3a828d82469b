//! Task domain model.
//!
//! # Responsibility
//! - Define the canonical `{id, text, completed}` record.
//! - Provide the text normalization applied at the mutation boundary.
//!
//! # Invariants
//! - `id` is non-empty and never reused for another task in the same list.
//! - `id` is immutable after creation; only `text` and `completed` change.
//! - Text is validated on entry only; stored text is not re-checked.

use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Stable identifier of one task.
///
/// Serialized as a plain JSON string. Snapshots written by older builds used
/// millisecond timestamps as ids; those are accepted verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(String);

impl TaskId {
    /// Generates a fresh unique id.
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Wraps an externally supplied id.
    ///
    /// # Errors
    /// - Returns `TaskValidationError::EmptyId` for empty or blank values.
    pub fn parse(value: impl Into<String>) -> Result<Self, TaskValidationError> {
        let value = value.into();
        if value.trim().is_empty() {
            return Err(TaskValidationError::EmptyId);
        }
        Ok(Self(value))
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    /// Whether this id would be rejected by `parse`.
    ///
    /// Serde bypasses `parse`, so decoded ids are checked with this.
    pub fn is_blank(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl Display for TaskId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Validation errors for task construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskValidationError {
    EmptyId,
}

impl Display for TaskValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyId => write!(f, "task id cannot be empty"),
        }
    }
}

impl Error for TaskValidationError {}

/// One to-do entry.
///
/// Field names double as the snapshot wire format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub text: String,
    pub completed: bool,
}

impl Task {
    /// Creates an open task with a generated id.
    pub fn new(text: impl Into<String>) -> Self {
        Self::with_id(TaskId::generate(), text)
    }

    /// Creates an open task with a caller-provided id.
    ///
    /// Used by import paths and tests where identity already exists.
    pub fn with_id(id: TaskId, text: impl Into<String>) -> Self {
        Self {
            id,
            text: text.into(),
            completed: false,
        }
    }

    /// Flips the completion flag.
    pub fn toggle(&mut self) {
        self.completed = !self.completed;
    }
}

/// Trims user input and rejects blank text.
///
/// Returns `None` when nothing but whitespace was entered.
pub fn normalize_task_text(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::{normalize_task_text, TaskId};

    #[test]
    fn normalize_trims_and_rejects_blank() {
        assert_eq!(normalize_task_text("  buy milk \n"), Some("buy milk".to_string()));
        assert_eq!(normalize_task_text(""), None);
        assert_eq!(normalize_task_text(" \t "), None);
    }

    #[test]
    fn generated_ids_are_distinct() {
        let first = TaskId::generate();
        let second = TaskId::generate();
        assert_ne!(first, second);
        assert!(!first.is_blank());
    }
}
