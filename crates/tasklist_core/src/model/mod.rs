//! Domain model for the personal task list.
//!
//! # Responsibility
//! - Define the task record shared by the store, persistence and UI layers.
//!
//! # Invariants
//! - Every task is identified by a stable, non-empty `TaskId`.
//! - Deletion is a hard removal from the list; there are no tombstones.

pub mod task;
