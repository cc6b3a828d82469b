//! Core use-case services.
//!
//! # Responsibility
//! - `task_persistence`: serialize the task list and move it through a
//!   key-value repository.
//! - `task_store`: own the in-memory list and drive the mutation state machine.
//!
//! # Invariants
//! - The in-memory list is the source of truth for the running session.
//! - Persistence failures are logged, never surfaced to the presentation layer.

pub mod task_persistence;
pub mod task_store;
