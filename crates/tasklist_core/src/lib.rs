//! Core domain logic for the personal task list.
//! This crate owns the task-mutation state machine and its write-through
//! persistence; presentation layers only observe state and call operations.

pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use config::{ConfigError, StoreConfig, DEFAULT_STORAGE_KEY};
pub use logging::{default_log_level, init_logging, logging_status, LoggingError};
pub use model::task::{normalize_task_text, Task, TaskId, TaskValidationError};
pub use repo::kv_repo::{
    KvRepository, MemoryKvRepository, RepoError, RepoResult, SqliteKvRepository,
};
pub use service::task_persistence::{
    decode_snapshot, encode_snapshot, PersistenceError, SnapshotError, TaskPersistence,
};
pub use service::task_store::{
    Rejection, StoreInitError, StoreSnapshot, TaskStore, Transition,
};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::core_version;

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
