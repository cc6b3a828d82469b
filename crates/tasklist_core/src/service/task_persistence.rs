//! Persistence adapter for the task list.
//!
//! # Responsibility
//! - Encode/decode the full task list as one JSON array blob.
//! - Read and write that blob under one fixed key of a `KvRepository`.
//!
//! # Invariants
//! - `load` never fails: absence, read failures and malformed blobs degrade
//!   to an empty list and are logged.
//! - `save` writes a full snapshot; there are no incremental diffs.
//! - Decoded lists contain no blank or duplicate ids.
//!
//! Log events carry counts and error kinds only, never task text.

use crate::model::task::{Task, TaskId};
use crate::repo::kv_repo::{KvRepository, RepoError};
use log::{error, info, warn};
use std::collections::HashSet;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::Instant;

/// Snapshot encode/decode failure.
#[derive(Debug)]
pub enum SnapshotError {
    Json(serde_json::Error),
}

impl Display for SnapshotError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Json(err) => write!(f, "malformed task snapshot: {err}"),
        }
    }
}

impl Error for SnapshotError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Json(err) => Some(err),
        }
    }
}

impl From<serde_json::Error> for SnapshotError {
    fn from(value: serde_json::Error) -> Self {
        Self::Json(value)
    }
}

/// Tagged failure of a persistence call.
#[derive(Debug)]
pub enum PersistenceError {
    Snapshot(SnapshotError),
    Repo(RepoError),
}

impl Display for PersistenceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Snapshot(err) => write!(f, "{err}"),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for PersistenceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Snapshot(err) => Some(err),
            Self::Repo(err) => Some(err),
        }
    }
}

impl From<SnapshotError> for PersistenceError {
    fn from(value: SnapshotError) -> Self {
        Self::Snapshot(value)
    }
}

impl From<RepoError> for PersistenceError {
    fn from(value: RepoError) -> Self {
        Self::Repo(value)
    }
}

impl PersistenceError {
    fn code(&self) -> &'static str {
        match self {
            Self::Snapshot(_) => "snapshot_malformed",
            Self::Repo(RepoError::InvalidKey) => "invalid_key",
            Self::Repo(RepoError::Db(_)) => "db_failed",
            Self::Repo(RepoError::Unavailable(_)) => "store_unavailable",
        }
    }
}

/// Serializes the list as a JSON array in display order.
pub fn encode_snapshot(tasks: &[Task]) -> Result<String, SnapshotError> {
    Ok(serde_json::to_string(tasks)?)
}

/// Parses a JSON array blob into tasks.
///
/// Records with blank ids or ids already seen earlier in the array are
/// dropped; the first occurrence of an id wins.
///
/// # Errors
/// - Returns `SnapshotError::Json` when the blob is not an array of
///   `{id: string, text: string, completed: bool}` records.
pub fn decode_snapshot(blob: &str) -> Result<Vec<Task>, SnapshotError> {
    let decoded: Vec<Task> = serde_json::from_str(blob)?;
    let total = decoded.len();
    let mut seen: HashSet<TaskId> = HashSet::with_capacity(total);
    let tasks: Vec<Task> = decoded
        .into_iter()
        .filter(|task| !task.id.is_blank() && seen.insert(task.id.clone()))
        .collect();

    let dropped = total - tasks.len();
    if dropped > 0 {
        warn!(
            "event=snapshot_decode module=persistence status=repaired dropped_records={dropped} kept_records={}",
            tasks.len()
        );
    }
    Ok(tasks)
}

/// Loads and saves the full task list under one storage key.
pub struct TaskPersistence<R: KvRepository> {
    repo: R,
    key: String,
}

impl<R: KvRepository> TaskPersistence<R> {
    pub fn new(repo: R, key: impl Into<String>) -> Self {
        Self {
            repo,
            key: key.into(),
        }
    }

    pub fn key(&self) -> &str {
        self.key.as_str()
    }

    /// Returns the previously saved list, or an empty list.
    ///
    /// # Side effects
    /// - Emits a `tasks_load` event; failures are logged at `error`.
    pub async fn load(&self) -> Vec<Task> {
        let started_at = Instant::now();
        match self.try_load().await {
            Ok(Some(tasks)) => {
                info!(
                    "event=tasks_load module=persistence status=ok count={} duration_ms={}",
                    tasks.len(),
                    started_at.elapsed().as_millis()
                );
                tasks
            }
            Ok(None) => {
                info!(
                    "event=tasks_load module=persistence status=ok count=0 snapshot=absent duration_ms={}",
                    started_at.elapsed().as_millis()
                );
                Vec::new()
            }
            Err(err) => {
                error!(
                    "event=tasks_load module=persistence status=error error_code={} duration_ms={} error={err}",
                    err.code(),
                    started_at.elapsed().as_millis()
                );
                Vec::new()
            }
        }
    }

    async fn try_load(&self) -> Result<Option<Vec<Task>>, PersistenceError> {
        match self.repo.get(&self.key).await? {
            Some(blob) => Ok(Some(decode_snapshot(&blob)?)),
            None => Ok(None),
        }
    }

    /// Writes the full list, overwriting the previous snapshot.
    ///
    /// # Errors
    /// - Returns `PersistenceError::Snapshot` when encoding fails.
    /// - Returns `PersistenceError::Repo` when the repository write fails.
    pub async fn save(&self, tasks: &[Task]) -> Result<(), PersistenceError> {
        let started_at = Instant::now();
        let result = self.try_save(tasks).await;
        match &result {
            Ok(()) => info!(
                "event=tasks_save module=persistence status=ok count={} duration_ms={}",
                tasks.len(),
                started_at.elapsed().as_millis()
            ),
            Err(err) => error!(
                "event=tasks_save module=persistence status=error error_code={} count={} duration_ms={} error={err}",
                err.code(),
                tasks.len(),
                started_at.elapsed().as_millis()
            ),
        }
        result
    }

    async fn try_save(&self, tasks: &[Task]) -> Result<(), PersistenceError> {
        let blob = encode_snapshot(tasks)?;
        self.repo.set(&self.key, &blob).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{decode_snapshot, encode_snapshot};
    use crate::model::task::{Task, TaskId};

    #[test]
    fn encode_uses_fixed_field_names() {
        let mut task = Task::with_id(TaskId::parse("1700000000000").unwrap(), "water plants");
        task.completed = true;

        let blob = encode_snapshot(&[task]).unwrap();
        assert_eq!(
            blob,
            r#"[{"id":"1700000000000","text":"water plants","completed":true}]"#
        );
    }

    #[test]
    fn decode_drops_blank_and_duplicate_ids() {
        let blob = r#"[
            {"id":"a","text":"first","completed":false},
            {"id":"","text":"blank","completed":false},
            {"id":"a","text":"duplicate","completed":true},
            {"id":"b","text":"second","completed":true}
        ]"#;

        let tasks = decode_snapshot(blob).unwrap();
        let texts: Vec<&str> = tasks.iter().map(|task| task.text.as_str()).collect();
        assert_eq!(texts, vec!["first", "second"]);
    }

    #[test]
    fn decode_ignores_unknown_fields() {
        let blob = r#"[{"id":"a","text":"x","completed":false,"color":"red"}]"#;
        assert_eq!(decode_snapshot(blob).unwrap().len(), 1);
    }

    #[test]
    fn decode_rejects_non_array_blobs() {
        assert!(decode_snapshot("null").is_err());
        assert!(decode_snapshot(r#"{"id":"a"}"#).is_err());
        assert!(decode_snapshot("[{\"id\":1,\"text\":\"x\",\"completed\":false}]").is_err());
        assert!(decode_snapshot("not json").is_err());
    }
}
