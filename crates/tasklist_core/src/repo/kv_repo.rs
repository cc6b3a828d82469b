//! Key-value repository contract with in-memory and SQLite implementations.
//!
//! # Responsibility
//! - Store opaque string blobs under string keys.
//! - Report backend failures as tagged `RepoError` values, never panics.
//!
//! # Invariants
//! - Values are stored and returned verbatim; no parsing happens here.
//! - A successful `set` is visible to every later `get` on the same store.

use crate::db::DbError;
use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::HashMap;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::{Arc, Mutex, RwLock};

pub type RepoResult<T> = Result<T, RepoError>;

/// Key-value repository error.
#[derive(Debug)]
pub enum RepoError {
    /// Empty or blank key.
    InvalidKey,
    Db(DbError),
    /// Backend could not service the call (poisoned lock, worker join failure,
    /// injected failure).
    Unavailable(String),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidKey => write!(f, "key-value key cannot be empty"),
            Self::Db(err) => write!(f, "{err}"),
            Self::Unavailable(message) => write!(f, "key-value store unavailable: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::InvalidKey | Self::Unavailable(_) => None,
        }
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Async key-value store contract.
#[async_trait]
pub trait KvRepository: Send + Sync {
    /// Reads the value stored under `key`, `None` when absent.
    async fn get(&self, key: &str) -> RepoResult<Option<String>>;

    /// Writes `value` under `key`, replacing any previous value.
    async fn set(&self, key: &str, value: &str) -> RepoResult<()>;
}

fn ensure_key(key: &str) -> RepoResult<()> {
    if key.trim().is_empty() {
        return Err(RepoError::InvalidKey);
    }
    Ok(())
}

/// Thread-safe in-memory key-value store.
///
/// Clones share the same map, so a test can keep one handle and inspect what
/// the store under test wrote.
#[derive(Debug, Clone, Default)]
pub struct MemoryKvRepository {
    entries: Arc<RwLock<HashMap<String, String>>>,
    fail_writes: bool,
}

impl MemoryKvRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store pre-populated with one entry.
    pub fn with_entry(key: impl Into<String>, value: impl Into<String>) -> Self {
        let repo = Self::new();
        if let Ok(mut entries) = repo.entries.write() {
            entries.insert(key.into(), value.into());
        }
        repo
    }

    /// Creates a store whose writes always fail with `Unavailable`.
    pub fn failing() -> Self {
        Self {
            fail_writes: true,
            ..Self::default()
        }
    }

    /// Returns the stored value without going through the async contract.
    pub fn peek(&self, key: &str) -> Option<String> {
        self.entries
            .read()
            .ok()
            .and_then(|entries| entries.get(key).cloned())
    }
}

#[async_trait]
impl KvRepository for MemoryKvRepository {
    async fn get(&self, key: &str) -> RepoResult<Option<String>> {
        ensure_key(key)?;
        let entries = self
            .entries
            .read()
            .map_err(|_| RepoError::Unavailable("memory store lock poisoned".to_string()))?;
        Ok(entries.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> RepoResult<()> {
        ensure_key(key)?;
        if self.fail_writes {
            return Err(RepoError::Unavailable("writes disabled".to_string()));
        }
        let mut entries = self
            .entries
            .write()
            .map_err(|_| RepoError::Unavailable("memory store lock poisoned".to_string()))?;
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// SQLite-backed key-value store over the `kv_entries` table.
///
/// Calls run on tokio's blocking pool so the async caller is never stalled
/// by disk I/O.
#[derive(Debug, Clone)]
pub struct SqliteKvRepository {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteKvRepository {
    /// Wraps a connection returned by `open_db`/`open_db_in_memory`.
    pub fn new(conn: Connection) -> Self {
        Self {
            conn: Arc::new(Mutex::new(conn)),
        }
    }

    async fn run_blocking<F, T>(&self, f: F) -> RepoResult<T>
    where
        F: FnOnce(&Connection) -> RepoResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let conn = conn
                .lock()
                .map_err(|_| RepoError::Unavailable("sqlite connection lock poisoned".to_string()))?;
            f(&conn)
        })
        .await
        .map_err(|err| RepoError::Unavailable(format!("sqlite worker failed: {err}")))?
    }
}

#[async_trait]
impl KvRepository for SqliteKvRepository {
    async fn get(&self, key: &str) -> RepoResult<Option<String>> {
        ensure_key(key)?;
        let key = key.to_string();
        self.run_blocking(move |conn| {
            let value = conn
                .query_row(
                    "SELECT value FROM kv_entries WHERE key = ?1;",
                    [key.as_str()],
                    |row| row.get::<_, String>(0),
                )
                .optional()?;
            Ok(value)
        })
        .await
    }

    async fn set(&self, key: &str, value: &str) -> RepoResult<()> {
        ensure_key(key)?;
        let key = key.to_string();
        let value = value.to_string();
        self.run_blocking(move |conn| {
            conn.execute(
                "INSERT INTO kv_entries (key, value) VALUES (?1, ?2)
                 ON CONFLICT(key) DO UPDATE SET
                    value = excluded.value,
                    updated_at = (strftime('%s', 'now') * 1000);",
                params![key, value],
            )?;
            Ok(())
        })
        .await
    }
}
