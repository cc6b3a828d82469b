//! In-memory task store and its mutation state machine.
//!
//! # Responsibility
//! - Own the ordered task list, the input buffer and the edit cursor.
//! - Apply user actions as synchronous, atomic transitions.
//! - Schedule a fire-and-forget full-snapshot save after every list change.
//! - Publish the observable state to subscribers after every change.
//!
//! # Invariants
//! - List order is insertion order; toggle/update never reorder.
//! - Ids in the list are unique and non-empty.
//! - The edit cursor, when set, refers to an id present in the list.
//! - Invalid input and unknown ids are ignored, never reported as errors.
//! - A failed save never rolls back the in-memory transition.
//! - List mutations are rejected until the startup load completes, so an
//!   empty pre-load list cannot overwrite the persisted snapshot.
//! - Saves carry a monotonically increasing sequence number; a save older than
//!   the last one written is skipped, so storage converges to the latest list.

use crate::config::{ConfigError, StoreConfig};
use crate::model::task::{normalize_task_text, Task, TaskId};
use crate::repo::kv_repo::KvRepository;
use crate::service::task_persistence::TaskPersistence;
use log::{debug, error, info};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;

/// Store construction failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreInitError {
    Config(ConfigError),
    /// Saves are spawned on the ambient tokio runtime, so one must exist.
    NoRuntime,
}

impl Display for StoreInitError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Config(err) => write!(f, "invalid store config: {err}"),
            Self::NoRuntime => write!(f, "task store must be created inside a tokio runtime"),
        }
    }
}

impl Error for StoreInitError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Config(err) => Some(err),
            Self::NoRuntime => None,
        }
    }
}

impl From<ConfigError> for StoreInitError {
    fn from(value: ConfigError) -> Self {
        Self::Config(value)
    }
}

/// Why an action left the store unchanged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    /// Input was empty after trimming.
    EmptyText,
    /// Update or cancel requested while no task is being edited.
    NotEditing,
    UnknownTask(TaskId),
    /// List mutation requested before the startup load completed.
    NotHydrated,
}

impl Rejection {
    fn code(&self) -> &'static str {
        match self {
            Self::EmptyText => "empty_text",
            Self::NotEditing => "not_editing",
            Self::UnknownTask(_) => "unknown_task",
            Self::NotHydrated => "not_hydrated",
        }
    }
}

/// Result of one store action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
    Applied,
    Ignored(Rejection),
}

impl Transition {
    pub fn is_applied(&self) -> bool {
        matches!(self, Self::Applied)
    }
}

/// Observable store state for the presentation layer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StoreSnapshot {
    pub tasks: Vec<Task>,
    pub input: String,
    pub editing: Option<TaskId>,
    pub hydrated: bool,
}

impl StoreSnapshot {
    pub fn is_editing(&self) -> bool {
        self.editing.is_some()
    }
}

/// Owner of the task list and the edit cursor.
pub struct TaskStore<R: KvRepository + 'static> {
    tasks: Vec<Task>,
    input: String,
    editing: Option<TaskId>,
    hydrated: bool,
    persistence: Arc<TaskPersistence<R>>,
    runtime: Handle,
    in_flight: Vec<JoinHandle<()>>,
    save_seq: u64,
    last_written: Arc<Mutex<u64>>,
    state_tx: watch::Sender<StoreSnapshot>,
}

impl<R: KvRepository + 'static> TaskStore<R> {
    /// Creates an empty, not yet hydrated store.
    ///
    /// # Errors
    /// - Returns `StoreInitError::Config` for an invalid config.
    /// - Returns `StoreInitError::NoRuntime` outside a tokio runtime.
    pub fn new(repo: R, config: &StoreConfig) -> Result<Self, StoreInitError> {
        config.validate()?;
        let runtime = Handle::try_current().map_err(|_| StoreInitError::NoRuntime)?;
        let (state_tx, _) = watch::channel(StoreSnapshot::default());

        Ok(Self {
            tasks: Vec::new(),
            input: String::new(),
            editing: None,
            hydrated: false,
            persistence: Arc::new(TaskPersistence::new(repo, config.storage_key.clone())),
            runtime,
            in_flight: Vec::new(),
            save_seq: 0,
            last_written: Arc::new(Mutex::new(0)),
            state_tx,
        })
    }

    /// Creates a store and performs the startup load.
    pub async fn open(repo: R, config: &StoreConfig) -> Result<Self, StoreInitError> {
        let mut store = Self::new(repo, config)?;
        store.hydrate().await;
        Ok(store)
    }

    /// Replaces the list with the persisted snapshot.
    ///
    /// Runs once; later calls are no-ops.
    pub async fn hydrate(&mut self) {
        if self.hydrated {
            return;
        }

        self.tasks = self.persistence.load().await;
        self.hydrated = true;
        if let Some(id) = self.editing.as_ref() {
            if self.position(id).is_none() {
                self.editing = None;
                self.input.clear();
            }
        }

        info!(
            "event=store_hydrate module=store status=ok count={}",
            self.tasks.len()
        );
        self.publish();
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn input(&self) -> &str {
        self.input.as_str()
    }

    pub fn editing_id(&self) -> Option<&TaskId> {
        self.editing.as_ref()
    }

    pub fn is_editing(&self) -> bool {
        self.editing.is_some()
    }

    pub fn is_hydrated(&self) -> bool {
        self.hydrated
    }

    /// Whether submitting the current buffer would do anything.
    pub fn can_submit(&self) -> bool {
        normalize_task_text(&self.input).is_some()
    }

    /// Current observable state.
    pub fn snapshot(&self) -> StoreSnapshot {
        StoreSnapshot {
            tasks: self.tasks.clone(),
            input: self.input.clone(),
            editing: self.editing.clone(),
            hydrated: self.hydrated,
        }
    }

    /// Subscribes to state changes; the receiver starts at the current state.
    pub fn subscribe(&self) -> watch::Receiver<StoreSnapshot> {
        self.state_tx.subscribe()
    }

    /// Mirrors the text field into the input buffer.
    pub fn set_input(&mut self, text: impl Into<String>) {
        self.input = text.into();
        self.publish();
    }

    /// Submits the current input buffer.
    pub fn submit(&mut self) -> Transition {
        let raw = self.input.clone();
        self.submit_input(&raw)
    }

    /// Updates the task under edit, or adds a new task when not editing.
    pub fn submit_input(&mut self, raw_text: &str) -> Transition {
        if self.editing.is_some() {
            self.update_task(raw_text)
        } else {
            self.add_task(raw_text)
        }
    }

    /// Appends a new open task with the trimmed text.
    pub fn add_task(&mut self, raw_text: &str) -> Transition {
        if !self.hydrated {
            return ignored("task_add", Rejection::NotHydrated);
        }
        let Some(text) = normalize_task_text(raw_text) else {
            return ignored("task_add", Rejection::EmptyText);
        };

        let task = Task::new(text);
        info!(
            "event=task_add module=store status=ok task_id={} count={}",
            task.id,
            self.tasks.len() + 1
        );
        self.tasks.push(task);
        self.input.clear();
        self.commit();
        Transition::Applied
    }

    /// Replaces the text of the task under edit and leaves edit mode.
    ///
    /// Completion state and position are preserved.
    pub fn update_task(&mut self, raw_text: &str) -> Transition {
        if !self.hydrated {
            return ignored("task_update", Rejection::NotHydrated);
        }
        let Some(id) = self.editing.clone() else {
            return ignored("task_update", Rejection::NotEditing);
        };
        let Some(text) = normalize_task_text(raw_text) else {
            return ignored("task_update", Rejection::EmptyText);
        };
        let Some(index) = self.position(&id) else {
            self.editing = None;
            self.publish();
            return ignored("task_update", Rejection::UnknownTask(id));
        };

        self.tasks[index].text = text;
        self.editing = None;
        self.input.clear();
        info!("event=task_update module=store status=ok task_id={id}");
        self.commit();
        Transition::Applied
    }

    pub fn toggle_completion(&mut self, id: &TaskId) -> Transition {
        if !self.hydrated {
            return ignored("task_toggle", Rejection::NotHydrated);
        }
        let Some(index) = self.position(id) else {
            return ignored("task_toggle", Rejection::UnknownTask(id.clone()));
        };

        let task = &mut self.tasks[index];
        task.toggle();
        info!(
            "event=task_toggle module=store status=ok task_id={id} completed={}",
            task.completed
        );
        self.commit();
        Transition::Applied
    }

    /// Removes a task; deleting the task under edit leaves edit mode.
    pub fn delete_task(&mut self, id: &TaskId) -> Transition {
        if !self.hydrated {
            return ignored("task_delete", Rejection::NotHydrated);
        }
        let Some(index) = self.position(id) else {
            return ignored("task_delete", Rejection::UnknownTask(id.clone()));
        };

        self.tasks.remove(index);
        if self.editing.as_ref() == Some(id) {
            self.editing = None;
        }
        info!(
            "event=task_delete module=store status=ok task_id={id} count={}",
            self.tasks.len()
        );
        self.commit();
        Transition::Applied
    }

    /// Enters edit mode for `id` and loads its text into the input buffer.
    pub fn begin_edit(&mut self, id: &TaskId) -> Transition {
        let Some(index) = self.position(id) else {
            return ignored("task_begin_edit", Rejection::UnknownTask(id.clone()));
        };

        self.input = self.tasks[index].text.clone();
        self.editing = Some(id.clone());
        debug!("event=task_begin_edit module=store status=ok task_id={id}");
        self.publish();
        Transition::Applied
    }

    /// Leaves edit mode without touching the list.
    pub fn cancel_edit(&mut self) -> Transition {
        if self.editing.take().is_none() {
            return ignored("task_cancel_edit", Rejection::NotEditing);
        }

        self.input.clear();
        self.publish();
        Transition::Applied
    }

    /// Waits for every save scheduled so far.
    ///
    /// Mutations never call this; it exists for shutdown and tests.
    pub async fn flush_saves(&mut self) {
        let handles = std::mem::take(&mut self.in_flight);
        for handle in handles {
            if let Err(err) = handle.await {
                error!("event=tasks_save module=store status=error error_code=save_task_failed error={err}");
            }
        }
    }

    fn position(&self, id: &TaskId) -> Option<usize> {
        self.tasks.iter().position(|task| &task.id == id)
    }

    fn commit(&mut self) {
        self.schedule_save();
        self.publish();
    }

    fn schedule_save(&mut self) {
        self.in_flight.retain(|handle| !handle.is_finished());

        self.save_seq += 1;
        let seq = self.save_seq;
        let snapshot = self.tasks.clone();
        let persistence = Arc::clone(&self.persistence);
        let last_written = Arc::clone(&self.last_written);
        let handle = self.runtime.spawn(async move {
            let mut last = last_written.lock().await;
            if seq <= *last {
                debug!(
                    "event=tasks_save module=store status=skipped reason=superseded seq={seq} last_seq={}",
                    *last
                );
                return;
            }
            *last = seq;
            // Outcome is logged by `save`; nothing is rolled back.
            let _ = persistence.save(&snapshot).await;
        });
        self.in_flight.push(handle);
    }

    fn publish(&self) {
        self.state_tx.send_replace(self.snapshot());
    }
}

fn ignored(event: &'static str, rejection: Rejection) -> Transition {
    debug!(
        "event={event} module=store status=ignored reason={}",
        rejection.code()
    );
    Transition::Ignored(rejection)
}

#[cfg(test)]
mod tests {
    use super::{Rejection, StoreInitError, TaskStore, Transition};
    use crate::config::StoreConfig;
    use crate::repo::kv_repo::MemoryKvRepository;

    #[test]
    fn new_outside_runtime_is_rejected() {
        let err = TaskStore::new(MemoryKvRepository::new(), &StoreConfig::default())
            .err()
            .unwrap();
        assert_eq!(err, StoreInitError::NoRuntime);
    }

    #[tokio::test]
    async fn cancel_edit_without_cursor_is_ignored() {
        let mut store = TaskStore::open(MemoryKvRepository::new(), &StoreConfig::default())
            .await
            .unwrap();
        assert_eq!(
            store.cancel_edit(),
            Transition::Ignored(Rejection::NotEditing)
        );
    }

    #[tokio::test]
    async fn mutations_before_hydration_are_rejected() {
        let repo = MemoryKvRepository::with_entry("tasks", r#"[{"id":"a","text":"kept","completed":false}]"#);
        let mut store = TaskStore::new(repo.clone(), &StoreConfig::default()).unwrap();

        assert_eq!(
            store.add_task("early"),
            Transition::Ignored(Rejection::NotHydrated)
        );
        store.set_input("early");
        assert_eq!(store.submit(), Transition::Ignored(Rejection::NotHydrated));
        assert!(store.tasks().is_empty());
        store.flush_saves().await;
        assert_eq!(
            repo.peek("tasks").unwrap(),
            r#"[{"id":"a","text":"kept","completed":false}]"#
        );

        store.hydrate().await;
        assert_eq!(store.tasks().len(), 1);
        assert_eq!(store.tasks()[0].text, "kept");
        assert_eq!(store.input(), "early");
        assert!(store.submit().is_applied());
        assert_eq!(store.tasks().len(), 2);
    }
}
