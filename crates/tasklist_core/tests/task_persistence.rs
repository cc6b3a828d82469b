use tasklist_core::db::open_db_in_memory;
use tasklist_core::{
    KvRepository, MemoryKvRepository, PersistenceError, RepoError, SqliteKvRepository, Task,
    TaskId, TaskPersistence,
};

fn sample_tasks() -> Vec<Task> {
    let mut done = Task::with_id(TaskId::parse("2").unwrap(), "file taxes");
    done.completed = true;
    vec![
        Task::with_id(TaskId::parse("1").unwrap(), "buy milk"),
        done,
        Task::new("call \"mom\"\nafter 6"),
    ]
}

#[tokio::test]
async fn save_then_load_preserves_content_and_order() {
    let persistence = TaskPersistence::new(MemoryKvRepository::new(), "tasks");
    let tasks = sample_tasks();

    persistence.save(&tasks).await.unwrap();
    assert_eq!(persistence.load().await, tasks);
}

#[tokio::test]
async fn sqlite_save_then_load_preserves_content_and_order() {
    let repo = SqliteKvRepository::new(open_db_in_memory().unwrap());
    let persistence = TaskPersistence::new(repo, "tasks");
    let tasks = sample_tasks();

    persistence.save(&tasks).await.unwrap();
    assert_eq!(persistence.load().await, tasks);

    persistence.save(&[]).await.unwrap();
    assert!(persistence.load().await.is_empty());
}

#[tokio::test]
async fn load_without_snapshot_is_empty() {
    let persistence = TaskPersistence::new(MemoryKvRepository::new(), "tasks");
    assert!(persistence.load().await.is_empty());
}

#[tokio::test]
async fn load_over_corrupted_blob_is_empty() {
    for blob in ["{not json", "null", "42", r#"[{"id":"1","text":"x"}]"#] {
        let repo = MemoryKvRepository::with_entry("tasks", blob);
        let persistence = TaskPersistence::new(repo, "tasks");
        assert!(persistence.load().await.is_empty(), "blob {blob} should degrade");
    }
}

#[tokio::test]
async fn load_accepts_snapshot_from_timestamp_ids() {
    let blob = r#"[{"id":"1700000000000","text":"legacy","completed":true}]"#;
    let persistence = TaskPersistence::new(MemoryKvRepository::with_entry("tasks", blob), "tasks");

    let tasks = persistence.load().await;
    assert_eq!(tasks.len(), 1);
    assert_eq!(tasks[0].id.as_str(), "1700000000000");
    assert!(tasks[0].completed);
}

#[tokio::test]
async fn save_writes_under_configured_key_only() {
    let repo = MemoryKvRepository::new();
    let persistence = TaskPersistence::new(repo.clone(), "my-tasks");

    persistence.save(&sample_tasks()).await.unwrap();
    assert!(repo.peek("my-tasks").is_some());
    assert_eq!(repo.get("tasks").await.unwrap(), None);
}

#[tokio::test]
async fn save_failure_is_returned_as_tagged_error() {
    let persistence = TaskPersistence::new(MemoryKvRepository::failing(), "tasks");

    let err = persistence.save(&sample_tasks()).await.unwrap_err();
    assert!(matches!(
        err,
        PersistenceError::Repo(RepoError::Unavailable(_))
    ));
}
