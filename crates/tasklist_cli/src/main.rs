//! Line-oriented shell over the task store.
//!
//! # Responsibility
//! - Wire logging, the SQLite key-value store and `TaskStore` together.
//! - Translate typed lines into store operations and render the list.
//!
//! Plain text is submitted as a new task (or as the edited text while in
//! edit mode). Commands start with `:`.

use log::error;
use std::path::PathBuf;
use tasklist_core::db::open_db;
use tasklist_core::{
    core_version, default_log_level, init_logging, SqliteKvRepository, StoreConfig, TaskId,
    TaskStore, Transition,
};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

const DB_PATH_ENV: &str = "TASKLIST_DB_PATH";
const LOG_DIR_ENV: &str = "TASKLIST_LOG_DIR";
const DB_FILE_NAME: &str = "tasklist.sqlite3";
const LOG_DIR_NAME: &str = "tasklist-logs";

const HELP: &str = "commands: <text> | :list | :toggle N | :edit N | :delete N | :cancel | :help | :quit";

#[derive(Debug, PartialEq, Eq)]
enum Command {
    Submit(String),
    List,
    Toggle(usize),
    Edit(usize),
    Delete(usize),
    Cancel,
    Help,
    Quit,
    Unknown(String),
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    if let Err(message) = run().await {
        eprintln!("tasklist: {message}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), String> {
    let log_dir = resolve_path(LOG_DIR_ENV, LOG_DIR_NAME);
    if let Err(err) = init_logging(default_log_level(), &log_dir.to_string_lossy()) {
        // Logging is diagnostics only; the shell still works without it.
        eprintln!("tasklist: logging disabled: {err}");
    }

    let db_path = resolve_path(DB_PATH_ENV, DB_FILE_NAME);
    let conn = open_db(&db_path).map_err(|err| format!("cannot open {}: {err}", db_path.display()))?;
    let mut store = TaskStore::open(SqliteKvRepository::new(conn), &StoreConfig::default())
        .await
        .map_err(|err| err.to_string())?;

    println!("tasklist {} ({})", core_version(), db_path.display());
    println!("{HELP}");
    render(&store);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();
    loop {
        let prompt = if store.is_editing() { "edit> " } else { "add> " };
        if stdout.write_all(prompt.as_bytes()).await.is_err() || stdout.flush().await.is_err() {
            break;
        }

        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(err) => {
                error!("event=cli_read module=cli status=error error={err}");
                break;
            }
        };

        match parse_command(&line) {
            Command::Quit => break,
            command => apply(&mut store, command),
        }
    }

    store.flush_saves().await;
    Ok(())
}

fn apply(store: &mut TaskStore<SqliteKvRepository>, command: Command) {
    let outcome = match command {
        Command::Submit(text) => {
            store.set_input(text);
            store.submit()
        }
        Command::List => {
            render(store);
            return;
        }
        Command::Toggle(index) => match task_at(store, index) {
            Some(id) => store.toggle_completion(&id),
            None => return no_such_task(index),
        },
        Command::Edit(index) => match task_at(store, index) {
            Some(id) => {
                let outcome = store.begin_edit(&id);
                println!("editing #{index}: {}", store.input());
                outcome
            }
            None => return no_such_task(index),
        },
        Command::Delete(index) => match task_at(store, index) {
            Some(id) => store.delete_task(&id),
            None => return no_such_task(index),
        },
        Command::Cancel => store.cancel_edit(),
        Command::Help => {
            println!("{HELP}");
            return;
        }
        Command::Unknown(raw) => {
            println!("unknown command `{raw}`; {HELP}");
            return;
        }
        Command::Quit => return,
    };

    if outcome == Transition::Applied {
        render(store);
    }
}

fn parse_command(line: &str) -> Command {
    let trimmed = line.trim();
    let Some(rest) = trimmed.strip_prefix(':') else {
        return Command::Submit(line.to_string());
    };

    let mut parts = rest.split_whitespace();
    let name = parts.next().unwrap_or_default();
    let index = parts.next().and_then(|raw| raw.parse::<usize>().ok());
    match (name, index) {
        ("list" | "ls", _) => Command::List,
        ("toggle" | "t", Some(index)) => Command::Toggle(index),
        ("edit" | "e", Some(index)) => Command::Edit(index),
        ("delete" | "rm", Some(index)) => Command::Delete(index),
        ("cancel", _) => Command::Cancel,
        ("help" | "h", _) => Command::Help,
        ("quit" | "q", _) => Command::Quit,
        _ => Command::Unknown(trimmed.to_string()),
    }
}

/// Maps a 1-based display index to a task id.
fn task_at(store: &TaskStore<SqliteKvRepository>, index: usize) -> Option<TaskId> {
    index
        .checked_sub(1)
        .and_then(|position| store.tasks().get(position))
        .map(|task| task.id.clone())
}

fn no_such_task(index: usize) {
    println!("no task #{index}");
}

fn render(store: &TaskStore<SqliteKvRepository>) {
    print!("{}", render_list(store));
}

fn render_list(store: &TaskStore<SqliteKvRepository>) -> String {
    if store.tasks().is_empty() {
        return "(no tasks)\n".to_string();
    }
    store
        .tasks()
        .iter()
        .enumerate()
        .map(|(position, task)| {
            let marker = if task.completed { "x" } else { " " };
            let editing = if store.editing_id() == Some(&task.id) { " *" } else { "" };
            format!("{:>3}. [{marker}] {}{editing}\n", position + 1, task.text)
        })
        .collect()
}

fn resolve_path(env_key: &str, default_name: &str) -> PathBuf {
    if let Ok(raw) = std::env::var(env_key) {
        let trimmed = raw.trim();
        if !trimmed.is_empty() {
            return PathBuf::from(trimmed);
        }
    }
    std::env::temp_dir().join(default_name)
}
