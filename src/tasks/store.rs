//! Task store trait and `SQLite` implementation.

use crate::error::{Error, Result};
use crate::tasks::history;
use crate::tasks::models::{
    normalize_title, require_text, NewTask, NewUser, Status, Task, TaskHistory, TaskId, User,
    UserId,
};
use crate::tasks::priority::{self, Assignment};
use rusqlite::{params, Connection, ErrorCode, OptionalExtension, Transaction, TransactionBehavior};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Columns selected for every task query, in `parse_task` order.
const TASK_COLUMNS: &str =
    "id, owner_id, title, description, priority, status, completed, created_at, updated_at";

/// Trait for task storage operations.
///
/// All methods return a `Result` and may fail with database errors.
#[allow(clippy::missing_errors_doc)]
pub trait TaskStore {
    // Users
    /// Register a new user identity.
    fn register_user(&self, user: NewUser) -> Result<User>;

    /// Get a user by ID.
    fn get_user(&self, id: UserId) -> Result<Option<User>>;

    /// Get a user by username.
    fn find_user(&self, username: &str) -> Result<Option<User>>;

    /// List all users, oldest first.
    fn list_users(&self) -> Result<Vec<User>>;

    // Task CRUD
    /// Create a task owned by `owner` at the end of the owner's priorities.
    fn create_task(&self, owner: UserId, task: NewTask) -> Result<Task>;

    /// Get a task by ID.
    fn get_task(&self, id: TaskId) -> Result<Option<Task>>;

    /// Update a task's fields, cascading priorities and recording status changes.
    fn update_task(&self, id: TaskId, update: TaskUpdate) -> Result<Option<Task>>;

    /// Delete a task and its history, closing the priority gap.
    fn delete_task(&self, id: TaskId) -> Result<bool>;

    /// List an owner's tasks.
    fn list_tasks(&self, owner: UserId, filter: TaskFilter) -> Result<Vec<Task>>;

    // History
    /// Status transitions of a task, oldest first.
    fn list_history(&self, task_id: TaskId) -> Result<Vec<TaskHistory>>;
}

/// Fields that can be updated on a task.
#[derive(Debug, Default, Clone)]
pub struct TaskUpdate {
    /// New title (if Some). Upper-cased on write.
    pub title: Option<String>,
    /// New description (if Some).
    pub description: Option<String>,
    /// Requested priority (if Some). Clamped to the owner's range.
    pub priority: Option<i64>,
    /// New status (if Some).
    pub status: Option<Status>,
    /// New completion flag (if Some).
    pub completed: Option<bool>,
}

impl TaskUpdate {
    /// Check if any fields are set for update.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.priority.is_none()
            && self.status.is_none()
            && self.completed.is_none()
    }

    /// Reject blank replacement text.
    ///
    /// # Errors
    ///
    /// Returns a validation error if a provided title or description is blank.
    pub fn validate(&self) -> Result<()> {
        if let Some(ref title) = self.title {
            require_text("title", title)?;
        }
        if let Some(ref description) = self.description {
            require_text("description", description)?;
        }
        Ok(())
    }
}

/// Ordering for listed tasks.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum TaskOrder {
    /// Insertion order.
    #[default]
    Created,
    /// Priority 1 first.
    Priority,
}

/// Filter options for listing tasks.
#[derive(Debug, Default, Clone)]
pub struct TaskFilter {
    /// Filter by status.
    pub status: Option<Status>,
    /// Result ordering.
    pub order: TaskOrder,
}

impl TaskFilter {
    /// All tasks ordered by priority.
    #[must_use]
    pub fn by_priority() -> Self {
        Self { order: TaskOrder::Priority, ..Self::default() }
    }
}

/// Tuning for the write path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreOptions {
    /// How many times a conflicting write transaction is attempted.
    pub max_write_attempts: u32,
    /// How long a connection waits for the write lock.
    pub busy_timeout: Duration,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self { max_write_attempts: 5, busy_timeout: Duration::from_secs(5) }
    }
}

/// SQLite-based task store.
#[derive(Debug, Clone)]
pub struct SqliteTaskStore {
    db_path: PathBuf,
    options: StoreOptions,
}

impl SqliteTaskStore {
    /// Create a new `SQLite` task store at the given database path.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be initialized.
    pub fn new(db_path: impl AsRef<Path>) -> Result<Self> {
        Self::with_options(db_path, StoreOptions::default())
    }

    /// Create a store with explicit write-path tuning.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be initialized.
    pub fn with_options(db_path: impl AsRef<Path>, options: StoreOptions) -> Result<Self> {
        let store = Self { db_path: db_path.as_ref().to_path_buf(), options };
        store.init_schema()?;
        Ok(store)
    }

    /// Get the database path.
    #[must_use]
    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    /// Open a connection to the database.
    pub(crate) fn open(&self) -> Result<Connection> {
        if let Some(parent) = self.db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(&self.db_path)?;
        conn.busy_timeout(self.options.busy_timeout)?;
        conn.execute_batch("PRAGMA foreign_keys = ON; PRAGMA journal_mode = WAL;")?;
        Ok(conn)
    }

    /// Run `op` in an immediate transaction, retrying on write conflicts.
    ///
    /// An immediate transaction takes the database write lock before the
    /// first read, so two writers never compute priorities from the same
    /// snapshot. Unique violations and busy errors are retried; anything
    /// else aborts the transaction and is returned as-is.
    pub(crate) fn write<T>(
        &self,
        operation: &str,
        mut op: impl FnMut(&Transaction<'_>) -> Result<T>,
    ) -> Result<T> {
        let mut conn = self.open()?;
        let attempts = self.options.max_write_attempts.max(1);

        for attempt in 1..=attempts {
            let tx = match conn.transaction_with_behavior(TransactionBehavior::Immediate) {
                Ok(tx) => tx,
                Err(e) if is_conflict(&e) => {
                    backoff(operation, attempt, &e);
                    continue;
                }
                Err(e) => return Err(e.into()),
            };

            match op(&tx) {
                Ok(value) => match tx.commit() {
                    Ok(()) => return Ok(value),
                    Err(e) if is_conflict(&e) => backoff(operation, attempt, &e),
                    Err(e) => return Err(e.into()),
                },
                Err(Error::Database(e)) if is_conflict(&e) => {
                    drop(tx);
                    backoff(operation, attempt, &e);
                }
                Err(e) => return Err(e),
            }
        }

        tracing::warn!(operation, attempts, "giving up after repeated write conflicts");
        Err(Error::Conflict { attempts })
    }

    /// Initialize the database schema.
    fn init_schema(&self) -> Result<()> {
        let conn = self.open()?;

        conn.execute_batch(
            r"
            -- Identities, managed outside this crate
            CREATE TABLE IF NOT EXISTS users (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                username TEXT NOT NULL UNIQUE,
                first_name TEXT NOT NULL DEFAULT '',
                last_name TEXT NOT NULL DEFAULT '',
                email TEXT NOT NULL DEFAULT ''
            );

            -- Core tasks table; priorities are dense per owner
            CREATE TABLE IF NOT EXISTS tasks (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                owner_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                title TEXT NOT NULL,
                description TEXT NOT NULL,
                priority INTEGER NOT NULL,
                status TEXT NOT NULL DEFAULT 'PENDING'
                    CHECK (status IN ('PENDING', 'IN_PROGRESS', 'COMPLETED')),
                completed INTEGER NOT NULL DEFAULT 0,
                created_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now')),
                updated_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now')),
                UNIQUE (owner_id, priority)
            );

            -- Immutable status history
            CREATE TABLE IF NOT EXISTS task_history (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                task_id INTEGER NOT NULL REFERENCES tasks(id) ON DELETE CASCADE,
                previous_status TEXT NOT NULL,
                new_status TEXT NOT NULL,
                changed_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
            );

            CREATE TRIGGER IF NOT EXISTS task_history_append_only
            BEFORE UPDATE ON task_history BEGIN
                SELECT RAISE(ABORT, 'task history is append-only');
            END;

            -- Digest schedule, one row per user
            CREATE TABLE IF NOT EXISTS email_preferences (
                user_id INTEGER PRIMARY KEY REFERENCES users(id) ON DELETE CASCADE,
                selected_email_hour INTEGER NOT NULL DEFAULT 0
                    CHECK (selected_email_hour BETWEEN 0 AND 23),
                previous_report_day INTEGER
                    CHECK (previous_report_day IS NULL OR previous_report_day BETWEEN 1 AND 31)
            );

            CREATE INDEX IF NOT EXISTS idx_tasks_owner ON tasks(owner_id);
            CREATE INDEX IF NOT EXISTS idx_task_history_task_id ON task_history(task_id);
            CREATE INDEX IF NOT EXISTS idx_email_preferences_hour
                ON email_preferences(selected_email_hour);
            ",
        )?;

        Ok(())
    }

    /// Parse a task from a row selected with `TASK_COLUMNS`.
    fn parse_task(row: &rusqlite::Row) -> rusqlite::Result<Task> {
        let status_str: String = row.get(5)?;

        Ok(Task {
            id: row.get(0)?,
            owner: row.get(1)?,
            title: row.get(2)?,
            description: row.get(3)?,
            priority: row.get(4)?,
            status: Status::from_str(&status_str).unwrap_or_default(),
            completed: row.get(6)?,
            created_at: row.get(7)?,
            updated_at: row.get(8)?,
        })
    }

    /// Parse a user from a row.
    fn parse_user(row: &rusqlite::Row) -> rusqlite::Result<User> {
        Ok(User {
            id: row.get(0)?,
            username: row.get(1)?,
            first_name: row.get(2)?,
            last_name: row.get(3)?,
            email: row.get(4)?,
        })
    }

    fn fetch_task(conn: &Connection, id: TaskId) -> Result<Option<Task>> {
        let task = conn
            .query_row(
                &format!("SELECT {TASK_COLUMNS} FROM tasks WHERE id = ?1"),
                params![id],
                Self::parse_task,
            )
            .optional()?;
        Ok(task)
    }

    /// The owner's task ids, priority 1 first.
    fn priority_order(conn: &Connection, owner: UserId) -> Result<Vec<TaskId>> {
        let mut stmt =
            conn.prepare("SELECT id FROM tasks WHERE owner_id = ?1 ORDER BY priority ASC")?;
        let ids = stmt.query_map(params![owner], |row| row.get(0))?.collect::<rusqlite::Result<_>>()?;
        Ok(ids)
    }

    /// Write a priority plan without tripping the `(owner_id, priority)`
    /// uniqueness check halfway through.
    ///
    /// Targets are first parked at their negated value, which no live row
    /// holds, then flipped back in one statement.
    fn apply_plan(conn: &Connection, owner: UserId, plan: &[Assignment]) -> Result<()> {
        if plan.is_empty() {
            return Ok(());
        }
        let mut park = conn.prepare("UPDATE tasks SET priority = ?1 WHERE id = ?2")?;
        for &(id, target) in plan {
            park.execute(params![-i64::from(target), id])?;
        }
        conn.execute(
            "UPDATE tasks SET priority = -priority, updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
             WHERE owner_id = ?1 AND priority < 0",
            params![owner],
        )?;
        Ok(())
    }
}

/// Whether a database error is worth retrying the transaction for.
fn is_conflict(err: &rusqlite::Error) -> bool {
    match err {
        rusqlite::Error::SqliteFailure(e, _) => {
            matches!(e.code, ErrorCode::DatabaseBusy | ErrorCode::DatabaseLocked)
                || e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
        }
        _ => false,
    }
}

fn backoff(operation: &str, attempt: u32, err: &rusqlite::Error) {
    tracing::debug!(operation, attempt, error = %err, "write conflict, retrying");
    std::thread::sleep(Duration::from_millis(5 * u64::from(attempt)));
}

impl TaskStore for SqliteTaskStore {
    fn register_user(&self, user: NewUser) -> Result<User> {
        require_text("username", &user.username)?;
        let conn = self.open()?;

        let inserted = conn.execute(
            "INSERT INTO users (username, first_name, last_name, email) VALUES (?1, ?2, ?3, ?4)",
            params![user.username.trim(), user.first_name, user.last_name, user.email],
        );
        match inserted {
            Ok(_) => {}
            Err(e) if is_conflict(&e) => {
                return Err(Error::validation(format!(
                    "username already taken: {}",
                    user.username.trim()
                )));
            }
            Err(e) => return Err(e.into()),
        }

        let user = conn.query_row(
            "SELECT id, username, first_name, last_name, email FROM users WHERE id = ?1",
            params![conn.last_insert_rowid()],
            Self::parse_user,
        )?;
        tracing::info!(user_id = user.id, username = %user.username, "registered user");
        Ok(user)
    }

    fn get_user(&self, id: UserId) -> Result<Option<User>> {
        let conn = self.open()?;
        let user = conn
            .query_row(
                "SELECT id, username, first_name, last_name, email FROM users WHERE id = ?1",
                params![id],
                Self::parse_user,
            )
            .optional()?;
        Ok(user)
    }

    fn find_user(&self, username: &str) -> Result<Option<User>> {
        let conn = self.open()?;
        let user = conn
            .query_row(
                "SELECT id, username, first_name, last_name, email FROM users WHERE username = ?1",
                params![username.trim()],
                Self::parse_user,
            )
            .optional()?;
        Ok(user)
    }

    fn list_users(&self) -> Result<Vec<User>> {
        let conn = self.open()?;
        let mut stmt = conn
            .prepare("SELECT id, username, first_name, last_name, email FROM users ORDER BY id")?;
        let users = stmt.query_map([], Self::parse_user)?.collect::<rusqlite::Result<_>>()?;
        Ok(users)
    }

    fn create_task(&self, owner: UserId, task: NewTask) -> Result<Task> {
        task.validate()?;
        let title = normalize_title(&task.title);

        let created = self.write("create_task", |tx| {
            let owner_exists: bool = tx.query_row(
                "SELECT EXISTS(SELECT 1 FROM users WHERE id = ?1)",
                params![owner],
                |row| row.get(0),
            )?;
            if !owner_exists {
                return Err(Error::UserNotFound(owner.to_string()));
            }

            let current_max: Option<u32> = tx.query_row(
                "SELECT MAX(priority) FROM tasks WHERE owner_id = ?1",
                params![owner],
                |row| row.get(0),
            )?;
            let priority = priority::next_priority(current_max);

            tx.execute(
                "INSERT INTO tasks (owner_id, title, description, priority, status, completed)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    owner,
                    title,
                    task.description,
                    priority,
                    task.status.as_str(),
                    task.completed
                ],
            )?;

            let id = tx.last_insert_rowid();
            Self::fetch_task(tx, id)?.ok_or(Error::TaskNotFound(id))
        })?;

        tracing::info!(
            task_id = created.id,
            owner,
            priority = created.priority,
            "created task"
        );
        Ok(created)
    }

    fn get_task(&self, id: TaskId) -> Result<Option<Task>> {
        let conn = self.open()?;
        Self::fetch_task(&conn, id)
    }

    fn update_task(&self, id: TaskId, update: TaskUpdate) -> Result<Option<Task>> {
        update.validate()?;
        if update.is_empty() {
            return self.get_task(id);
        }

        self.write("update_task", |tx| {
            let Some(old_task) = Self::fetch_task(tx, id)? else {
                return Ok(None);
            };

            if let Some(requested) = update.priority {
                let order = Self::priority_order(tx, old_task.owner)?;
                let plan = priority::plan_move(&order, id, requested);
                Self::apply_plan(tx, old_task.owner, &plan)?;
                if !plan.is_empty() {
                    tracing::info!(
                        task_id = id,
                        owner = old_task.owner,
                        from = old_task.priority,
                        requested,
                        shifted = plan.len() - 1,
                        "cascaded priorities"
                    );
                }
            }

            // Build dynamic UPDATE statement
            let mut updates = vec!["updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')"];
            let mut values: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

            if let Some(ref title) = update.title {
                updates.push("title = ?");
                values.push(Box::new(normalize_title(title)));
            }
            if let Some(ref description) = update.description {
                updates.push("description = ?");
                values.push(Box::new(description.clone()));
            }
            if let Some(status) = update.status {
                updates.push("status = ?");
                values.push(Box::new(status.as_str()));
            }
            if let Some(completed) = update.completed {
                updates.push("completed = ?");
                values.push(Box::new(completed));
            }

            values.push(Box::new(id));

            let sql = format!("UPDATE tasks SET {} WHERE id = ?", updates.join(", "));
            let params: Vec<&dyn rusqlite::ToSql> = values.iter().map(AsRef::as_ref).collect();
            tx.execute(&sql, params.as_slice())?;

            if let Some(status) = update.status {
                if status != old_task.status {
                    history::record(tx, id, old_task.status, status)?;
                }
            }

            Self::fetch_task(tx, id)
        })
    }

    fn delete_task(&self, id: TaskId) -> Result<bool> {
        let deleted = self.write("delete_task", |tx| {
            let Some(task) = Self::fetch_task(tx, id)? else {
                return Ok(false);
            };

            let order = Self::priority_order(tx, task.owner)?;
            let plan = priority::plan_removal(&order, id);

            tx.execute("DELETE FROM tasks WHERE id = ?1", params![id])?;
            Self::apply_plan(tx, task.owner, &plan)?;
            Ok(true)
        })?;

        if deleted {
            tracing::info!(task_id = id, "deleted task");
        }
        Ok(deleted)
    }

    fn list_tasks(&self, owner: UserId, filter: TaskFilter) -> Result<Vec<Task>> {
        let conn = self.open()?;

        let mut conditions = vec!["owner_id = ?"];
        let mut params_vec: Vec<Box<dyn rusqlite::ToSql>> = vec![Box::new(owner)];

        if let Some(status) = filter.status {
            conditions.push("status = ?");
            params_vec.push(Box::new(status.as_str()));
        }

        let order_by = match filter.order {
            TaskOrder::Created => "id ASC",
            TaskOrder::Priority => "priority ASC",
        };

        let sql = format!(
            "SELECT {TASK_COLUMNS} FROM tasks WHERE {} ORDER BY {order_by}",
            conditions.join(" AND ")
        );

        let params: Vec<&dyn rusqlite::ToSql> = params_vec.iter().map(AsRef::as_ref).collect();
        let mut stmt = conn.prepare(&sql)?;
        let tasks =
            stmt.query_map(params.as_slice(), Self::parse_task)?.collect::<rusqlite::Result<_>>()?;

        Ok(tasks)
    }

    fn list_history(&self, task_id: TaskId) -> Result<Vec<TaskHistory>> {
        let conn = self.open()?;
        history::list_for_task(&conn, task_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn create_test_store() -> (TempDir, SqliteTaskStore) {
        let dir = TempDir::new().unwrap();
        let db_path = dir.path().join("test.db");
        let store = SqliteTaskStore::new(&db_path).unwrap();
        (dir, store)
    }

    fn priorities(store: &SqliteTaskStore, owner: UserId) -> Vec<u32> {
        store
            .list_tasks(owner, TaskFilter::default())
            .unwrap()
            .into_iter()
            .map(|t| t.priority)
            .collect()
    }

    fn title_at(store: &SqliteTaskStore, owner: UserId, priority: u32) -> Option<String> {
        store
            .list_tasks(owner, TaskFilter::default())
            .unwrap()
            .into_iter()
            .find(|t| t.priority == priority)
            .map(|t| t.title)
    }

    #[test]
    fn test_register_and_find_user() {
        let (_dir, store) = create_test_store();

        let user = store.register_user(NewUser::named("bruce_wayne")).unwrap();
        assert_eq!(user.username, "bruce_wayne");
        assert_eq!(user.first_name, "");

        assert_eq!(store.find_user("bruce_wayne").unwrap(), Some(user.clone()));
        assert_eq!(store.get_user(user.id).unwrap(), Some(user));
        assert!(store.find_user("nobody").unwrap().is_none());
    }

    #[test]
    fn test_register_duplicate_username_fails() {
        let (_dir, store) = create_test_store();
        store.register_user(NewUser::named("bruce_wayne")).unwrap();

        let err = store.register_user(NewUser::named("bruce_wayne")).unwrap_err();
        assert!(matches!(err, Error::Validation(_)), "got {err:?}");
    }

    #[test]
    fn test_register_blank_username_fails() {
        let (_dir, store) = create_test_store();
        assert!(matches!(store.register_user(NewUser::named("  ")), Err(Error::Validation(_))));
    }

    #[test]
    fn test_create_and_get_task() {
        let (_dir, store) = create_test_store();
        let user = store.register_user(NewUser::named("bruce_wayne")).unwrap();

        let task = store.create_task(user.id, NewTask::new("Test task one", "test")).unwrap();
        assert_eq!(task.id, 1);
        assert_eq!(task.owner, user.id);
        assert_eq!(task.title, "TEST TASK ONE");
        assert_eq!(task.description, "test");
        assert_eq!(task.priority, 1);
        assert_eq!(task.status, Status::Pending);
        assert!(!task.completed);

        let fetched = store.get_task(task.id).unwrap().unwrap();
        assert_eq!(fetched, task);
    }

    #[test]
    fn test_create_assigns_next_priority() {
        let (_dir, store) = create_test_store();
        let user = store.register_user(NewUser::named("bruce_wayne")).unwrap();

        for n in 1..=4 {
            let task = store.create_task(user.id, NewTask::new(format!("Task {n}"), "d")).unwrap();
            assert_eq!(task.priority, n);
        }
    }

    #[test]
    fn test_create_requires_title_and_description() {
        let (_dir, store) = create_test_store();
        let user = store.register_user(NewUser::named("bruce_wayne")).unwrap();

        assert!(matches!(
            store.create_task(user.id, NewTask::new("", "desc")),
            Err(Error::Validation(_))
        ));
        assert!(matches!(
            store.create_task(user.id, NewTask::new("title", "")),
            Err(Error::Validation(_))
        ));
        assert!(store.list_tasks(user.id, TaskFilter::default()).unwrap().is_empty());
    }

    #[test]
    fn test_create_for_unknown_owner_fails() {
        let (_dir, store) = create_test_store();
        let err = store.create_task(42, NewTask::new("title", "desc")).unwrap_err();
        assert!(matches!(err, Error::UserNotFound(_)), "got {err:?}");
    }

    #[test]
    fn test_owners_have_independent_priorities() {
        let (_dir, store) = create_test_store();
        let bruce = store.register_user(NewUser::named("bruce_wayne")).unwrap();
        let other = store.register_user(NewUser::named("test_user")).unwrap();

        store.create_task(bruce.id, NewTask::new("a", "d")).unwrap();
        store.create_task(bruce.id, NewTask::new("b", "d")).unwrap();
        let first = store.create_task(other.id, NewTask::new("c", "d")).unwrap();

        assert_eq!(first.priority, 1);
        assert_eq!(priorities(&store, bruce.id), vec![1, 2]);
        assert_eq!(priorities(&store, other.id), vec![1]);
    }

    #[test]
    fn test_priority_cascading_scenario() {
        let (_dir, store) = create_test_store();
        let user = store.register_user(NewUser::named("bruce_wayne")).unwrap();

        let mut ids = Vec::new();
        for title in ["Test task four", "Test task three", "Test task two", "Test task one"] {
            ids.push(store.create_task(user.id, NewTask::new(title, "test")).unwrap().id);
        }
        assert_eq!(priorities(&store, user.id), vec![1, 2, 3, 4]);
        assert_eq!(title_at(&store, user.id, 4).unwrap(), "TEST TASK ONE");

        let before_two = title_at(&store, user.id, 2).unwrap();
        let before_three = title_at(&store, user.id, 3).unwrap();

        let moved = store
            .update_task(
                ids[3],
                TaskUpdate {
                    title: Some("TEST TASK ONE".to_string()),
                    description: Some("test".to_string()),
                    priority: Some(3),
                    status: Some(Status::Pending),
                    completed: Some(false),
                },
            )
            .unwrap()
            .unwrap();

        assert_eq!(moved.priority, 3);
        assert_eq!(title_at(&store, user.id, 1).unwrap(), "TEST TASK FOUR");
        assert_eq!(title_at(&store, user.id, 2).unwrap(), before_two);
        assert_eq!(title_at(&store, user.id, 3).unwrap(), "TEST TASK ONE");
        assert_eq!(title_at(&store, user.id, 4).unwrap(), before_three);
        assert!(title_at(&store, user.id, 5).is_none());
    }

    #[test]
    fn test_update_priority_out_of_range_clamps() {
        let (_dir, store) = create_test_store();
        let user = store.register_user(NewUser::named("bruce_wayne")).unwrap();
        let a = store.create_task(user.id, NewTask::new("a", "d")).unwrap();
        let b = store.create_task(user.id, NewTask::new("b", "d")).unwrap();

        let moved = store
            .update_task(a.id, TaskUpdate { priority: Some(50), ..Default::default() })
            .unwrap()
            .unwrap();
        assert_eq!(moved.priority, 2);
        assert_eq!(store.get_task(b.id).unwrap().unwrap().priority, 1);

        let moved = store
            .update_task(a.id, TaskUpdate { priority: Some(-3), ..Default::default() })
            .unwrap()
            .unwrap();
        assert_eq!(moved.priority, 1);
        assert_eq!(priorities(&store, user.id), vec![1, 2]);
    }

    #[test]
    fn test_update_normalizes_title() {
        let (_dir, store) = create_test_store();
        let user = store.register_user(NewUser::named("bruce_wayne")).unwrap();
        let task = store.create_task(user.id, NewTask::new("Original", "d")).unwrap();

        let updated = store
            .update_task(
                task.id,
                TaskUpdate { title: Some("renamed task".to_string()), ..Default::default() },
            )
            .unwrap()
            .unwrap();
        assert_eq!(updated.title, "RENAMED TASK");
        assert_eq!(updated.priority, 1);
    }

    #[test]
    fn test_update_blank_title_rejected_without_write() {
        let (_dir, store) = create_test_store();
        let user = store.register_user(NewUser::named("bruce_wayne")).unwrap();
        let task = store.create_task(user.id, NewTask::new("Original", "d")).unwrap();

        let result = store.update_task(
            task.id,
            TaskUpdate {
                title: Some(String::new()),
                status: Some(Status::Completed),
                ..Default::default()
            },
        );
        assert!(matches!(result, Err(Error::Validation(_))));

        let unchanged = store.get_task(task.id).unwrap().unwrap();
        assert_eq!(unchanged.status, Status::Pending);
        assert!(store.list_history(task.id).unwrap().is_empty());
    }

    #[test]
    fn test_update_nonexistent_task() {
        let (_dir, store) = create_test_store();
        let result = store
            .update_task(99, TaskUpdate { title: Some("Test".to_string()), ..Default::default() })
            .unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn test_update_empty_does_nothing() {
        let (_dir, store) = create_test_store();
        let user = store.register_user(NewUser::named("bruce_wayne")).unwrap();
        let task = store.create_task(user.id, NewTask::new("Test", "d")).unwrap();

        let result = store.update_task(task.id, TaskUpdate::default()).unwrap();
        assert_eq!(result.unwrap().title, "TEST");
    }

    #[test]
    fn test_completed_flag_is_independent_of_status() {
        let (_dir, store) = create_test_store();
        let user = store.register_user(NewUser::named("bruce_wayne")).unwrap();
        let task = store.create_task(user.id, NewTask::new("Test", "d")).unwrap();

        let updated = store
            .update_task(task.id, TaskUpdate { completed: Some(true), ..Default::default() })
            .unwrap()
            .unwrap();
        assert!(updated.completed);
        assert_eq!(updated.status, Status::Pending);
        assert!(store.list_history(task.id).unwrap().is_empty());
    }

    #[test]
    fn test_status_changes_are_recorded() {
        let (_dir, store) = create_test_store();
        let user = store.register_user(NewUser::named("bruce_wayne")).unwrap();
        let task = store.create_task(user.id, NewTask::new("test task one", "test task")).unwrap();
        assert!(store.list_history(task.id).unwrap().is_empty());

        for status in [Status::InProgress, Status::Completed] {
            store
                .update_task(task.id, TaskUpdate { status: Some(status), ..Default::default() })
                .unwrap();
        }

        let history = store.list_history(task.id).unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].previous_status, Status::Pending);
        assert_eq!(history[0].new_status, Status::InProgress);
        assert_eq!(history[1].previous_status, Status::InProgress);
        assert_eq!(history[1].new_status, Status::Completed);
        assert!(history[0].id < history[1].id);
    }

    #[test]
    fn test_unchanged_status_is_not_recorded() {
        let (_dir, store) = create_test_store();
        let user = store.register_user(NewUser::named("bruce_wayne")).unwrap();
        let task = store.create_task(user.id, NewTask::new("Test", "d")).unwrap();

        store
            .update_task(
                task.id,
                TaskUpdate {
                    status: Some(Status::Pending),
                    description: Some("changed".to_string()),
                    ..Default::default()
                },
            )
            .unwrap();
        assert!(store.list_history(task.id).unwrap().is_empty());
    }

    #[test]
    fn test_any_status_may_follow_any_other() {
        let (_dir, store) = create_test_store();
        let user = store.register_user(NewUser::named("bruce_wayne")).unwrap();
        let task = store.create_task(user.id, NewTask::new("Test", "d")).unwrap();

        for status in [Status::Completed, Status::Pending, Status::InProgress] {
            store
                .update_task(task.id, TaskUpdate { status: Some(status), ..Default::default() })
                .unwrap();
        }
        assert_eq!(store.list_history(task.id).unwrap().len(), 3);
    }

    #[test]
    fn test_history_rows_are_immutable() {
        let (_dir, store) = create_test_store();
        let user = store.register_user(NewUser::named("bruce_wayne")).unwrap();
        let task = store.create_task(user.id, NewTask::new("Test", "d")).unwrap();
        store
            .update_task(task.id, TaskUpdate { status: Some(Status::Completed), ..Default::default() })
            .unwrap();

        let conn = store.open().unwrap();
        let result = conn.execute("UPDATE task_history SET new_status = 'PENDING'", []);
        assert!(result.is_err());
    }

    #[test]
    fn test_delete_task_closes_gap_and_drops_history() {
        let (_dir, store) = create_test_store();
        let user = store.register_user(NewUser::named("bruce_wayne")).unwrap();
        let a = store.create_task(user.id, NewTask::new("a", "d")).unwrap();
        let b = store.create_task(user.id, NewTask::new("b", "d")).unwrap();
        let c = store.create_task(user.id, NewTask::new("c", "d")).unwrap();
        store
            .update_task(b.id, TaskUpdate { status: Some(Status::Completed), ..Default::default() })
            .unwrap();

        assert!(store.delete_task(b.id).unwrap());
        assert!(store.get_task(b.id).unwrap().is_none());
        assert!(store.list_history(b.id).unwrap().is_empty());
        assert_eq!(store.get_task(a.id).unwrap().unwrap().priority, 1);
        assert_eq!(store.get_task(c.id).unwrap().unwrap().priority, 2);

        // Delete again returns false
        assert!(!store.delete_task(b.id).unwrap());
    }

    #[test]
    fn test_list_tasks_orders_and_filters() {
        let (_dir, store) = create_test_store();
        let user = store.register_user(NewUser::named("bruce_wayne")).unwrap();
        let a = store.create_task(user.id, NewTask::new("a", "d")).unwrap();
        let b = store.create_task(user.id, NewTask::new("b", "d")).unwrap();
        store.update_task(b.id, TaskUpdate { priority: Some(1), ..Default::default() }).unwrap();
        store
            .update_task(a.id, TaskUpdate { status: Some(Status::InProgress), ..Default::default() })
            .unwrap();

        let created: Vec<TaskId> = store
            .list_tasks(user.id, TaskFilter::default())
            .unwrap()
            .iter()
            .map(|t| t.id)
            .collect();
        assert_eq!(created, vec![a.id, b.id]);

        let by_priority: Vec<TaskId> =
            store.list_tasks(user.id, TaskFilter::by_priority()).unwrap().iter().map(|t| t.id).collect();
        assert_eq!(by_priority, vec![b.id, a.id]);

        let in_progress = store
            .list_tasks(
                user.id,
                TaskFilter { status: Some(Status::InProgress), ..Default::default() },
            )
            .unwrap();
        assert_eq!(in_progress.len(), 1);
        assert_eq!(in_progress[0].id, a.id);
    }

    #[test]
    fn test_concurrent_creates_stay_dense() {
        let (_dir, store) = create_test_store();
        let owner = store.register_user(NewUser::named("bruce_wayne")).unwrap().id;

        let handles: Vec<_> = (0..4)
            .map(|worker| {
                let store = store.clone();
                std::thread::spawn(move || {
                    for n in 0..5 {
                        store
                            .create_task(owner, NewTask::new(format!("w{worker} t{n}"), "d"))
                            .unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let mut found = priorities(&store, owner);
        found.sort_unstable();
        assert_eq!(found, (1..=20).collect::<Vec<u32>>());
    }

    #[test]
    fn test_task_update_is_empty() {
        assert!(TaskUpdate::default().is_empty());
        assert!(!TaskUpdate { completed: Some(false), ..Default::default() }.is_empty());
        assert!(!TaskUpdate { priority: Some(1), ..Default::default() }.is_empty());
    }
}
