//! Task management.
//!
//! This module provides the task store with:
//! - Tasks with an upper-cased title, description, status and completion flag
//! - Dense per-owner priorities (`1..=N`) that cascade when a task moves
//! - An append-only history of status transitions
//!
//! # Example
//!
//! ```no_run
//! use tasktrack::tasks::{NewTask, NewUser, SqliteTaskStore, Status, TaskStore, TaskUpdate};
//!
//! let store = SqliteTaskStore::new("/tmp/tasks.db").unwrap();
//! let user = store.register_user(NewUser::named("bruce_wayne")).unwrap();
//!
//! // New tasks go to the end of the owner's priorities
//! let task = store.create_task(user.id, NewTask::new("Fix login bug", "OAuth fails")).unwrap();
//!
//! // Moving a task shifts the others; changing status is recorded
//! let update = TaskUpdate { priority: Some(1), status: Some(Status::InProgress), ..Default::default() };
//! store.update_task(task.id, update).unwrap();
//! let history = store.list_history(task.id).unwrap();
//! ```

pub mod history;
pub mod models;
pub mod priority;
pub mod store;

pub use models::{
    normalize_title, InvalidStatus, NewTask, NewUser, Status, Task, TaskHistory, TaskId, User,
    UserId,
};
pub use store::{SqliteTaskStore, StoreOptions, TaskFilter, TaskOrder, TaskStore, TaskUpdate};
