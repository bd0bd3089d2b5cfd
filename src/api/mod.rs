//! Request handling for the task tracker.
//!
//! [`TaskService`] performs each operation on behalf of an authenticated
//! [`User`], enforcing ownership, and returns typed responses. The
//! [`routes`] module maps method and path pairs onto it.

pub mod routes;

use crate::digest::{self, DigestStore, EmailPreferences};
use crate::error::{Error, Result};
use crate::tasks::models::{Status, Task, TaskHistory, TaskId, User, UserId};
use crate::tasks::{NewTask, TaskFilter, TaskStore, TaskUpdate};
use serde::{Deserialize, Serialize};

// Request bodies

/// Body for creating a task.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateTaskRequest {
    /// Title (required).
    pub title: String,
    /// Description (required).
    pub description: String,
    /// Accepted for compatibility and ignored; new tasks go last.
    #[serde(default)]
    pub priority: Option<i64>,
    /// Initial status, `PENDING` when absent.
    #[serde(default)]
    pub status: Status,
    /// Initial completion flag.
    #[serde(default)]
    pub completed: bool,
}

/// Body for updating a task. Absent fields are left unchanged.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateTaskRequest {
    /// New title.
    pub title: Option<String>,
    /// New description.
    pub description: Option<String>,
    /// Requested priority, clamped to the owner's range.
    pub priority: Option<i64>,
    /// New status.
    pub status: Option<Status>,
    /// New completion flag.
    pub completed: Option<bool>,
}

impl From<UpdateTaskRequest> for TaskUpdate {
    fn from(req: UpdateTaskRequest) -> Self {
        Self {
            title: req.title,
            description: req.description,
            priority: req.priority,
            status: req.status,
            completed: req.completed,
        }
    }
}

/// An hour given either as a JSON number or as a numeric string.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum HourValue {
    /// `10`
    Number(i64),
    /// `"10"`
    Text(String),
}

impl HourValue {
    /// The requested hour, before clamping.
    ///
    /// # Errors
    ///
    /// Returns a validation error if a string value is not an integer.
    pub fn requested(&self) -> Result<i64> {
        match self {
            Self::Number(n) => Ok(*n),
            Self::Text(s) => s.trim().parse().map_err(|_| {
                Error::validation(format!("selected_email_hour must be an integer, got '{s}'"))
            }),
        }
    }
}

/// Body for changing the digest hour.
#[derive(Debug, Clone, Deserialize)]
pub struct EmailPreferenceRequest {
    /// Requested hour; out-of-range values are clamped into `0..=23`.
    pub selected_email_hour: HourValue,
}

// Response bodies

/// The owner fields exposed by the public task API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserSummary {
    /// Given name.
    pub first_name: String,
    /// Family name.
    pub last_name: String,
    /// Login name.
    pub username: String,
}

impl From<&User> for UserSummary {
    fn from(user: &User) -> Self {
        Self {
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            username: user.username.clone(),
        }
    }
}

/// Public task shape. Field order is part of the wire format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaskResponse {
    /// Task id.
    pub id: TaskId,
    /// Upper-cased title.
    pub title: String,
    /// Description.
    pub description: String,
    /// Completion flag.
    pub completed: bool,
    /// Status.
    pub status: Status,
    /// Owner.
    pub user: UserSummary,
}

impl TaskResponse {
    fn from_task(task: &Task, owner: &User) -> Self {
        Self {
            id: task.id,
            title: task.title.clone(),
            description: task.description.clone(),
            completed: task.completed,
            status: task.status,
            user: UserSummary::from(owner),
        }
    }
}

/// Performs task operations for authenticated users.
#[derive(Debug, Clone)]
pub struct TaskService<S> {
    store: S,
}

impl<S> TaskService<S>
where
    S: TaskStore + DigestStore,
{
    /// Wrap a store.
    pub const fn new(store: S) -> Self {
        Self { store }
    }

    /// The underlying store.
    pub const fn store(&self) -> &S {
        &self.store
    }

    /// Fetch a task the caller owns.
    fn owned_task(&self, caller: &User, id: TaskId) -> Result<Task> {
        let task = self.store.get_task(id)?.ok_or(Error::TaskNotFound(id))?;
        if task.owner != caller.id {
            tracing::warn!(caller = caller.id, task_id = id, "rejected access to another user's task");
            return Err(Error::Forbidden { caller: caller.id, resource: format!("task {id}") });
        }
        Ok(task)
    }

    /// The caller's tasks, priority 1 first.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    pub fn list_tasks(&self, caller: &User) -> Result<Vec<Task>> {
        self.store.list_tasks(caller.id, TaskFilter::by_priority())
    }

    /// Create a task owned by the caller.
    ///
    /// # Errors
    ///
    /// Returns a validation error for a blank title or description.
    pub fn create_task(&self, caller: &User, request: CreateTaskRequest) -> Result<Task> {
        if let Some(priority) = request.priority {
            tracing::debug!(priority, "ignoring requested priority on create");
        }
        let new_task = NewTask {
            title: request.title,
            description: request.description,
            status: request.status,
            completed: request.completed,
        };
        self.store.create_task(caller.id, new_task)
    }

    /// Update one of the caller's tasks.
    ///
    /// # Errors
    ///
    /// Returns `TaskNotFound` for an unknown id, `Forbidden` when the caller
    /// does not own the task, or a validation error for blank text.
    pub fn update_task(&self, caller: &User, id: TaskId, request: UpdateTaskRequest) -> Result<Task> {
        self.owned_task(caller, id)?;
        self.store.update_task(id, request.into())?.ok_or(Error::TaskNotFound(id))
    }

    /// Delete one of the caller's tasks.
    ///
    /// # Errors
    ///
    /// Returns `TaskNotFound` or `Forbidden` as for [`Self::update_task`].
    pub fn delete_task(&self, caller: &User, id: TaskId) -> Result<()> {
        self.owned_task(caller, id)?;
        if self.store.delete_task(id)? {
            Ok(())
        } else {
            Err(Error::TaskNotFound(id))
        }
    }

    /// The caller's tasks in the public shape, in creation order.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    pub fn api_tasks(&self, caller: &User) -> Result<Vec<TaskResponse>> {
        let tasks = self.store.list_tasks(caller.id, TaskFilter::default())?;
        Ok(tasks.iter().map(|task| TaskResponse::from_task(task, caller)).collect())
    }

    /// Status transitions of one of the caller's tasks, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `TaskNotFound` or `Forbidden` as for [`Self::update_task`].
    pub fn task_history(&self, caller: &User, id: TaskId) -> Result<Vec<TaskHistory>> {
        self.owned_task(caller, id)?;
        self.store.list_history(id)
    }

    /// Change the caller's own digest hour.
    ///
    /// # Errors
    ///
    /// Returns `Forbidden` when `user_id` is not the caller, or a validation
    /// error for a non-numeric hour.
    pub fn update_email_preference(
        &self,
        caller: &User,
        user_id: UserId,
        request: &EmailPreferenceRequest,
    ) -> Result<EmailPreferences> {
        if user_id != caller.id {
            return Err(Error::Forbidden {
                caller: caller.id,
                resource: format!("email preferences of user {user_id}"),
            });
        }
        let requested = request.selected_email_hour.requested()?;
        digest::update_email_preference(&self.store, caller.id, requested)
    }
}
