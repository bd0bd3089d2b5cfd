//! Task model types for the task tracking system.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// Identifier of a task, assigned by the store.
pub type TaskId = i64;

/// Identifier of a user, assigned by the store.
pub type UserId = i64;

/// Task status.
///
/// Any status may follow any other; the store records transitions but does
/// not enforce a transition graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Status {
    /// Not started yet.
    #[default]
    Pending,
    /// Being worked on.
    InProgress,
    /// Done.
    Completed,
}

impl Status {
    /// All statuses, in workflow order.
    pub const ALL: [Self; 3] = [Self::Pending, Self::InProgress, Self::Completed];

    /// Parse a status from a string.
    ///
    /// Accepts the stored form (`IN_PROGRESS`) case-insensitively, and
    /// hyphens in place of underscores.
    ///
    /// # Errors
    ///
    /// Returns an error if the string is not a valid status.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> std::result::Result<Self, InvalidStatus> {
        match s.trim().to_ascii_uppercase().replace('-', "_").as_str() {
            "PENDING" => Ok(Self::Pending),
            "IN_PROGRESS" => Ok(Self::InProgress),
            "COMPLETED" => Ok(Self::Completed),
            _ => Err(InvalidStatus(s.to_string())),
        }
    }

    /// Get the string representation of the status.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::InProgress => "IN_PROGRESS",
            Self::Completed => "COMPLETED",
        }
    }
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Error when an invalid status string is provided.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidStatus(pub String);

impl std::fmt::Display for InvalidStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "invalid status: '{}' (must be one of: PENDING, IN_PROGRESS, COMPLETED)",
            self.0
        )
    }
}

impl std::error::Error for InvalidStatus {}

impl From<InvalidStatus> for Error {
    fn from(err: InvalidStatus) -> Self {
        Self::Validation(err.to_string())
    }
}

/// An identity known to the store. Authentication happens elsewhere.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Unique identifier.
    pub id: UserId,
    /// Login name, unique across users.
    pub username: String,
    /// Given name, may be empty.
    pub first_name: String,
    /// Family name, may be empty.
    pub last_name: String,
    /// Address digests are sent to, may be empty.
    pub email: String,
}

/// Fields for registering a new user.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct NewUser {
    /// Login name.
    pub username: String,
    /// Given name.
    #[serde(default)]
    pub first_name: String,
    /// Family name.
    #[serde(default)]
    pub last_name: String,
    /// Email address.
    #[serde(default)]
    pub email: String,
}

impl NewUser {
    /// Create a registration with only a username.
    pub fn named(username: impl Into<String>) -> Self {
        Self { username: username.into(), ..Self::default() }
    }

    /// Set the email address.
    #[must_use]
    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = email.into();
        self
    }
}

/// A task in the task tracking system.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    /// Unique identifier.
    pub id: TaskId,
    /// The user who created the task and may change it.
    pub owner: UserId,
    /// Short title, always stored upper-cased.
    pub title: String,
    /// Detailed description of the task.
    pub description: String,
    /// Rank among the owner's tasks, dense from 1.
    pub priority: u32,
    /// Current status.
    pub status: Status,
    /// Completion flag, independent of `status`.
    pub completed: bool,
    /// RFC 3339 timestamp when the task was created.
    pub created_at: String,
    /// RFC 3339 timestamp when the task was last updated.
    pub updated_at: String,
}

/// Fields for creating a task. The priority is always computed by the store.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewTask {
    /// Title (normalized to upper case on write).
    pub title: String,
    /// Description.
    pub description: String,
    /// Initial status.
    pub status: Status,
    /// Initial completion flag.
    pub completed: bool,
}

impl NewTask {
    /// Create a pending, not completed task.
    pub fn new(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self { title: title.into(), description: description.into(), ..Self::default() }
    }

    /// Check required fields.
    ///
    /// # Errors
    ///
    /// Returns a validation error if the title or description is blank.
    pub fn validate(&self) -> Result<()> {
        require_text("title", &self.title)?;
        require_text("description", &self.description)
    }
}

/// An immutable record of one status transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskHistory {
    /// Unique identifier; increases with insertion order.
    pub id: i64,
    /// The task whose status changed.
    pub task_id: TaskId,
    /// Status before the update.
    pub previous_status: Status,
    /// Status after the update.
    pub new_status: Status,
    /// RFC 3339 timestamp of the change.
    pub changed_at: String,
}

/// Upper-case a title for storage.
#[must_use]
pub fn normalize_title(title: &str) -> String {
    title.trim().to_uppercase()
}

/// Reject blank text fields.
pub(crate) fn require_text(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(Error::validation(format!("{field} is required")));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_from_str() {
        assert_eq!(Status::from_str("PENDING").unwrap(), Status::Pending);
        assert_eq!(Status::from_str("pending").unwrap(), Status::Pending);
        assert_eq!(Status::from_str("IN_PROGRESS").unwrap(), Status::InProgress);
        assert_eq!(Status::from_str("in-progress").unwrap(), Status::InProgress);
        assert_eq!(Status::from_str("Completed").unwrap(), Status::Completed);
        assert!(Status::from_str("done").is_err());
    }

    #[test]
    fn test_status_as_str() {
        assert_eq!(Status::Pending.as_str(), "PENDING");
        assert_eq!(Status::InProgress.as_str(), "IN_PROGRESS");
        assert_eq!(Status::Completed.as_str(), "COMPLETED");
    }

    #[test]
    fn test_status_default() {
        assert_eq!(Status::default(), Status::Pending);
    }

    #[test]
    fn test_status_serializes_screaming_snake() {
        assert_eq!(serde_json::to_string(&Status::InProgress).unwrap(), "\"IN_PROGRESS\"");
        let parsed: Status = serde_json::from_str("\"COMPLETED\"").unwrap();
        assert_eq!(parsed, Status::Completed);
    }

    #[test]
    fn test_invalid_status_display() {
        let err = InvalidStatus("foo".to_string());
        assert!(err.to_string().contains("foo"));
        assert!(err.to_string().contains("IN_PROGRESS"));
    }

    #[test]
    fn test_invalid_status_becomes_validation_error() {
        let err: Error = InvalidStatus("foo".to_string()).into();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[test]
    fn test_normalize_title() {
        assert_eq!(normalize_title("Test task one"), "TEST TASK ONE");
        assert_eq!(normalize_title("  padded "), "PADDED");
        assert_eq!(normalize_title("ünïcode"), "ÜNÏCODE");
    }

    #[test]
    fn test_new_task_validation() {
        assert!(NewTask::new("Title", "Description").validate().is_ok());
        assert!(NewTask::new("", "Description").validate().is_err());
        assert!(NewTask::new("Title", "   ").validate().is_err());
    }

    #[test]
    fn test_history_serialization() {
        let entry = TaskHistory {
            id: 1,
            task_id: 7,
            previous_status: Status::Pending,
            new_status: Status::InProgress,
            changed_at: "2024-01-01T00:00:00Z".to_string(),
        };

        let json = serde_json::to_string(&entry).unwrap();
        assert!(json.contains("\"previous_status\":\"PENDING\""));
        let parsed: TaskHistory = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, entry);
    }
}
