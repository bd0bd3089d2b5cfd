//! Error types for `tasktrack`.

use crate::tasks::models::{TaskId, UserId};

/// Errors that can occur while tracking tasks.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A JSON parsing error occurred.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A YAML parsing error occurred.
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// A `SQLite` database error occurred.
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// A template error occurred.
    #[error("Template error: {0}")]
    Template(String),

    /// A required field was missing or invalid. Nothing was written.
    #[error("Validation error: {0}")]
    Validation(String),

    /// The caller is not authenticated.
    #[error("Authentication required for {next}")]
    Unauthenticated {
        /// The path the caller originally requested.
        next: String,
    },

    /// The caller does not own the resource.
    #[error("User {caller} may not access {resource}")]
    Forbidden {
        /// The authenticated caller.
        caller: UserId,
        /// Description of the resource, e.g. `task 4`.
        resource: String,
    },

    /// A referenced task does not exist.
    #[error("Task not found: {0}")]
    TaskNotFound(TaskId),

    /// A referenced user does not exist.
    #[error("User not found: {0}")]
    UserNotFound(String),

    /// A priority write kept colliding with concurrent writers.
    #[error("Write conflict persisted after {attempts} attempts")]
    Conflict {
        /// Number of attempts made before giving up.
        attempts: u32,
    },
}

impl Error {
    /// Build a validation error from any displayable message.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Whether retrying the same operation may succeed.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::Conflict { .. })
    }
}

/// A specialized Result type for this crate.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_display() {
        let err = Error::validation("title is required");
        assert_eq!(err.to_string(), "Validation error: title is required");
    }

    #[test]
    fn test_unauthenticated_display() {
        let err = Error::Unauthenticated { next: "/tasks/".to_string() };
        assert!(err.to_string().contains("/tasks/"));
    }

    #[test]
    fn test_only_conflict_is_transient() {
        assert!(Error::Conflict { attempts: 5 }.is_transient());
        assert!(!Error::TaskNotFound(1).is_transient());
        assert!(!Error::validation("x").is_transient());
    }

    #[test]
    fn test_database_error_converts() {
        let err: Error = rusqlite::Error::QueryReturnedNoRows.into();
        assert!(matches!(err, Error::Database(_)));
    }
}
