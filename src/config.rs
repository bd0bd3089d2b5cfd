//! Configuration management for tasktrack.
//!
//! Settings come from `tasktrack.yaml` in the working directory, falling
//! back to `~/.tasktrack/config.yaml`, falling back to defaults. Every field
//! is optional in the file.

use crate::error::{Error, Result};
use crate::paths;
use crate::tasks::{SqliteTaskStore, StoreOptions};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Project config file name, looked up in the working directory.
pub const CONFIG_FILE_NAME: &str = "tasktrack.yaml";

/// Application configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct AppConfig {
    /// SQLite database file. Defaults to `~/.tasktrack/tasktrack.sqlite3`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub database_path: Option<PathBuf>,

    /// Where unauthenticated requests are redirected.
    pub login_url: String,

    /// Directory with `.tera` files overriding the embedded templates.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub templates_dir: Option<PathBuf>,

    /// `tracing` filter used when `RUST_LOG` is unset, e.g. `tasktrack=info`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_filter: Option<String>,

    /// Write-path tuning.
    pub store: StoreConfig,

    /// Digest scheduling.
    pub digest: DigestConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database_path: None,
            login_url: "/user/login".to_string(),
            templates_dir: None,
            log_filter: None,
            store: StoreConfig::default(),
            digest: DigestConfig::default(),
        }
    }
}

/// Write-path tuning for the task store.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct StoreConfig {
    /// Attempts for a write transaction that keeps conflicting.
    pub max_write_attempts: u32,
    /// Milliseconds a connection waits for the write lock.
    pub busy_timeout_ms: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        let options = StoreOptions::default();
        Self {
            max_write_attempts: options.max_write_attempts,
            busy_timeout_ms: u64::try_from(options.busy_timeout.as_millis()).unwrap_or(u64::MAX),
        }
    }
}

/// Digest scheduling settings.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct DigestConfig {
    /// Hour given to users who never chose one. When unset, such users get
    /// the hour of the check that finds them and receive a digest right away.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_hour: Option<u8>,
}

impl AppConfig {
    /// Load config from a specific file, returning None if it does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be parsed or is invalid.
    pub fn load_file(path: &Path) -> Result<Option<Self>> {
        if !path.exists() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_yaml::from_str(&content)?;
        config.validate()?;
        tracing::debug!(path = %path.display(), "loaded config");
        Ok(Some(config))
    }

    /// Load config for a working directory.
    ///
    /// Checks `<base_dir>/tasktrack.yaml`, then `~/.tasktrack/config.yaml`,
    /// and returns defaults when neither exists.
    ///
    /// # Errors
    ///
    /// Returns an error if a config file exists but cannot be parsed.
    pub fn load(base_dir: &Path) -> Result<Self> {
        if let Some(config) = Self::load_file(&base_dir.join(CONFIG_FILE_NAME))? {
            return Ok(config);
        }
        if let Some(path) = paths::user_config_path() {
            if let Some(config) = Self::load_file(&path)? {
                return Ok(config);
            }
        }
        Ok(Self::default())
    }

    /// Check value ranges serde cannot express.
    ///
    /// # Errors
    ///
    /// Returns a validation error naming the offending field.
    pub fn validate(&self) -> Result<()> {
        if let Some(hour) = self.digest.default_hour.filter(|&h| h > 23) {
            return Err(Error::validation(format!("digest.default_hour must be 0-23, got {hour}")));
        }
        if self.store.max_write_attempts == 0 {
            return Err(Error::validation("store.max_write_attempts must be at least 1"));
        }
        if self.login_url.trim().is_empty() {
            return Err(Error::validation("login_url must not be empty"));
        }
        Ok(())
    }

    /// Resolve the database path.
    ///
    /// # Errors
    ///
    /// Returns an error if no path is configured and the home directory is unknown.
    pub fn database_path(&self) -> Result<PathBuf> {
        self.database_path.clone().or_else(paths::default_db_path).ok_or_else(|| {
            Error::validation("database_path is not set and the home directory is unknown")
        })
    }

    /// Write-path options for the store.
    #[must_use]
    pub const fn store_options(&self) -> StoreOptions {
        StoreOptions {
            max_write_attempts: self.store.max_write_attempts,
            busy_timeout: Duration::from_millis(self.store.busy_timeout_ms),
        }
    }

    /// Open the configured store.
    ///
    /// # Errors
    ///
    /// Returns an error if the path cannot be resolved or the schema cannot be created.
    pub fn open_store(&self) -> Result<SqliteTaskStore> {
        SqliteTaskStore::with_options(self.database_path()?, self.store_options())
    }
}
