//! Path utilities for determining data storage locations.
//!
//! Data lives in `~/.tasktrack/` unless the configuration names another
//! database file.

use std::path::PathBuf;

/// The base directory name for tasktrack data.
const DATA_DIR_NAME: &str = ".tasktrack";

/// The database filename.
pub const DATABASE_FILENAME: &str = "tasktrack.sqlite3";

/// The per-user configuration filename inside the data directory.
pub const USER_CONFIG_FILENAME: &str = "config.yaml";

/// Get the base data directory.
///
/// Returns `~/.tasktrack/` or `None` if the home directory cannot be
/// determined.
#[must_use]
pub fn data_dir() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(DATA_DIR_NAME))
}

/// Get the default database path, `~/.tasktrack/tasktrack.sqlite3`.
#[must_use]
pub fn default_db_path() -> Option<PathBuf> {
    data_dir().map(|dir| dir.join(DATABASE_FILENAME))
}

/// Get the per-user configuration path, `~/.tasktrack/config.yaml`.
#[must_use]
pub fn user_config_path() -> Option<PathBuf> {
    data_dir().map(|dir| dir.join(USER_CONFIG_FILENAME))
}
