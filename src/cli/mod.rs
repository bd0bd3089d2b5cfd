//! Command-line interface for tasktrack.
//!
//! Commands act on behalf of the user named with `--as`, mirroring an
//! authenticated web session. `request` feeds a raw method and path through
//! the same router the web front end uses.

mod run;
mod task;

#[cfg(test)]
mod tests;

pub use run::{load_config, run, CliOutput};
pub use task::TaskCommand;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Task tracking with dense priorities and a daily digest.
///
/// Settings are read from `tasktrack.yaml` in the working directory, or
/// from `~/.tasktrack/config.yaml`.
#[derive(Parser, Debug)]
#[command(name = "tasktrack")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Config file to use instead of the default lookup
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Database file, overriding the configured one
    #[arg(long, global = true)]
    pub db: Option<PathBuf>,

    /// Act as this user
    #[arg(long = "as", global = true, value_name = "USERNAME")]
    pub as_user: Option<String>,

    /// The command to execute
    #[command(subcommand)]
    pub command: Command,
}

/// Top-level commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// User management.
    #[command(subcommand)]
    User(UserCommand),

    /// Task management - create, update, delete, and list tasks.
    ///
    /// New tasks always go to the end of the owner's priority list. Moving
    /// a task to another priority shifts the tasks in between.
    #[command(subcommand)]
    Task(TaskCommand),

    /// Digest preferences.
    #[command(name = "email-pref", subcommand)]
    EmailPref(EmailPrefCommand),

    /// Daily digest operations.
    #[command(subcommand)]
    Digest(DigestCommand),

    /// Route a raw request, printing the status to stderr and the body to stdout.
    ///
    /// Without `--as` the request is anonymous and gets the login redirect.
    Request {
        /// HTTP method, e.g. GET or POST
        method: String,

        /// Request path, e.g. /api/task/
        path: String,

        /// JSON request body
        #[arg(long, default_value = "")]
        body: String,
    },

    /// Show version information.
    Version,
}

/// User management commands.
#[derive(Subcommand, Debug, Clone)]
pub enum UserCommand {
    /// Register a user.
    Add {
        /// Login name
        username: String,

        /// Given name
        #[arg(long, default_value = "")]
        first_name: String,

        /// Family name
        #[arg(long, default_value = "")]
        last_name: String,

        /// Address digests are sent to
        #[arg(long, default_value = "")]
        email: String,
    },

    /// List registered users.
    List,
}

/// Digest preference commands.
#[derive(Subcommand, Debug, Clone)]
pub enum EmailPrefCommand {
    /// Set the hour your digest goes out. Values outside 0-23 are clamped.
    Set {
        /// Hour of day
        #[arg(allow_hyphen_values = true)]
        hour: i64,
    },

    /// Show your digest preferences.
    Show,
}

/// Digest commands.
#[derive(Subcommand, Debug, Clone)]
pub enum DigestCommand {
    /// Send digests due now. Safe to run repeatedly.
    Check {
        /// Run as if it were this local time (`YYYY-MM-DDTHH:MM:SS`)
        #[arg(long)]
        at: Option<String>,
    },
}

impl Command {
    /// Returns true if this command needs the database.
    #[must_use]
    pub const fn needs_store(&self) -> bool {
        !matches!(self, Self::Version)
    }
}
