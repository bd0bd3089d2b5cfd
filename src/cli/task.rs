//! Task CLI subcommands.

use clap::Subcommand;

/// Task management commands.
///
/// Each task belongs to the user given with `--as`. Priorities run from 1
/// (most important) to the number of tasks the user has, with no gaps.
///
/// ## Quick Start
///
/// ```bash
/// tasktrack --as bruce_wayne task create --title "Patrol" --description "Nightly"
/// tasktrack --as bruce_wayne task update 1 --priority 1 --status in-progress
/// tasktrack --as bruce_wayne task list
/// ```
#[derive(Subcommand, Debug, Clone)]
pub enum TaskCommand {
    /// Create a task at the end of your priority list.
    Create {
        /// Title (stored upper-cased)
        #[arg(short, long)]
        title: String,

        /// Description
        #[arg(short, long)]
        description: String,

        /// Initial status: pending, in-progress, completed
        #[arg(short, long, default_value = "pending")]
        status: String,

        /// Mark the task completed
        #[arg(long)]
        completed: bool,
    },

    /// Update a task's fields.
    ///
    /// Only specified fields are updated; others remain unchanged. A
    /// priority outside your range is clamped to the nearest end.
    Update {
        /// Task ID
        id: i64,

        /// New title
        #[arg(short, long)]
        title: Option<String>,

        /// New description
        #[arg(short, long)]
        description: Option<String>,

        /// New priority
        #[arg(short, long, allow_hyphen_values = true)]
        priority: Option<i64>,

        /// New status: pending, in-progress, completed
        #[arg(short, long)]
        status: Option<String>,

        /// New completion flag
        #[arg(long)]
        completed: Option<bool>,
    },

    /// Delete a task. Lower-priority tasks move up to close the gap.
    Delete {
        /// Task ID
        id: i64,
    },

    /// List your tasks, priority 1 first.
    List {
        /// Filter by status: pending, in-progress, completed
        #[arg(short, long)]
        status: Option<String>,
    },

    /// List your tasks in the public API shape.
    Api,

    /// Show the status history of a task.
    History {
        /// Task ID
        id: i64,
    },
}
