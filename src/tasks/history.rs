//! Status history recording.
//!
//! History rows are written by the store inside the same transaction as the
//! task update that changed the status, so a transition and its record
//! commit or roll back together. The table is append-only: a trigger aborts
//! any UPDATE, and rows disappear only when their task is deleted.

use crate::error::Result;
use crate::tasks::models::{Status, TaskHistory, TaskId};
use rusqlite::{params, Connection};

/// Append a transition record for `task_id`.
///
/// The store calls this only when `previous` differs from `new`.
///
/// # Errors
///
/// Returns an error if the insert fails.
pub fn record(
    conn: &Connection,
    task_id: TaskId,
    previous: Status,
    new: Status,
) -> Result<TaskHistory> {
    conn.execute(
        "INSERT INTO task_history (task_id, previous_status, new_status) VALUES (?1, ?2, ?3)",
        params![task_id, previous.as_str(), new.as_str()],
    )?;

    let entry = conn.query_row(
        "SELECT id, task_id, previous_status, new_status, changed_at
         FROM task_history WHERE id = ?1",
        params![conn.last_insert_rowid()],
        parse_history,
    )?;

    tracing::debug!(task_id, from = %previous, to = %new, "recorded status change");
    Ok(entry)
}

/// All transitions for `task_id`, oldest first.
///
/// # Errors
///
/// Returns an error if the query fails.
pub fn list_for_task(conn: &Connection, task_id: TaskId) -> Result<Vec<TaskHistory>> {
    let mut stmt = conn.prepare(
        "SELECT id, task_id, previous_status, new_status, changed_at
         FROM task_history WHERE task_id = ?1 ORDER BY id ASC",
    )?;
    let entries = stmt.query_map(params![task_id], parse_history)?.collect::<rusqlite::Result<_>>()?;
    Ok(entries)
}

fn parse_history(row: &rusqlite::Row) -> rusqlite::Result<TaskHistory> {
    let previous: String = row.get(2)?;
    let new: String = row.get(3)?;

    Ok(TaskHistory {
        id: row.get(0)?,
        task_id: row.get(1)?,
        previous_status: Status::from_str(&previous).unwrap_or_default(),
        new_status: Status::from_str(&new).unwrap_or_default(),
        changed_at: row.get(4)?,
    })
}
