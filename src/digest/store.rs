//! Email preference storage.

use crate::digest::EmailPreferences;
use crate::error::{Error, Result};
use crate::tasks::models::UserId;
use crate::tasks::store::SqliteTaskStore;
use rusqlite::{params, Connection, OptionalExtension};

/// Trait for digest schedule storage.
#[allow(clippy::missing_errors_doc)]
pub trait DigestStore {
    /// Get a user's preferences, if any were stored.
    fn get_email_preferences(&self, user: UserId) -> Result<Option<EmailPreferences>>;

    /// Store the digest hour for a user, creating the record if absent.
    ///
    /// `hour` must already be within `0..=23`.
    fn set_email_hour(&self, user: UserId, hour: u8) -> Result<EmailPreferences>;

    /// Give every user without preferences a record with `default_hour`.
    ///
    /// Returns how many records were created.
    fn ensure_email_preferences(&self, default_hour: u8) -> Result<usize>;

    /// Preferences whose hour is `hour` and whose last digest day is not `day`.
    fn due_for_digest(&self, hour: u8, day: u8) -> Result<Vec<EmailPreferences>>;

    /// Mark `day` as sent for `user` unless it already is.
    ///
    /// Returns `true` only for the caller that changed the row, so overlapping
    /// digest runs dispatch at most once per user and day.
    fn claim_digest_day(&self, user: UserId, day: u8) -> Result<bool>;
}

fn parse_preferences(row: &rusqlite::Row) -> rusqlite::Result<EmailPreferences> {
    Ok(EmailPreferences {
        user_id: row.get(0)?,
        selected_email_hour: row.get(1)?,
        previous_report_day: row.get(2)?,
    })
}

fn fetch_preferences(conn: &Connection, user: UserId) -> Result<Option<EmailPreferences>> {
    let prefs = conn
        .query_row(
            "SELECT user_id, selected_email_hour, previous_report_day
             FROM email_preferences WHERE user_id = ?1",
            params![user],
            parse_preferences,
        )
        .optional()?;
    Ok(prefs)
}

impl DigestStore for SqliteTaskStore {
    fn get_email_preferences(&self, user: UserId) -> Result<Option<EmailPreferences>> {
        let conn = self.open()?;
        fetch_preferences(&conn, user)
    }

    fn set_email_hour(&self, user: UserId, hour: u8) -> Result<EmailPreferences> {
        if hour > 23 {
            return Err(Error::validation(format!("selected_email_hour must be 0-23, got {hour}")));
        }

        let prefs = self.write("set_email_hour", |tx| {
            let user_exists: bool = tx.query_row(
                "SELECT EXISTS(SELECT 1 FROM users WHERE id = ?1)",
                params![user],
                |row| row.get(0),
            )?;
            if !user_exists {
                return Err(Error::UserNotFound(user.to_string()));
            }

            tx.execute(
                "INSERT INTO email_preferences (user_id, selected_email_hour) VALUES (?1, ?2)
                 ON CONFLICT(user_id) DO UPDATE SET selected_email_hour = excluded.selected_email_hour",
                params![user, hour],
            )?;
            fetch_preferences(tx, user)?.ok_or_else(|| Error::UserNotFound(user.to_string()))
        })?;

        tracing::info!(user_id = user, hour, "updated email preference");
        Ok(prefs)
    }

    fn ensure_email_preferences(&self, default_hour: u8) -> Result<usize> {
        self.write("ensure_email_preferences", |tx| {
            let created = tx.execute(
                "INSERT INTO email_preferences (user_id, selected_email_hour)
                 SELECT id, ?1 FROM users
                 WHERE id NOT IN (SELECT user_id FROM email_preferences)",
                params![default_hour],
            )?;
            Ok(created)
        })
    }

    fn due_for_digest(&self, hour: u8, day: u8) -> Result<Vec<EmailPreferences>> {
        let conn = self.open()?;
        let mut stmt = conn.prepare(
            "SELECT user_id, selected_email_hour, previous_report_day
             FROM email_preferences
             WHERE selected_email_hour = ?1
               AND (previous_report_day IS NULL OR previous_report_day != ?2)
             ORDER BY user_id",
        )?;
        let due =
            stmt.query_map(params![hour, day], parse_preferences)?.collect::<rusqlite::Result<_>>()?;
        Ok(due)
    }

    fn claim_digest_day(&self, user: UserId, day: u8) -> Result<bool> {
        self.write("claim_digest_day", |tx| {
            let rows = tx.execute(
                "UPDATE email_preferences SET previous_report_day = ?2
                 WHERE user_id = ?1 AND (previous_report_day IS NULL OR previous_report_day != ?2)",
                params![user, day],
            )?;
            Ok(rows > 0)
        })
    }
}
