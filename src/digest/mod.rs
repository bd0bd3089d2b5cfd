//! Daily task digests.
//!
//! Every user has an [`EmailPreferences`] record naming the hour of day
//! their digest goes out and the day of month it last went out. A scheduler
//! calls [`check_and_record_digest`] at least once an hour; each due user is
//! claimed for the day before the digest is handed to a [`Notifier`], so a
//! digest is delivered at most once per user and day even when runs overlap.
//!
//! # Example
//!
//! ```no_run
//! use chrono::Local;
//! use tasktrack::digest::{check_and_record_digest, LogNotifier};
//! use tasktrack::tasks::SqliteTaskStore;
//!
//! let store = SqliteTaskStore::new("/tmp/tasktrack.sqlite3")?;
//! let run = check_and_record_digest(&store, &LogNotifier, Local::now().naive_local(), None)?;
//! println!("sent {} digests", run.sent.len());
//! # Ok::<(), tasktrack::Error>(())
//! ```

pub mod notifier;
pub mod store;

pub use notifier::{LogNotifier, Notifier};
pub use store::DigestStore;

use crate::error::{Error, Result};
use crate::tasks::models::{Status, Task, User, UserId};
use crate::tasks::{TaskFilter, TaskStore};
use crate::templates;
use chrono::{Datelike, NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize};
use tera::Context;

/// Latest selectable hour.
pub const MAX_HOUR: u8 = 23;

/// When a user's digest goes out, and when it last did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmailPreferences {
    /// The user these preferences belong to.
    pub user_id: UserId,
    /// Hour of day, `0..=23`.
    pub selected_email_hour: u8,
    /// Day of month of the last digest, `1..=31`, or `None` if never sent.
    pub previous_report_day: Option<u8>,
}

/// Clamp a requested hour into `0..=23`.
#[must_use]
pub fn clamp_hour(requested: i64) -> u8 {
    // In range after the clamp, so the conversion cannot fail.
    u8::try_from(requested.clamp(0, i64::from(MAX_HOUR))).unwrap_or(MAX_HOUR)
}

/// Set a user's digest hour, clamping out-of-range requests.
///
/// # Errors
///
/// Returns an error if the user does not exist or the write fails.
pub fn update_email_preference<S: DigestStore + ?Sized>(
    store: &S,
    user: UserId,
    requested_hour: i64,
) -> Result<EmailPreferences> {
    let hour = clamp_hour(requested_hour);
    if i64::from(hour) != requested_hour {
        tracing::debug!(user_id = user, requested_hour, hour, "clamped email hour");
    }
    store.set_email_hour(user, hour)
}

/// A rendered digest for one user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Digest {
    /// Recipient.
    pub user: User,
    /// The day the digest covers.
    pub date: chrono::NaiveDate,
    /// Rendered subject line.
    pub subject: String,
    /// Rendered body.
    pub body: String,
    /// The user's tasks, by priority.
    pub tasks: Vec<Task>,
}

#[derive(Serialize)]
struct DigestGroup<'a> {
    label: &'static str,
    tasks: Vec<&'a Task>,
}

const fn status_label(status: Status) -> &'static str {
    match status {
        Status::Pending => "Pending",
        Status::InProgress => "In progress",
        Status::Completed => "Completed",
    }
}

/// Build the digest for `user` as of `now`.
///
/// # Errors
///
/// Returns an error if the tasks cannot be read or a template fails to render.
pub fn build_digest<S: TaskStore + ?Sized>(store: &S, user: &User, now: NaiveDateTime) -> Result<Digest> {
    let tasks = store.list_tasks(user.id, TaskFilter::by_priority())?;

    let groups: Vec<DigestGroup<'_>> = Status::ALL
        .iter()
        .map(|&status| DigestGroup {
            label: status_label(status),
            tasks: tasks.iter().filter(|t| t.status == status).collect(),
        })
        .collect();
    let completed_count = tasks.iter().filter(|t| t.status == Status::Completed).count();

    let date = now.date();
    let mut context = Context::new();
    context.insert("username", &user.username);
    context.insert("first_name", &user.first_name);
    context.insert("date", &date.format("%Y-%m-%d").to_string());
    context.insert("hour", &now.hour());
    context.insert("open_count", &(tasks.len() - completed_count));
    context.insert("completed_count", &completed_count);
    context.insert("groups", &groups);

    let subject = templates::render("digest/subject.tera", &context)?.trim().to_string();
    let body = templates::render("digest/email.tera", &context)?;

    Ok(Digest { user: user.clone(), date, subject, body, tasks })
}

/// Outcome of one [`check_and_record_digest`] run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DigestRun {
    /// Users that received a default preference record during this run.
    pub preferences_created: usize,
    /// Users whose digest was handed to the notifier.
    pub sent: Vec<UserId>,
    /// Users whose day was claimed but whose digest could not be delivered.
    pub failed: Vec<(UserId, String)>,
}

impl DigestRun {
    /// Number of users claimed during this run.
    #[must_use]
    pub fn claimed(&self) -> usize {
        self.sent.len() + self.failed.len()
    }
}

/// Send digests to every user due at `now`.
///
/// A user is due when their hour equals `now`'s hour and their last digest
/// day differs from `now`'s day of month. Users without preferences first
/// get a record with `default_hour`, or with `now`'s hour when it is `None`,
/// which makes them due on this very run. The day is claimed before
/// delivery, so a failed delivery is not retried on a later run that day.
///
/// # Errors
///
/// Returns an error if the preference table cannot be read or written.
/// Per-user rendering and delivery failures are collected in the returned
/// [`DigestRun`] instead.
pub fn check_and_record_digest<S, N>(
    store: &S,
    notifier: &N,
    now: NaiveDateTime,
    default_hour: Option<u8>,
) -> Result<DigestRun>
where
    S: TaskStore + DigestStore + ?Sized,
    N: Notifier + ?Sized,
{
    let hour = clamp_hour(i64::from(now.hour()));
    let day = u8::try_from(now.day()).unwrap_or(1);

    let seed_hour = default_hour.map_or(hour, |h| clamp_hour(i64::from(h)));
    let mut run = DigestRun {
        preferences_created: store.ensure_email_preferences(seed_hour)?,
        ..DigestRun::default()
    };
    if run.preferences_created > 0 {
        tracing::info!(count = run.preferences_created, hour = seed_hour, "created default email preferences");
    }

    let due = store.due_for_digest(hour, day)?;
    tracing::debug!(hour, day, due = due.len(), "checking digests");

    for prefs in due {
        if !store.claim_digest_day(prefs.user_id, day)? {
            tracing::debug!(user_id = prefs.user_id, day, "digest already claimed");
            continue;
        }

        let outcome = store
            .get_user(prefs.user_id)
            .and_then(|user| user.ok_or_else(|| Error::UserNotFound(prefs.user_id.to_string())))
            .and_then(|user| build_digest(store, &user, now))
            .and_then(|digest| notifier.send(&digest));

        match outcome {
            Ok(()) => {
                tracing::info!(user_id = prefs.user_id, day, "digest sent");
                run.sent.push(prefs.user_id);
            }
            Err(e) => {
                tracing::warn!(user_id = prefs.user_id, day, error = %e, "digest delivery failed");
                run.failed.push((prefs.user_id, e.to_string()));
            }
        }
    }

    Ok(run)
}
