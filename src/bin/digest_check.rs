//! Hourly digest check.
//!
//! Meant to be run by cron or a systemd timer at least once an hour. Sends
//! every digest due now and prints a one-line summary; repeated runs within
//! the same hour send nothing new.
//!
//! Exits 0 when every claimed digest was delivered, 1 when some deliveries
//! failed, 75 (`EX_TEMPFAIL`) when the database stayed locked, and 2 on any
//! other configuration or database error.

use std::env;
use std::path::PathBuf;
use std::process::ExitCode;

use chrono::Local;
use tasktrack::config::AppConfig;
use tasktrack::digest::{check_and_record_digest, LogNotifier};
use tasktrack::templates;

const EX_TEMPFAIL: u8 = 75;

fn main() -> ExitCode {
    let base_dir = env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    let config = match AppConfig::load(&base_dir) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error loading config: {e}");
            return ExitCode::from(2);
        }
    };
    tasktrack::init_tracing(config.log_filter.as_deref().or(Some("tasktrack=info")));

    match check(&config) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(1),
        Err(e) if e.is_transient() => {
            eprintln!("Error: {e} (try again later)");
            ExitCode::from(EX_TEMPFAIL)
        }
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::from(2)
        }
    }
}

fn check(config: &AppConfig) -> tasktrack::Result<bool> {
    templates::init_templates(config.templates_dir.as_deref())?;
    let store = config.open_store()?;
    let now = Local::now().naive_local();

    let run = check_and_record_digest(&store, &LogNotifier, now, config.digest.default_hour)?;
    println!(
        "{}: {} sent, {} failed, {} default preferences created",
        now.format("%Y-%m-%d %H:%M"),
        run.sent.len(),
        run.failed.len(),
        run.preferences_created
    );
    for (user_id, error) in &run.failed {
        eprintln!("  user {user_id}: {error}");
    }

    Ok(run.failed.is_empty())
}
