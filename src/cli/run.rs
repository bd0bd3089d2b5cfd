//! Command execution for the CLI.
//!
//! This module handles running CLI commands and producing output.

use crate::api::routes::Router;
use crate::api::{CreateTaskRequest, EmailPreferenceRequest, HourValue, TaskService, UpdateTaskRequest};
use crate::cli::{Cli, Command, DigestCommand, EmailPrefCommand, TaskCommand, UserCommand};
use crate::config::AppConfig;
use crate::digest::{self, DigestStore, LogNotifier};
use crate::error::{Error, Result};
use crate::tasks::{NewUser, SqliteTaskStore, Status, TaskFilter, TaskOrder, TaskStore, User};
use crate::templates;
use chrono::{Local, NaiveDateTime};
use serde::Serialize;
use std::path::Path;
use std::process::ExitCode;

/// Output from running the CLI, with separate stdout and stderr messages.
#[derive(Debug)]
pub struct CliOutput {
    /// Exit code for the process.
    pub exit_code: ExitCode,
    /// Messages to print to stdout.
    pub stdout: Vec<String>,
    /// Messages to print to stderr.
    pub stderr: Vec<String>,
}

impl CliOutput {
    fn success(stdout: Vec<String>) -> Self {
        Self { exit_code: ExitCode::SUCCESS, stdout, stderr: vec![] }
    }

    fn json<T: Serialize>(value: &T) -> Result<Self> {
        Ok(Self::success(vec![serde_json::to_string_pretty(value)?]))
    }

    fn failure(message: String) -> Self {
        Self { exit_code: ExitCode::from(1), stdout: vec![], stderr: vec![message] }
    }
}

/// Load the configuration a command line asks for.
///
/// An explicit `--config` must exist; otherwise the usual lookup from
/// `base_dir` applies.
///
/// # Errors
///
/// Returns an error if a config file cannot be read or is invalid.
pub fn load_config(cli: &Cli, base_dir: &Path) -> Result<AppConfig> {
    match cli.config {
        Some(ref path) => AppConfig::load_file(path)?
            .ok_or_else(|| Error::validation(format!("config file not found: {}", path.display()))),
        None => AppConfig::load(base_dir),
    }
}

/// Run a CLI command.
pub fn run(cli: Cli, config: &AppConfig) -> CliOutput {
    if !cli.command.needs_store() {
        return run_version();
    }

    match execute(cli, config) {
        Ok(output) => output,
        Err(e) => CliOutput::failure(format!("Error: {e}")),
    }
}

fn execute(cli: Cli, config: &AppConfig) -> Result<CliOutput> {
    let store = match cli.db {
        Some(ref path) => SqliteTaskStore::with_options(path, config.store_options())?,
        None => config.open_store()?,
    };
    let caller = match cli.as_user {
        Some(ref username) => {
            Some(store.find_user(username)?.ok_or_else(|| Error::UserNotFound(username.clone()))?)
        }
        None => None,
    };

    match cli.command {
        Command::User(cmd) => run_user_cmd(&store, cmd),
        Command::Task(cmd) => run_task_cmd(&TaskService::new(store), &require_caller(caller)?, cmd),
        Command::EmailPref(cmd) => run_email_pref_cmd(&TaskService::new(store), &require_caller(caller)?, cmd),
        Command::Digest(cmd) => run_digest_cmd(&store, config, cmd),
        Command::Request { method, path, body } => {
            let router = Router::new(TaskService::new(store), config.login_url.clone());
            Ok(run_request(&router, &method, &path, caller.as_ref(), &body))
        }
        Command::Version => Ok(run_version()),
    }
}

fn require_caller(caller: Option<User>) -> Result<User> {
    caller.ok_or_else(|| Error::validation("this command needs --as <username>"))
}

fn parse_status(status: &str) -> Result<Status> {
    Ok(Status::from_str(status)?)
}

// === Utility Commands ===

fn run_version() -> CliOutput {
    CliOutput {
        exit_code: ExitCode::SUCCESS,
        stdout: vec![],
        stderr: vec![format!("tasktrack v{}", crate::VERSION)],
    }
}

// === User Commands ===

fn run_user_cmd(store: &SqliteTaskStore, cmd: UserCommand) -> Result<CliOutput> {
    match cmd {
        UserCommand::Add { username, first_name, last_name, email } => {
            let user = store.register_user(NewUser { username, first_name, last_name, email })?;
            CliOutput::json(&user)
        }
        UserCommand::List => CliOutput::json(&store.list_users()?),
    }
}

// === Task Commands ===

fn run_task_cmd(
    service: &TaskService<SqliteTaskStore>,
    caller: &User,
    cmd: TaskCommand,
) -> Result<CliOutput> {
    match cmd {
        TaskCommand::Create { title, description, status, completed } => {
            let request = CreateTaskRequest {
                title,
                description,
                priority: None,
                status: parse_status(&status)?,
                completed,
            };
            CliOutput::json(&service.create_task(caller, request)?)
        }
        TaskCommand::Update { id, title, description, priority, status, completed } => {
            let request = UpdateTaskRequest {
                title,
                description,
                priority,
                status: status.as_deref().map(parse_status).transpose()?,
                completed,
            };
            CliOutput::json(&service.update_task(caller, id, request)?)
        }
        TaskCommand::Delete { id } => {
            service.delete_task(caller, id)?;
            Ok(CliOutput::success(vec![format!("Deleted task {id}")]))
        }
        TaskCommand::List { status } => {
            let filter = TaskFilter {
                status: status.as_deref().map(parse_status).transpose()?,
                order: TaskOrder::Priority,
            };
            let tasks = service.store().list_tasks(caller.id, filter)?;
            if tasks.is_empty() {
                return Ok(CliOutput::success(vec!["No tasks".to_string()]));
            }
            let lines = tasks
                .iter()
                .map(|t| {
                    let done = if t.completed { " [done]" } else { "" };
                    format!("{:>3}. [{}] {} (id {}){done}", t.priority, t.status, t.title, t.id)
                })
                .collect();
            Ok(CliOutput::success(lines))
        }
        TaskCommand::Api => CliOutput::json(&service.api_tasks(caller)?),
        TaskCommand::History { id } => CliOutput::json(&service.task_history(caller, id)?),
    }
}

// === Digest Commands ===

fn run_email_pref_cmd(
    service: &TaskService<SqliteTaskStore>,
    caller: &User,
    cmd: EmailPrefCommand,
) -> Result<CliOutput> {
    match cmd {
        EmailPrefCommand::Set { hour } => {
            let request = EmailPreferenceRequest { selected_email_hour: HourValue::Number(hour) };
            CliOutput::json(&service.update_email_preference(caller, caller.id, &request)?)
        }
        EmailPrefCommand::Show => match service.store().get_email_preferences(caller.id)? {
            Some(prefs) => CliOutput::json(&prefs),
            None => Ok(CliOutput::success(vec!["No email preferences set".to_string()])),
        },
    }
}

#[derive(Serialize)]
struct DigestSummary {
    checked_at: String,
    preferences_created: usize,
    sent: Vec<i64>,
    failed: Vec<FailedDigest>,
}

#[derive(Serialize)]
struct FailedDigest {
    user_id: i64,
    error: String,
}

fn run_digest_cmd(store: &SqliteTaskStore, config: &AppConfig, cmd: DigestCommand) -> Result<CliOutput> {
    let DigestCommand::Check { at } = cmd;
    let now = match at {
        Some(ref value) => NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S")
            .map_err(|e| Error::validation(format!("invalid --at '{value}': {e}")))?,
        None => Local::now().naive_local(),
    };

    templates::init_templates(config.templates_dir.as_deref())?;
    let run = digest::check_and_record_digest(store, &LogNotifier, now, config.digest.default_hour)?;

    let summary = DigestSummary {
        checked_at: now.format("%Y-%m-%dT%H:%M:%S").to_string(),
        preferences_created: run.preferences_created,
        sent: run.sent,
        failed: run
            .failed
            .into_iter()
            .map(|(user_id, error)| FailedDigest { user_id, error })
            .collect(),
    };
    CliOutput::json(&summary)
}

// === Request Command ===

fn run_request(
    router: &Router<SqliteTaskStore>,
    method: &str,
    path: &str,
    caller: Option<&User>,
    body: &str,
) -> CliOutput {
    let response = router.dispatch(method, path, caller, body);

    let mut stderr = vec![format!("HTTP {}", response.status)];
    if let Some(ref location) = response.location {
        stderr.push(format!("Location: {location}"));
    }
    let stdout = if response.body.is_empty() { vec![] } else { vec![response.body.clone()] };
    let exit_code = if response.is_success() || response.location.is_some() {
        ExitCode::SUCCESS
    } else {
        ExitCode::from(1)
    };

    CliOutput { exit_code, stdout, stderr }
}
