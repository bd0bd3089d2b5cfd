//! Tests for the CLI module.

use super::*;
use crate::config::AppConfig;
use clap::Parser;
use std::process::ExitCode;
use tempfile::TempDir;

fn test_config(dir: &TempDir) -> AppConfig {
    AppConfig { database_path: Some(dir.path().join("cli.db")), ..AppConfig::default() }
}

fn run_args(config: &AppConfig, args: &[&str]) -> CliOutput {
    let mut argv = vec!["tasktrack"];
    argv.extend_from_slice(args);
    run(Cli::try_parse_from(argv).unwrap(), config)
}

fn add_user(config: &AppConfig, username: &str) {
    let output = run_args(config, &["user", "add", username]);
    assert_eq!(output.exit_code, ExitCode::SUCCESS, "{:?}", output.stderr);
}

#[test]
fn test_command_needs_store() {
    assert!(!Command::Version.needs_store());
    assert!(Command::User(UserCommand::List).needs_store());
    assert!(Command::Task(TaskCommand::Api).needs_store());
}

#[test]
fn test_version() {
    let output = run(Cli::try_parse_from(["tasktrack", "version"]).unwrap(), &AppConfig::default());
    assert_eq!(output.exit_code, ExitCode::SUCCESS);
    assert!(output.stderr[0].contains(crate::VERSION));
}

#[test]
fn test_parse_global_as_after_subcommand() {
    let cli = Cli::try_parse_from(["tasktrack", "task", "list", "--as", "bruce_wayne"]).unwrap();
    assert_eq!(cli.as_user.as_deref(), Some("bruce_wayne"));
}

#[test]
fn test_parse_negative_hour() {
    let cli = Cli::try_parse_from(["tasktrack", "email-pref", "set", "-12"]).unwrap();
    assert!(matches!(cli.command, Command::EmailPref(EmailPrefCommand::Set { hour: -12 })));
}

#[test]
fn test_task_create_and_list() {
    let dir = TempDir::new().unwrap();
    let config = test_config(&dir);
    add_user(&config, "bruce_wayne");

    for title in ["Patrol", "Train"] {
        let output = run_args(
            &config,
            &["--as", "bruce_wayne", "task", "create", "--title", title, "--description", "x"],
        );
        assert_eq!(output.exit_code, ExitCode::SUCCESS, "{:?}", output.stderr);
    }

    let output = run_args(&config, &["--as", "bruce_wayne", "task", "list"]);
    assert_eq!(output.stdout.len(), 2);
    assert!(output.stdout[0].contains("1. [PENDING] PATROL"));
    assert!(output.stdout[1].contains("2. [PENDING] TRAIN"));
}

#[test]
fn test_task_update_moves_priority() {
    let dir = TempDir::new().unwrap();
    let config = test_config(&dir);
    add_user(&config, "bruce_wayne");
    for title in ["a", "b", "c"] {
        run_args(&config, &["--as", "bruce_wayne", "task", "create", "-t", title, "-d", "x"]);
    }

    let output = run_args(
        &config,
        &["--as", "bruce_wayne", "task", "update", "3", "--priority", "1", "--status", "in-progress"],
    );
    assert_eq!(output.exit_code, ExitCode::SUCCESS, "{:?}", output.stderr);

    let listed = run_args(&config, &["--as", "bruce_wayne", "task", "list"]);
    assert!(listed.stdout[0].contains("[IN_PROGRESS] C"));
    assert!(listed.stdout[1].contains("] A"));
    assert!(listed.stdout[2].contains("] B"));
}

#[test]
fn test_task_command_without_caller_fails() {
    let dir = TempDir::new().unwrap();
    let config = test_config(&dir);

    let output = run_args(&config, &["task", "list"]);
    assert_eq!(output.exit_code, ExitCode::from(1));
    assert!(output.stderr[0].contains("--as"));
}

#[test]
fn test_unknown_caller_fails() {
    let dir = TempDir::new().unwrap();
    let config = test_config(&dir);

    let output = run_args(&config, &["--as", "nobody", "task", "list"]);
    assert_eq!(output.exit_code, ExitCode::from(1));
    assert!(output.stderr[0].contains("nobody"));
}

#[test]
fn test_invalid_status_fails() {
    let dir = TempDir::new().unwrap();
    let config = test_config(&dir);
    add_user(&config, "bruce_wayne");

    let output = run_args(
        &config,
        &["--as", "bruce_wayne", "task", "create", "-t", "a", "-d", "b", "-s", "paused"],
    );
    assert_eq!(output.exit_code, ExitCode::from(1));
    assert!(output.stderr[0].contains("invalid status"));
}

#[test]
fn test_email_pref_set_clamps() {
    let dir = TempDir::new().unwrap();
    let config = test_config(&dir);
    add_user(&config, "bruce_wayne");

    let output = run_args(&config, &["--as", "bruce_wayne", "email-pref", "set", "40"]);
    assert_eq!(output.exit_code, ExitCode::SUCCESS, "{:?}", output.stderr);
    let prefs: serde_json::Value = serde_json::from_str(&output.stdout[0]).unwrap();
    assert_eq!(prefs["selected_email_hour"], 23);
}

#[test]
fn test_anonymous_request_prints_redirect() {
    let dir = TempDir::new().unwrap();
    let config = test_config(&dir);

    let output = run_args(&config, &["request", "GET", "/tasks/"]);
    assert_eq!(output.exit_code, ExitCode::SUCCESS);
    assert_eq!(output.stderr, vec!["HTTP 302", "Location: /user/login?next=/tasks/"]);
    assert!(output.stdout.is_empty());
}

#[test]
fn test_request_success_exits_zero() {
    let dir = TempDir::new().unwrap();
    let config = test_config(&dir);
    add_user(&config, "bruce_wayne");

    let output = run_args(&config, &["--as", "bruce_wayne", "request", "GET", "/api/task/?page=2&x=1"]);
    assert_eq!(output.exit_code, ExitCode::SUCCESS, "{:?}", output.stderr);
    assert_eq!(output.stderr, vec!["HTTP 200"]);
    assert_eq!(output.stdout, vec!["[]"]);
}

#[test]
fn test_request_not_found_fails() {
    let dir = TempDir::new().unwrap();
    let config = test_config(&dir);
    add_user(&config, "bruce_wayne");

    let output = run_args(&config, &["--as", "bruce_wayne", "request", "POST", "/delete-task/9/"]);
    assert_eq!(output.exit_code, ExitCode::from(1));
    assert_eq!(output.stderr[0], "HTTP 404");
}

#[test]
#[serial_test::serial]
fn test_digest_check_is_idempotent() {
    crate::templates::reset_cache().unwrap();
    let dir = TempDir::new().unwrap();
    let config = test_config(&dir);
    add_user(&config, "bruce_wayne");

    let args = ["digest", "check", "--at", "2024-03-05T09:00:00"];
    let first = run_args(&config, &args);
    assert_eq!(first.exit_code, ExitCode::SUCCESS, "{:?}", first.stderr);
    let summary: serde_json::Value = serde_json::from_str(&first.stdout[0]).unwrap();
    assert_eq!(summary["preferences_created"], 1);
    assert_eq!(summary["sent"].as_array().unwrap().len(), 1);

    let second = run_args(&config, &args);
    let summary: serde_json::Value = serde_json::from_str(&second.stdout[0]).unwrap();
    assert!(summary["sent"].as_array().unwrap().is_empty());
}

#[test]
fn test_digest_check_rejects_bad_time() {
    let dir = TempDir::new().unwrap();
    let config = test_config(&dir);

    let output = run_args(&config, &["digest", "check", "--at", "tomorrow"]);
    assert_eq!(output.exit_code, ExitCode::from(1));
    assert!(output.stderr[0].contains("--at"));
}

#[test]
fn test_load_config_explicit_missing_file() {
    let dir = TempDir::new().unwrap();
    let missing = dir.path().join("missing.yaml");
    let cli = Cli::try_parse_from(["tasktrack", "--config", missing.to_str().unwrap(), "version"])
        .unwrap();

    assert!(load_config(&cli, dir.path()).is_err());
}

#[test]
fn test_db_flag_overrides_config() {
    let dir = TempDir::new().unwrap();
    let config = test_config(&dir);
    let other_db = dir.path().join("other.db");

    run_args(&config, &["--db", other_db.to_str().unwrap(), "user", "add", "bruce_wayne"]);
    assert!(other_db.exists());

    let output = run_args(&config, &["user", "list"]);
    assert_eq!(output.stdout, vec!["[]"]);
}
