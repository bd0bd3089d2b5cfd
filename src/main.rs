//! CLI binary for `tasktrack`.
//!
//! This binary is a thin wrapper that parses arguments and delegates to the library.

use std::env;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tasktrack::cli::{load_config, run, Cli};

fn main() -> ExitCode {
    let cli = Cli::parse();
    let base_dir = env::current_dir().unwrap_or_else(|_| PathBuf::from("."));

    let config = match load_config(&cli, &base_dir) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error loading config: {e}");
            return ExitCode::from(2);
        }
    };
    tasktrack::init_tracing(config.log_filter.as_deref());

    let output = run(cli, &config);

    for msg in output.stdout {
        println!("{msg}");
    }
    for msg in output.stderr {
        eprintln!("{msg}");
    }

    output.exit_code
}
