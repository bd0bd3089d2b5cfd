//! # `tasktrack`
//!
//! Per-user task tracking with dense priorities, status history and a daily
//! email digest.

pub mod api;
#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod digest;
pub mod error;
pub mod paths;
pub mod tasks;
pub mod templates;
pub mod testing;

pub use error::{Error, Result};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Install the global `tracing` subscriber.
///
/// `RUST_LOG` wins over `fallback_filter`; with neither set, logging is off.
/// Output goes to stderr so command output on stdout stays clean.
pub fn init_tracing(fallback_filter: Option<&str>) {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = std::env::var("RUST_LOG")
        .ok()
        .map(|raw| raw.trim().to_string())
        .filter(|raw| !raw.is_empty())
        .or_else(|| fallback_filter.map(str::to_string))
        .and_then(|raw| EnvFilter::try_new(raw).ok())
        .unwrap_or_else(|| EnvFilter::new("off"));

    // A second call (e.g. from tests) keeps the first subscriber.
    let _ = tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_exists() {
        assert!(!VERSION.is_empty());
    }

    #[test]
    fn test_init_tracing_twice_is_harmless() {
        init_tracing(Some("tasktrack=debug"));
        init_tracing(Some("not a [valid filter"));
    }
}
