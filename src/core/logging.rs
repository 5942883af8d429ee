//! Logging setup.
//!
//! Two sinks:
//! - a JSON file log rolled daily, for later inspection of what the store did
//! - compact human-readable output on stderr, so stdout stays free for command output
//!
//! `log` macros (used by configuration loading) are forwarded into `tracing`.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

/// Base name of the rolling log file.
pub const LOG_FILE_NAME: &str = "vocabmaster.log";

/// Filter used when `RUST_LOG` is not set.
pub const DEFAULT_FILTER: &str = "info";

/// Default log directory: `<data dir>/vocabmaster/logs`.
pub fn default_log_dir() -> PathBuf {
    dirs::data_dir()
        .map(|d| d.join("vocabmaster").join("logs"))
        .unwrap_or_else(|| PathBuf::from("logs"))
}

/// Install the global subscriber.
///
/// Returns a `WorkerGuard` which must be kept alive for the duration of the
/// process so buffered log lines are flushed on exit.
pub fn init(log_dir: &Path) -> WorkerGuard {
    if !log_dir.exists() {
        if let Err(e) = fs::create_dir_all(log_dir) {
            eprintln!("Failed to create logs directory: {}", e);
        }
    }

    let file_appender = tracing_appender::rolling::daily(log_dir, LOG_FILE_NAME);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let env_filter = build_filter(std::env::var("RUST_LOG").ok().as_deref());

    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(non_blocking)
        .json()
        .with_file(true)
        .with_line_number(true)
        .with_target(true)
        .with_filter(env_filter.clone());

    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_writer(io::stderr)
        .compact()
        .with_target(false)
        .with_filter(env_filter);

    if let Err(e) = tracing_subscriber::registry()
        .with(file_layer)
        .with(stderr_layer)
        .try_init()
    {
        eprintln!("Failed to install tracing subscriber: {}", e);
    }

    // Already installed when `try_init` set up the `log` bridge itself.
    let _ = tracing_log::LogTracer::init();

    log::info!(
        "Logging initialized. Writing to: {:?} (daily rolling)",
        log_dir.join(LOG_FILE_NAME)
    );

    guard
}

/// Parse a filter directive, falling back to [`DEFAULT_FILTER`] when it is
/// missing or invalid.
fn build_filter(directive: Option<&str>) -> EnvFilter {
    directive
        .and_then(|d| EnvFilter::try_new(d).ok())
        .unwrap_or_else(|| EnvFilter::new(DEFAULT_FILTER))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_log_dir_is_app_scoped() {
        let dir = default_log_dir();
        assert!(dir.ends_with("logs"));
    }

    #[test]
    fn test_filter_falls_back_to_default() {
        assert_eq!(build_filter(None).to_string(), DEFAULT_FILTER);
        assert_eq!(build_filter(Some("debug")).to_string(), "debug");
    }
}
