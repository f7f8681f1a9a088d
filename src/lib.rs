//! PlayDirector Scene Client Library
//!
//! Sends a scene prompt to a director service over WebSocket and folds the
//! streamed director, status and scene events into a renderable scene.

pub mod cli;
pub mod config;
pub mod director;
pub mod logging;
pub mod session;
pub mod ui;

use std::path::PathBuf;

use anyhow::{Context, Result};
use tracing_appender::non_blocking::WorkerGuard;

pub use logging::recent_logs;

/// Application result type for consistent error handling
pub type AppResult<T> = Result<T, Box<dyn std::error::Error + Send + Sync>>;

/// Where formatted log output goes
#[derive(Debug, Clone, PartialEq)]
pub enum LogSink {
    /// Line modes keep stdout for scene output
    Stderr,
    /// The full-screen TUI owns the terminal
    File(PathBuf),
}

/// Initialize tracing subscriber for logging.
///
/// The returned guard flushes the file writer and must live until exit.
pub fn init_logging(level: &str, sink: LogSink) -> Result<Option<WorkerGuard>> {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("playdirector={}", level).into());

    let (stderr_layer, file_layer, guard) = match sink {
        LogSink::Stderr => (
            Some(tracing_subscriber::fmt::layer().with_writer(std::io::stderr)),
            None,
            None,
        ),
        LogSink::File(path) => {
            let directory = path
                .parent()
                .filter(|dir| !dir.as_os_str().is_empty())
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("."));
            std::fs::create_dir_all(&directory).with_context(|| {
                format!("Failed to create log directory: {}", directory.display())
            })?;
            let file_name = path
                .file_name()
                .map(|name| name.to_owned())
                .unwrap_or_else(|| "playdirector.log".into());

            let appender = tracing_appender::rolling::never(directory, file_name);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (
                None,
                Some(
                    tracing_subscriber::fmt::layer()
                        .with_writer(writer)
                        .with_ansi(false),
                ),
                Some(guard),
            )
        }
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(stderr_layer)
        .with(file_layer)
        .with(logging::RecentLogLayer)
        .try_init()
        .context("Failed to install tracing subscriber")?;

    Ok(guard)
}
