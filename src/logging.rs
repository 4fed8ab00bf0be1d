//! Tracing setup.
//!
//! The dashboard owns the terminal, so it logs to a file through a
//! non-blocking appender. Command-line runs log to stderr.

use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, EnvFilter};

static LOG_GUARD: OnceLock<Option<WorkerGuard>> = OnceLock::new();

#[derive(Debug, Clone)]
pub enum LogTarget {
    Stderr,
    File(PathBuf),
}

#[derive(Debug, thiserror::Error)]
pub enum LoggingError {
    #[error("Log file path {0} has no file name")]
    NoFileName(PathBuf),
    #[error("Failed to install global tracing subscriber: {0}")]
    SetGlobal(String),
}

/// `RUST_LOG` when set, otherwise `default_filter`.
fn build_env_filter(default_filter: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter))
}

/// Installs the global subscriber. Later calls are no-ops.
pub fn init(target: &LogTarget, default_filter: &str) -> Result<(), LoggingError> {
    if LOG_GUARD.get().is_some() {
        return Ok(());
    }

    let env_filter = build_env_filter(default_filter);
    let guard = match target {
        LogTarget::Stderr => {
            fmt()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .try_init()
                .map_err(|e| LoggingError::SetGlobal(e.to_string()))?;
            None
        }
        LogTarget::File(path) => {
            let (dir, file_name) = split_log_path(path)?;
            let appender = tracing_appender::rolling::never(dir, file_name);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            fmt()
                .with_env_filter(env_filter)
                .with_ansi(false)
                .with_writer(writer)
                .try_init()
                .map_err(|e| LoggingError::SetGlobal(e.to_string()))?;
            Some(guard)
        }
    };
    let _ = LOG_GUARD.set(guard);
    Ok(())
}

fn split_log_path(path: &Path) -> Result<(&Path, &std::ffi::OsStr), LoggingError> {
    let file_name = path
        .file_name()
        .ok_or_else(|| LoggingError::NoFileName(path.to_path_buf()))?;
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    Ok((dir, file_name))
}
