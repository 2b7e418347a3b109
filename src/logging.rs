//! Logging setup for the dashboard server.
//!
//! Logs go to stderr by default. With `--log-file` they are appended to the
//! given file instead, without ANSI colors.

use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing_subscriber::EnvFilter;

use crate::error::{InsightsError, Result};

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Initializes logging to stderr.
pub fn init_stderr_logging() {
    tracing_subscriber::fmt().with_env_filter(env_filter()).init();
}

/// Initializes logging to a file, creating parent directories as needed.
pub fn init_file_logging(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| {
            InsightsError::config(format!("Could not create log directory {}: {e}", parent.display()))
        })?;
    }

    let log_file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|e| InsightsError::config(format!("Could not open log file {}: {e}", path.display())))?;

    tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .with_writer(Mutex::new(log_file))
        .with_ansi(false)
        .init();
    Ok(())
}

/// Default location for `--log-file` without a value.
///
/// Uses the XDG state directory on Linux, falling back to the config directory
/// and then the temp directory.
pub fn default_log_path() -> PathBuf {
    if let Some(state_dir) = dirs::state_dir() {
        return state_dir.join("retail-insights").join("server.log");
    }
    if let Some(config_dir) = dirs::config_dir() {
        return config_dir.join("retail-insights").join("server.log");
    }
    std::env::temp_dir().join("retail-insights.log")
}
