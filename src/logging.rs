//! Logging configuration for nlq-console.
//!
//! The driver logs to stderr by default; `--log-file` switches to a file in the
//! platform state directory so rendered result tables on stdout stay clean.

use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

const LOG_DIR: &str = "nlq-console";
const LOG_FILE: &str = "nlq.log";

/// Where log records go.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogTarget {
    Stderr,
    File(PathBuf),
}

impl LogTarget {
    /// Picks the target for the `--log-file` flag.
    pub fn from_flag(log_file: bool) -> Self {
        if log_file {
            Self::File(get_log_path())
        } else {
            Self::Stderr
        }
    }
}

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Installs the global subscriber and returns the target actually used.
///
/// A log file that cannot be created falls back to stderr with a warning.
pub fn init(target: LogTarget) -> LogTarget {
    match target {
        LogTarget::Stderr => {
            init_stderr();
            LogTarget::Stderr
        }
        LogTarget::File(path) => match open_log_file(&path) {
            Ok(file) => {
                tracing_subscriber::fmt()
                    .with_env_filter(env_filter())
                    .with_writer(file)
                    .with_ansi(false)
                    .init();
                LogTarget::File(path)
            }
            Err(e) => {
                eprintln!("Warning: cannot log to {}: {e}", path.display());
                init_stderr();
                LogTarget::Stderr
            }
        },
    }
}

fn init_stderr() {
    tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .with_writer(io::stderr)
        .init();
}

/// Creates the log file and its directory. An existing log is replaced.
fn open_log_file(path: &Path) -> io::Result<File> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    File::create(path)
}

/// Returns the path for the log file.
///
/// `~/.local/state/nlq-console/nlq.log` on Linux, the config directory where
/// no state directory exists, the temp directory as a last resort.
pub fn get_log_path() -> PathBuf {
    dirs::state_dir()
        .or_else(dirs::config_dir)
        .map(|dir| dir.join(LOG_DIR).join(LOG_FILE))
        .unwrap_or_else(|| std::env::temp_dir().join(LOG_FILE))
}
