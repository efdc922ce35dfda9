//! Load and write execution.log.json for a session.

use crate::types::ExecutionLog;
use std::path::{Path, PathBuf};

/// Default filename for execution log under a session directory.
pub const EXECUTION_LOG_FILENAME: &str = "execution.log.json";

/// `<run_dir>/<session_id>/execution.log.json`.
pub fn execution_log_path(run_dir: &Path, session_id: &str) -> PathBuf {
  crate::checkpoint_io::session_dir(run_dir, session_id).join(EXECUTION_LOG_FILENAME)
}

/// Loads an execution log from `path`. Returns error if file is missing or invalid JSON.
pub fn load_execution_log(path: &Path) -> Result<ExecutionLog, std::io::Error> {
  let bytes = std::fs::read(path)?;
  serde_json::from_slice(&bytes)
    .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))
}

/// Writes the log to `path`, replacing any previous file. Creates parent directory if needed.
pub fn write_execution_log(path: &Path, log: &ExecutionLog) -> Result<(), std::io::Error> {
  let json = serde_json::to_string_pretty(log)
    .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
  if let Some(parent) = path.parent() {
    std::fs::create_dir_all(parent)?;
  }
  std::fs::write(path, json)
}

/// Loads the session's existing log to append to, or starts a new one.
/// An unreadable log is replaced rather than failing the run.
pub fn load_or_start(path: &Path, session_id: &str, started_at: &str) -> ExecutionLog {
  match load_execution_log(path) {
    Ok(log) if log.session_id == session_id => log,
    Ok(_) | Err(_) => ExecutionLog::new(session_id, started_at),
  }
}
