//! Session checkpoints as JSON under `<run_dir>/<session_id>/`.

use std::io::{Error, ErrorKind};
use std::path::{Path, PathBuf};

use tracing::{debug, instrument};

use crate::types::Checkpoint;

pub const CHECKPOINT_FILENAME: &str = "checkpoint.json";

/// `<run_dir>/<session_id>`: everything persisted for one session lives here.
pub fn session_dir(run_dir: &Path, session_id: &str) -> PathBuf {
  run_dir.join(session_id)
}

/// `<run_dir>/<session_id>/checkpoint.json`.
pub fn checkpoint_path(run_dir: &Path, session_id: &str) -> PathBuf {
  session_dir(run_dir, session_id).join(CHECKPOINT_FILENAME)
}

/// Writes `cp` as pretty JSON, creating the session directory if needed.
#[instrument(level = "trace", skip(path, cp), fields(session = %cp.session_id))]
pub fn save_checkpoint(path: &Path, cp: &Checkpoint) -> Result<(), Error> {
  let json = serde_json::to_string_pretty(cp).map_err(|e| Error::new(ErrorKind::InvalidData, e))?;
  if let Some(parent) = path.parent() {
    std::fs::create_dir_all(parent)?;
  }
  std::fs::write(path, json)?;
  debug!(path = %path.display(), next_stage = cp.next_stage, finished = cp.finished, "checkpoint saved");
  Ok(())
}

/// Reads a checkpoint. Missing files keep their `NotFound` kind; bad JSON is `InvalidData`.
#[instrument(level = "trace", skip(path))]
pub fn load_checkpoint(path: &Path) -> Result<Checkpoint, Error> {
  let bytes = std::fs::read(path)?;
  serde_json::from_slice(&bytes).map_err(|e| Error::new(ErrorKind::InvalidData, e))
}

/// Loads the checkpoint of `session_id` and checks it belongs to that session.
pub fn load_session_checkpoint(run_dir: &Path, session_id: &str) -> Result<Checkpoint, Error> {
  let cp = load_checkpoint(&checkpoint_path(run_dir, session_id))?;
  if cp.session_id != session_id {
    return Err(Error::new(
      ErrorKind::InvalidData,
      format!(
        "checkpoint in {} belongs to session {}",
        session_id, cp.session_id
      ),
    ));
  }
  Ok(cp)
}
