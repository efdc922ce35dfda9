//! Checkpoint for resumable execution.

use serde::{Deserialize, Serialize};

use super::StateStore;

/// Everything needed to re-enter a session: the store (which carries the
/// approval record) and the index of the next stage to run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Checkpoint {
  pub session_id: String,
  pub store: StateStore,
  pub next_stage: usize,
  pub completed_stages: Vec<String>,
  /// Set once the last stage ran.
  #[serde(default)]
  pub finished: bool,
}
