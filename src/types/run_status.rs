//! Terminal status of one pipeline pass.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::ApprovalRequest;

/// How a pass over the pipeline ended (stage failures are errors, not statuses).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RunStatus {
  /// Every stage ran.
  Completed,
  /// Halted at the approval gate; resume the session once the actor answers.
  AwaitingApproval { request: ApprovalRequest },
}

impl RunStatus {
  pub fn is_completed(&self) -> bool {
    matches!(self, RunStatus::Completed)
  }
}

impl fmt::Display for RunStatus {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      RunStatus::Completed => write!(f, "completed"),
      RunStatus::AwaitingApproval { .. } => write!(f, "awaiting_approval"),
    }
  }
}
