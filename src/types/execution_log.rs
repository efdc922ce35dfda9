//! DTOs for execution.log.json: one entry per stage run, for debugging and audit.

use serde::{Deserialize, Serialize};

/// How a stage run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageRunStatus {
  Completed,
  Suspended,
  Failed,
}

/// One recorded stage run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageLogEntry {
  /// 1-based step index across the whole session (including resumed passes).
  pub step: u32,
  pub stage: String,
  /// Store key written by the stage, if any.
  pub output_key: Option<String>,
  pub status: StageRunStatus,
  /// ISO 8601 timestamp when the stage started.
  pub started_at: String,
  /// Failure or halt message, if any.
  pub message: Option<String>,
}

/// Root structure for execution.log.json.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionLog {
  /// Log format version.
  pub version: u32,
  pub session_id: String,
  /// ISO 8601 timestamp when the session started.
  pub started_at: String,
  /// ISO 8601 timestamp when the last stage finished (None while suspended or running).
  pub finished_at: Option<String>,
  /// e.g. "completed", "awaiting_approval", "failed".
  pub final_status: String,
  pub completed_stages: Vec<String>,
  pub steps: Vec<StageLogEntry>,
}

impl ExecutionLog {
  pub fn new(session_id: impl Into<String>, started_at: impl Into<String>) -> Self {
    Self {
      version: 1,
      session_id: session_id.into(),
      started_at: started_at.into(),
      finished_at: None,
      final_status: "running".to_string(),
      completed_stages: vec![],
      steps: vec![],
    }
  }

  /// Next 1-based step index.
  pub fn next_step(&self) -> u32 {
    self.steps.last().map(|s| s.step + 1).unwrap_or(1)
  }
}

#[cfg(test)]
mod tests {
  use super::{ExecutionLog, StageLogEntry, StageRunStatus};

  fn entry(step: u32, stage: &str, status: StageRunStatus) -> StageLogEntry {
    StageLogEntry {
      step,
      stage: stage.to_string(),
      output_key: Some("extracted_text".to_string()),
      status,
      started_at: "2026-02-14T10:00:00Z".to_string(),
      message: None,
    }
  }

  #[test]
  fn stage_log_entry_serializes_to_json() {
    let json = serde_json::to_string(&entry(1, "extract", StageRunStatus::Completed)).unwrap();
    let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed["step"], 1);
    assert_eq!(parsed["stage"], "extract");
    assert_eq!(parsed["output_key"], "extracted_text");
    assert_eq!(parsed["status"], "completed");
  }

  #[test]
  fn execution_log_serializes_to_json() {
    let mut log = ExecutionLog::new("s-1", "2026-02-14T10:00:00Z");
    log.steps.push(entry(1, "extract", StageRunStatus::Completed));
    log.steps.push(entry(2, "approval", StageRunStatus::Suspended));
    log.final_status = "awaiting_approval".to_string();
    log.completed_stages = vec!["extract".to_string()];
    let json = serde_json::to_string(&log).unwrap();
    let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed["version"], 1);
    assert_eq!(parsed["session_id"], "s-1");
    assert_eq!(parsed["finished_at"], serde_json::Value::Null);
    assert_eq!(parsed["final_status"], "awaiting_approval");
    assert_eq!(parsed["steps"].as_array().unwrap().len(), 2);
    assert_eq!(parsed["steps"][1]["status"], "suspended");
  }

  #[test]
  fn next_step_counts_from_one() {
    let mut log = ExecutionLog::new("s", "t");
    assert_eq!(log.next_step(), 1);
    log.steps.push(entry(1, "a", StageRunStatus::Completed));
    assert_eq!(log.next_step(), 2);
  }
}
