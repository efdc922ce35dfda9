//! Post-hoc run evaluation.
//!
//! Runs once after a completed pipeline. A judge reads a compact trace of the
//! run plus the start of the diagram and replies with free text containing a
//! JSON verdict. Every failure here (judge error, no JSON, unparseable JSON)
//! is logged and turned into a placeholder summary; it never touches the run
//! result.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, instrument, warn};

use crate::error::StageError;
use crate::prompts;
use crate::repair::{RepairOutcome, extract_json_block, repair_and_parse};
use crate::stages::run_agent_command;

/// Characters of the diagram handed to the judge.
pub const DIAGRAM_SAMPLE_CHARS: usize = 1000;

/// Produces a raw verdict for a run.
#[async_trait]
pub trait RunJudge: Send + Sync {
  async fn judge(&self, prompt: &str) -> Result<String, StageError>;
}

/// Judge backed by the agent command.
pub struct CommandJudge {
  agent_cmd: String,
  timeout: Duration,
}

impl CommandJudge {
  pub fn new(agent_cmd: impl Into<String>, timeout: Duration) -> Self {
    Self {
      agent_cmd: agent_cmd.into(),
      timeout,
    }
  }
}

#[async_trait]
impl RunJudge for CommandJudge {
  async fn judge(&self, prompt: &str) -> Result<String, StageError> {
    run_agent_command("evaluate_run", &self.agent_cmd, prompt, self.timeout).await
  }
}

/// What the judge is told about the run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionTrace {
  pub session_id: String,
  pub stages_invoked: Vec<String>,
  pub final_output_len: usize,
}

/// Verdict fields read tolerantly from the judge's JSON.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct SystemEvaluation {
  pub overall_score: Option<f64>,
  pub feedback: Option<String>,
  pub recommendations: Vec<String>,
  pub strengths: Vec<String>,
  pub weaknesses: Vec<String>,
  pub planning_quality_score: Option<f64>,
  pub tool_use_score: Option<f64>,
  pub context_handling_score: Option<f64>,
  pub collaboration_score: Option<f64>,
  pub output_quality_score: Option<f64>,
}

/// Summary attached to the run result. `score: None` means unavailable.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct EvaluationSummary {
  pub score: Option<f64>,
  pub feedback: Option<String>,
  pub recommendations: Vec<String>,
}

impl EvaluationSummary {
  pub fn unavailable() -> Self {
    Self::default()
  }

  /// Score for display: two decimals, or `N/A`.
  pub fn score_display(&self) -> String {
    match self.score {
      Some(s) => format!("{:.2}", s),
      None => "N/A".to_string(),
    }
  }
}

impl fmt::Display for EvaluationSummary {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "score {}", self.score_display())?;
    if let Some(feedback) = &self.feedback {
      write!(f, ": {}", feedback)?;
    }
    Ok(())
  }
}

/// Judge prompt: instruction, trace JSON and the diagram sample.
pub fn build_judge_prompt(trace: &ExecutionTrace, diagram: &str) -> String {
  let trace_json = serde_json::to_string_pretty(trace).unwrap_or_default();
  let sample: String = diagram.chars().take(DIAGRAM_SAMPLE_CHARS).collect();
  format!(
    "{}\n\n## execution_trace\n{}\n\n## diagram_sample\n{}",
    prompts::JUDGE_INSTRUCTION,
    trace_json,
    sample
  )
}

/// Reads the verdict out of a raw judge reply.
pub fn summarize_reply(raw: &str) -> Result<EvaluationSummary, String> {
  let block = extract_json_block(raw).ok_or_else(|| "no JSON object in judge reply".to_string())?;
  let value: Value = match repair_and_parse(block) {
    RepairOutcome::Parsed(v) | RepairOutcome::Repaired(v) => v,
    RepairOutcome::Unparseable(e) => return Err(format!("unparseable judge reply: {}", e)),
  };
  let eval: SystemEvaluation =
    serde_json::from_value(value).map_err(|e| format!("unexpected judge reply: {}", e))?;
  Ok(EvaluationSummary {
    score: eval.overall_score,
    feedback: eval.feedback,
    recommendations: eval.recommendations,
  })
}

/// Asks the judge about the run. Never fails; failures yield [EvaluationSummary::unavailable].
#[instrument(level = "trace", skip(judge, trace, diagram))]
pub async fn evaluate_run(
  judge: &dyn RunJudge,
  trace: &ExecutionTrace,
  diagram: &str,
) -> EvaluationSummary {
  let prompt = build_judge_prompt(trace, diagram);
  let raw = match judge.judge(&prompt).await {
    Ok(raw) => raw,
    Err(e) => {
      warn!(session = %trace.session_id, error = %e, "post-hoc evaluation failed");
      return EvaluationSummary::unavailable();
    }
  };
  match summarize_reply(&raw) {
    Ok(summary) => {
      info!(session = %trace.session_id, score = %summary.score_display(), "post-hoc evaluation");
      summary
    }
    Err(e) => {
      warn!(session = %trace.session_id, error = %e, "post-hoc evaluation unreadable");
      EvaluationSummary::unavailable()
    }
  }
}
