//! Session runner: start or resume a pipeline, persist its checkpoint and
//! execution log, and run post-hoc evaluation once the pipeline completes.
//!
//! Files per session under `run_dir/<session_id>/`:
//! - `checkpoint.json` ([crate::checkpoint_io])
//! - `execution.log.json` ([crate::execution_log_io]), appended on resume

use std::path::Path;

use chrono::Utc;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::checkpoint_io::{self, checkpoint_path};
use crate::error::PipelineError;
use crate::evaluator::{EvaluationSummary, ExecutionTrace, RunJudge, evaluate_run};
use crate::execution_log_io::{self, execution_log_path};
use crate::keys;
use crate::pipeline::{Pipeline, PipelineRun};
use crate::types::{
  ApprovalRecord, ApprovalResponse, Checkpoint, ExecutionLog, RunStatus, StageLogEntry,
  StageRunStatus, StageValue, StateStore,
};

/// How to enter the session.
#[derive(Debug, Clone)]
pub enum RunMode {
  /// New session; a UUID v4 is generated when `session_id` is None.
  Start {
    session_id: Option<String>,
    initial: Vec<(String, StageValue)>,
  },
  /// Re-enter a checkpointed session, optionally with the actor's answer.
  Resume {
    session_id: String,
    response: Option<ApprovalResponse>,
  },
}

/// Options for [run_workflow].
pub struct RunOptions<'a> {
  /// Root directory for session checkpoints and execution logs.
  pub run_dir: &'a Path,
  pub mode: RunMode,
  /// If set, evaluates completed runs.
  pub judge: Option<&'a dyn RunJudge>,
}

/// Outcome of a run as seen by the caller.
#[derive(Debug, Clone)]
pub struct WorkflowResult {
  pub session_id: String,
  pub status: RunStatus,
  /// Publication message when completed, waiting notice when suspended.
  pub final_message: String,
  pub store: StateStore,
  pub completed_stages: Vec<String>,
  /// None when no judge was configured or the run is suspended.
  pub evaluation: Option<EvaluationSummary>,
}

/// Re-enters a checkpoint. A finished session is reopened at the approval
/// stage only when a new human decision is supplied.
async fn resume_checkpoint(
  pipeline: &Pipeline,
  mut checkpoint: Checkpoint,
  response: Option<ApprovalResponse>,
) -> Result<PipelineRun, PipelineError> {
  if !checkpoint.finished {
    return pipeline.resume(checkpoint, response).await;
  }
  let gate = pipeline.position_of_output(keys::APPROVAL_STATUS);
  let (Some(response), Some(gate)) = (response, gate) else {
    return Err(PipelineError::ResumeCompleted(checkpoint.session_id));
  };
  info!(session = %checkpoint.session_id, confirmed = response.confirmed, "new human decision on finished session");
  checkpoint
    .store
    .record_human_decision(ApprovalRecord::from_response(&response));
  checkpoint.next_stage = gate;
  checkpoint.completed_stages.truncate(gate);
  checkpoint.finished = false;
  pipeline.resume(checkpoint, None).await
}

fn final_message(run: &PipelineRun) -> String {
  match &run.status {
    RunStatus::AwaitingApproval { .. } => format!(
      "Awaiting approval for session {}. Resume with --approve or --reject.",
      run.session_id
    ),
    RunStatus::Completed => run
      .store
      .get_text(keys::PUBLICATION_RESULT)
      .unwrap_or("Pipeline completed.")
      .to_string(),
  }
}

/// Appends this pass's stage runs to the session log, renumbering steps.
fn append_steps(log: &mut ExecutionLog, steps: &[StageLogEntry]) {
  for entry in steps {
    let step = log.next_step();
    log.steps.push(StageLogEntry {
      step,
      ..entry.clone()
    });
  }
}

/// Adds the failed stage to the log. Only stage failures are recorded.
fn record_failure(log: &mut ExecutionLog, err: &PipelineError) {
  if let PipelineError::StageFailed { stage, source } = err {
    let step = log.next_step();
    log.steps.push(StageLogEntry {
      step,
      stage: stage.clone(),
      output_key: None,
      status: StageRunStatus::Failed,
      started_at: Utc::now().to_rfc3339(),
      message: Some(source.to_string()),
    });
  }
  log.final_status = "failed".to_string();
  log.finished_at = Some(Utc::now().to_rfc3339());
}

/// Starts or resumes a session and persists its state.
#[instrument(level = "trace", skip(pipeline, options))]
pub async fn run_workflow(
  pipeline: &Pipeline,
  options: RunOptions<'_>,
) -> Result<WorkflowResult, PipelineError> {
  let run_dir = options.run_dir;
  let started_at = Utc::now().to_rfc3339();

  let (session_id, outcome, mut log) = match options.mode {
    RunMode::Start {
      session_id,
      initial,
    } => {
      let id = session_id.unwrap_or_else(|| Uuid::new_v4().to_string());
      let log = ExecutionLog::new(id.clone(), started_at.clone());
      let outcome = pipeline.start(&id, initial).await;
      (id, outcome, log)
    }
    RunMode::Resume {
      session_id,
      response,
    } => {
      let checkpoint = checkpoint_io::load_session_checkpoint(run_dir, &session_id)?;
      let log_path = execution_log_path(run_dir, &session_id);
      let log = execution_log_io::load_or_start(&log_path, &session_id, &started_at);
      let outcome = resume_checkpoint(pipeline, checkpoint, response).await;
      (session_id, outcome, log)
    }
  };
  let log_path = execution_log_path(run_dir, &session_id);

  let run = match outcome {
    Ok(run) => run,
    Err(e) => {
      if matches!(e, PipelineError::StageFailed { .. }) {
        record_failure(&mut log, &e);
        if let Err(io) = execution_log_io::write_execution_log(&log_path, &log) {
          warn!(error = %io, "could not write execution log");
        }
      }
      return Err(e);
    }
  };

  append_steps(&mut log, &run.steps);
  log.completed_stages = run.completed_stages.clone();
  log.final_status = run.status.to_string();
  log.finished_at = run
    .status
    .is_completed()
    .then(|| Utc::now().to_rfc3339());

  checkpoint_io::save_checkpoint(&checkpoint_path(run_dir, &session_id), &run.checkpoint())?;
  execution_log_io::write_execution_log(&log_path, &log)?;
  info!(session = %session_id, status = %run.status, "session state saved");

  let evaluation = match (options.judge, run.status.is_completed()) {
    (Some(judge), true) => {
      let diagram = run.store.get_text(keys::CURRENT_DIAGRAM).unwrap_or_default();
      let trace = ExecutionTrace {
        session_id: session_id.clone(),
        stages_invoked: run.completed_stages.clone(),
        final_output_len: diagram.chars().count(),
      };
      Some(evaluate_run(judge, &trace, diagram).await)
    }
    _ => None,
  };

  Ok(WorkflowResult {
    final_message: final_message(&run),
    session_id,
    status: run.status,
    store: run.store,
    completed_stages: run.completed_stages,
    evaluation,
  })
}
