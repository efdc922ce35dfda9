//! Pipeline sequencer: runs stages strictly in order over one shared store.
//!
//! After each stage its value is written under the stage's declared key; that
//! write is the only channel between stages. A stage error aborts the run
//! ([PipelineError::StageFailed]). A suspension halts the run with the
//! checkpoint pointing at the suspending stage, which re-runs on resume.

use chrono::Utc;
use tracing::{info, instrument, warn};

use crate::error::PipelineError;
use crate::stages::{RunContext, Stage, StageFlow, apply_stage_output};
use crate::types::{
  ApprovalResponse, Checkpoint, RunStatus, StageLogEntry, StageRunStatus, StageValue, StateStore,
};

/// Ordered list of stages.
#[derive(Default)]
pub struct Pipeline {
  stages: Vec<Box<dyn Stage>>,
}

/// Result of one pass (start or resume) over the pipeline.
#[derive(Debug, Clone)]
pub struct PipelineRun {
  pub session_id: String,
  pub status: RunStatus,
  pub store: StateStore,
  /// Every stage completed in this session so far, in order.
  pub completed_stages: Vec<String>,
  /// Index of the stage to run on resume (== stage count when finished).
  pub next_stage: usize,
  /// Stage runs of this pass, numbered from 1.
  pub steps: Vec<StageLogEntry>,
}

impl PipelineRun {
  pub fn checkpoint(&self) -> Checkpoint {
    Checkpoint {
      session_id: self.session_id.clone(),
      store: self.store.clone(),
      next_stage: self.next_stage,
      completed_stages: self.completed_stages.clone(),
      finished: self.status.is_completed(),
    }
  }
}

impl Pipeline {
  pub fn new() -> Self {
    Self::default()
  }

  /// Appends a stage.
  pub fn stage(mut self, stage: impl Stage + 'static) -> Self {
    self.stages.push(Box::new(stage));
    self
  }

  pub fn push(&mut self, stage: Box<dyn Stage>) {
    self.stages.push(stage);
  }

  pub fn len(&self) -> usize {
    self.stages.len()
  }

  pub fn is_empty(&self) -> bool {
    self.stages.is_empty()
  }

  pub fn stage_names(&self) -> Vec<&str> {
    self.stages.iter().map(|s| s.name()).collect()
  }

  /// Index of the first stage declaring `key` as its output.
  pub fn position_of_output(&self, key: &str) -> Option<usize> {
    self.stages.iter().position(|s| s.output_key() == Some(key))
  }

  /// Runs a new session from the first stage with `initial` values in the store.
  #[instrument(level = "trace", skip(self, initial))]
  pub async fn start(
    &self,
    session_id: &str,
    initial: Vec<(String, StageValue)>,
  ) -> Result<PipelineRun, PipelineError> {
    let mut store = StateStore::new(session_id);
    for (key, value) in initial {
      store.set(key, value);
    }
    info!(session = %session_id, stages = self.stages.len(), "starting pipeline");
    self.run_from(RunContext::new(store), 0, vec![]).await
  }

  /// Re-enters a suspended session at its checkpointed stage.
  #[instrument(level = "trace", skip(self, checkpoint, response))]
  pub async fn resume(
    &self,
    checkpoint: Checkpoint,
    response: Option<ApprovalResponse>,
  ) -> Result<PipelineRun, PipelineError> {
    if checkpoint.finished {
      return Err(PipelineError::ResumeCompleted(checkpoint.session_id));
    }
    if checkpoint.next_stage > self.stages.len() {
      return Err(PipelineError::UnknownStage {
        index: checkpoint.next_stage,
        len: self.stages.len(),
      });
    }
    info!(
      session = %checkpoint.session_id,
      next_stage = checkpoint.next_stage,
      answered = response.is_some(),
      "resuming pipeline"
    );
    let ctx = RunContext::with_confirmation(checkpoint.store, response);
    self
      .run_from(ctx, checkpoint.next_stage, checkpoint.completed_stages)
      .await
  }

  async fn run_from(
    &self,
    mut ctx: RunContext,
    start: usize,
    mut completed: Vec<String>,
  ) -> Result<PipelineRun, PipelineError> {
    let mut steps: Vec<StageLogEntry> = vec![];

    for (index, stage) in self.stages.iter().enumerate().skip(start) {
      let name = stage.name().to_string();
      let started_at = Utc::now().to_rfc3339();
      info!(stage = %name, index, session = %ctx.session_id(), "executing stage");

      let outcome = match stage.run(&mut ctx).await {
        Ok(o) => o,
        Err(source) => {
          warn!(stage = %name, error = %source, "stage failed; aborting pipeline");
          return Err(PipelineError::StageFailed {
            stage: name,
            source,
          });
        }
      };

      apply_stage_output(&mut ctx.store, &name, stage.output_key(), outcome.value);
      let mut entry = StageLogEntry {
        step: steps.len() as u32 + 1,
        stage: name.clone(),
        output_key: stage.output_key().map(str::to_string),
        status: StageRunStatus::Completed,
        started_at,
        message: None,
      };

      match outcome.flow {
        StageFlow::Continue => {
          steps.push(entry);
          completed.push(name);
        }
        StageFlow::Suspend(request) => {
          entry.status = StageRunStatus::Suspended;
          steps.push(entry);
          info!(stage = %name, index, "pipeline suspended");
          if ctx.confirmation.is_some() {
            warn!(stage = %name, "unused confirmation dropped");
          }
          return Ok(PipelineRun {
            session_id: ctx.store.session_id.clone(),
            status: RunStatus::AwaitingApproval { request },
            store: ctx.store,
            completed_stages: completed,
            next_stage: index,
            steps,
          });
        }
      }
    }

    if ctx.confirmation.is_some() {
      warn!("confirmation was not consumed by any stage");
    }
    info!(completed_stages = ?completed, "pipeline complete");
    Ok(PipelineRun {
      session_id: ctx.store.session_id.clone(),
      status: RunStatus::Completed,
      store: ctx.store,
      completed_stages: completed,
      next_stage: self.stages.len(),
      steps,
    })
  }
}
