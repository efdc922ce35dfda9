//! Bounded produce → evaluate loop.
//!
//! The loop never scores anything itself: it stops when the evaluator's stored
//! value requests exit ([StageValue::requests_exit]) or after `max_iterations`.
//! Exhausting the budget is a normal exit; downstream stages see the last
//! iteration's values.
//!
//! An inner stage may suspend the run. The iteration counter is not persisted,
//! so a resumed run re-enters the loop at iteration 1.

use async_trait::async_trait;
use tracing::{info, instrument, warn};

use super::stage::{RunContext, Stage, StageFlow, StageOutcome, apply_stage_output};
use crate::error::StageError;

/// Default iteration budget.
pub const DEFAULT_MAX_ITERATIONS: usize = 2;
/// Default approval threshold handed to the evaluator's instructions.
pub const DEFAULT_APPROVAL_THRESHOLD: f64 = 0.85;

/// Why the loop stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopExit {
  /// The evaluator signalled exit after this many iterations.
  Signalled(usize),
  /// The budget ran out without a signal.
  Exhausted(usize),
  /// An inner stage suspended the run during this iteration.
  Suspended(usize),
}

impl LoopExit {
  pub fn iterations(self) -> usize {
    match self {
      LoopExit::Signalled(n) | LoopExit::Exhausted(n) | LoopExit::Suspended(n) => n,
    }
  }
}

pub struct RefinementLoop {
  name: String,
  producer: Box<dyn Stage>,
  evaluator: Box<dyn Stage>,
  max_iterations: usize,
  approval_threshold: f64,
}

impl RefinementLoop {
  /// `max_iterations` below 1 is raised to 1.
  pub fn new(
    name: impl Into<String>,
    producer: Box<dyn Stage>,
    evaluator: Box<dyn Stage>,
    max_iterations: usize,
  ) -> Self {
    Self {
      name: name.into(),
      producer,
      evaluator,
      max_iterations: max_iterations.max(1),
      approval_threshold: DEFAULT_APPROVAL_THRESHOLD,
    }
  }

  pub fn with_approval_threshold(mut self, threshold: f64) -> Self {
    self.approval_threshold = threshold;
    self
  }

  pub fn max_iterations(&self) -> usize {
    self.max_iterations
  }

  pub fn approval_threshold(&self) -> f64 {
    self.approval_threshold
  }

  /// Runs one inner stage and applies its output. Returns a suspension, if any.
  async fn run_inner(
    &self,
    stage: &dyn Stage,
    ctx: &mut RunContext,
  ) -> Result<Option<StageOutcome>, StageError> {
    let outcome = stage.run(ctx).await?;
    apply_stage_output(&mut ctx.store, stage.name(), stage.output_key(), outcome.value);
    match outcome.flow {
      StageFlow::Continue => Ok(None),
      StageFlow::Suspend(request) => {
        warn!(stage = %stage.name(), "inner stage suspended the refinement loop");
        Ok(Some(StageOutcome::suspend(None, request)))
      }
    }
  }

  /// Runs iterations until the evaluator signals exit or the budget is spent.
  #[instrument(level = "trace", skip(self, ctx), fields(loop_name = %self.name))]
  pub async fn iterate(&self, ctx: &mut RunContext) -> Result<(LoopExit, Option<StageOutcome>), StageError> {
    let mut iteration = 0;
    while iteration < self.max_iterations {
      iteration += 1;
      info!(
        stage = %self.name,
        iteration,
        max_iterations = self.max_iterations,
        "refinement iteration"
      );
      if let Some(suspended) = self.run_inner(self.producer.as_ref(), ctx).await? {
        return Ok((LoopExit::Suspended(iteration), Some(suspended)));
      }
      if let Some(suspended) = self.run_inner(self.evaluator.as_ref(), ctx).await? {
        return Ok((LoopExit::Suspended(iteration), Some(suspended)));
      }
      let exit = self
        .evaluator
        .output_key()
        .and_then(|key| ctx.store.get(key))
        .is_some_and(|value| value.requests_exit());
      if exit {
        info!(stage = %self.name, iteration, "evaluator requested exit");
        return Ok((LoopExit::Signalled(iteration), None));
      }
    }
    info!(
      stage = %self.name,
      iterations = iteration,
      "iteration budget exhausted; continuing with last result"
    );
    Ok((LoopExit::Exhausted(iteration), None))
  }
}

#[async_trait]
impl Stage for RefinementLoop {
  fn name(&self) -> &str {
    &self.name
  }

  fn output_key(&self) -> Option<&str> {
    None
  }

  async fn run(&self, ctx: &mut RunContext) -> Result<StageOutcome, StageError> {
    let (_, suspended) = self.iterate(ctx).await?;
    Ok(suspended.unwrap_or_else(StageOutcome::nothing))
  }
}
