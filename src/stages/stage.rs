//! The two seams every pipeline step goes through.
//!
//! - [Collaborator]: an opaque content producer. Reads the store, returns one value.
//! - [Stage]: what the sequencer drives. May carry its own control logic
//!   (the refinement loop, the approval gate) and may suspend the run.

use async_trait::async_trait;
use tracing::{debug, instrument, warn};

use crate::error::StageError;
use crate::types::{ApprovalRequest, ApprovalResponse, StageValue, StateStore};

/// Per-run execution context handed to each stage by mutable reference.
#[derive(Debug, Clone, Default)]
pub struct RunContext {
  pub store: StateStore,
  /// The external actor's answer, present only on the pass that resumes a suspension.
  pub confirmation: Option<ApprovalResponse>,
}

impl RunContext {
  pub fn new(store: StateStore) -> Self {
    Self {
      store,
      confirmation: None,
    }
  }

  pub fn with_confirmation(store: StateStore, confirmation: Option<ApprovalResponse>) -> Self {
    Self {
      store,
      confirmation,
    }
  }

  pub fn session_id(&self) -> &str {
    &self.store.session_id
  }

  /// Consumes the confirmation so it answers at most one gate.
  pub fn take_confirmation(&mut self) -> Option<ApprovalResponse> {
    self.confirmation.take()
  }
}

/// Whether the sequencer continues after a stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StageFlow {
  Continue,
  /// Halt here; the stage re-runs when the session is resumed.
  Suspend(ApprovalRequest),
}

/// What a stage hands back to the sequencer.
#[derive(Debug, Clone, PartialEq)]
pub struct StageOutcome {
  /// Written under the stage's declared output key, if it has one.
  pub value: Option<StageValue>,
  pub flow: StageFlow,
}

impl StageOutcome {
  pub fn output(value: StageValue) -> Self {
    Self {
      value: Some(value),
      flow: StageFlow::Continue,
    }
  }

  pub fn nothing() -> Self {
    Self {
      value: None,
      flow: StageFlow::Continue,
    }
  }

  pub fn suspend(value: Option<StageValue>, request: ApprovalRequest) -> Self {
    Self {
      value,
      flow: StageFlow::Suspend(request),
    }
  }
}

/// One unit of the pipeline.
#[async_trait]
pub trait Stage: Send + Sync {
  fn name(&self) -> &str;

  /// Store key the stage's value is written to. `None`: no store side effect.
  fn output_key(&self) -> Option<&str>;

  async fn run(&self, ctx: &mut RunContext) -> Result<StageOutcome, StageError>;
}

/// External capability invoked by a stage: `execute(store) -> value` under a declared key.
#[async_trait]
pub trait Collaborator: Send + Sync {
  fn name(&self) -> &str;

  fn output_key(&self) -> &str;

  async fn execute(&self, store: &StateStore) -> Result<StageValue, StageError>;
}

/// Writes a stage's value under its declared key. Returns true if the store changed.
#[instrument(level = "trace", skip(store, value))]
pub(crate) fn apply_stage_output(
  store: &mut StateStore,
  stage: &str,
  key: Option<&str>,
  value: Option<StageValue>,
) -> bool {
  match (key, value) {
    (Some(key), Some(value)) => {
      debug!(stage, key, kind = value.kind_name(), "stage output written");
      store.set(key, value);
      true
    }
    (None, Some(value)) => {
      warn!(
        stage,
        kind = value.kind_name(),
        "stage without output key returned a value; dropped"
      );
      false
    }
    (_, None) => false,
  }
}
