//! Adapts a [Collaborator] into a [Stage], enforcing the declared output shape.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{info, instrument};

use super::stage::{Collaborator, RunContext, Stage, StageOutcome};
use crate::error::StageError;
use crate::types::OutputKind;

/// Runs one collaborator and rejects values of the wrong kind or out of range.
pub struct CollaboratorStage {
  collaborator: Arc<dyn Collaborator>,
  expected: OutputKind,
}

impl CollaboratorStage {
  pub fn new(collaborator: Arc<dyn Collaborator>, expected: OutputKind) -> Self {
    Self {
      collaborator,
      expected,
    }
  }

  pub fn expected(&self) -> OutputKind {
    self.expected
  }
}

#[async_trait]
impl Stage for CollaboratorStage {
  fn name(&self) -> &str {
    self.collaborator.name()
  }

  fn output_key(&self) -> Option<&str> {
    Some(self.collaborator.output_key())
  }

  #[instrument(level = "trace", skip(self, ctx), fields(stage = %self.name()))]
  async fn run(&self, ctx: &mut RunContext) -> Result<StageOutcome, StageError> {
    info!(stage = %self.name(), session = %ctx.session_id(), "running collaborator");
    let value = self.collaborator.execute(&ctx.store).await?;
    self
      .expected
      .check(&value)
      .map_err(|source| StageError::Schema {
        stage: self.name().to_string(),
        source,
      })?;
    Ok(StageOutcome::output(value))
  }
}
