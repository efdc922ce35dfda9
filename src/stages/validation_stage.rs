//! Runs the diagram validator over `current_diagram`.

use async_trait::async_trait;
use tracing::{info, instrument};

use super::stage::{RunContext, Stage, StageOutcome};
use crate::diagram_validator::validate_diagram;
use crate::error::StageError;
use crate::keys;
use crate::types::StageValue;

/// Stores the validation report under `validation_result`. Findings never fail the stage.
pub struct ValidationStage {
  name: String,
}

impl ValidationStage {
  pub fn new(name: impl Into<String>) -> Self {
    Self { name: name.into() }
  }
}

#[async_trait]
impl Stage for ValidationStage {
  fn name(&self) -> &str {
    &self.name
  }

  fn output_key(&self) -> Option<&str> {
    Some(keys::VALIDATION_RESULT)
  }

  #[instrument(level = "trace", skip(self, ctx))]
  async fn run(&self, ctx: &mut RunContext) -> Result<StageOutcome, StageError> {
    let diagram = ctx
      .store
      .get_text(keys::CURRENT_DIAGRAM)
      .ok_or_else(|| StageError::missing_input(&self.name, keys::CURRENT_DIAGRAM))?;
    let report = validate_diagram(diagram);
    info!(
      stage = %self.name,
      status = %report.overall_status,
      errors = report.errors.len(),
      warnings = report.warnings.len(),
      "diagram validated"
    );
    Ok(StageOutcome::output(StageValue::Validation(report)))
  }
}
