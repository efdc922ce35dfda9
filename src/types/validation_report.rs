//! Structural report produced by the diagram validator.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Overall verdict of a validation run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverallStatus {
  Valid,
  NeedsImprovement,
  Invalid,
}

impl fmt::Display for OverallStatus {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      OverallStatus::Valid => write!(f, "valid"),
      OverallStatus::NeedsImprovement => write!(f, "needs_improvement"),
      OverallStatus::Invalid => write!(f, "invalid"),
    }
  }
}

/// Counts gathered while validating.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationStats {
  pub defined_nodes: usize,
  pub referenced_nodes: usize,
  pub gateways: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationReport {
  pub syntax_valid: bool,
  pub logic_valid: bool,
  pub errors: Vec<String>,
  pub warnings: Vec<String>,
  pub overall_status: OverallStatus,
  pub stats: ValidationStats,
}

impl ValidationReport {
  /// Derives the flags and status from the findings.
  ///
  /// `logic_warnings` counts warnings in the orphan and gateway fan-out categories.
  pub fn from_findings(
    errors: Vec<String>,
    warnings: Vec<String>,
    logic_warnings: usize,
    stats: ValidationStats,
  ) -> Self {
    let syntax_valid = errors.is_empty();
    let logic_valid = syntax_valid && logic_warnings == 0;
    let overall_status = if !syntax_valid {
      OverallStatus::Invalid
    } else if warnings.is_empty() {
      OverallStatus::Valid
    } else {
      OverallStatus::NeedsImprovement
    };
    Self {
      syntax_valid,
      logic_valid,
      errors,
      warnings,
      overall_status,
      stats,
    }
  }
}
