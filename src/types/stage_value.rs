//! Values stages write into the shared store.
//!
//! Each structured stage has its own variant so field sets are checked at
//! compile time; raw collaborator output is turned into a variant by
//! [OutputKind::parse], which rejects non-conforming payloads.

use serde::{Deserialize, Serialize};
use tracing::instrument;

use super::{ApprovalRecord, ProcessAnalysis, ProcessGraph, QualityAssessment, ValidationReport};
use crate::error::SchemaError;

/// A value held in the [StateStore](super::StateStore).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum StageValue {
  Text(String),
  Analysis(ProcessAnalysis),
  Graph(ProcessGraph),
  Quality(QualityAssessment),
  Validation(ValidationReport),
  Approval(ApprovalRecord),
}

impl StageValue {
  pub fn kind_name(&self) -> &'static str {
    match self {
      StageValue::Text(_) => "text",
      StageValue::Analysis(_) => "analysis",
      StageValue::Graph(_) => "graph",
      StageValue::Quality(_) => "quality",
      StageValue::Validation(_) => "validation",
      StageValue::Approval(_) => "approval",
    }
  }

  pub fn as_text(&self) -> Option<&str> {
    match self {
      StageValue::Text(s) => Some(s),
      _ => None,
    }
  }

  /// True when an evaluator asked the refinement loop to stop.
  pub fn requests_exit(&self) -> bool {
    matches!(self, StageValue::Quality(q) if q.exit_loop)
  }

  /// Renders the value for inclusion in a collaborator prompt.
  pub fn render(&self) -> String {
    let json = match self {
      StageValue::Text(s) => return s.clone(),
      StageValue::Analysis(v) => serde_json::to_string_pretty(v),
      StageValue::Graph(v) => serde_json::to_string_pretty(v),
      StageValue::Quality(v) => serde_json::to_string_pretty(v),
      StageValue::Validation(v) => serde_json::to_string_pretty(v),
      StageValue::Approval(v) => serde_json::to_string_pretty(v),
    };
    json.unwrap_or_default()
  }
}

/// Shape a collaborator promises to return.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputKind {
  Text,
  Analysis,
  Graph,
  Quality,
}

impl OutputKind {
  pub fn name(self) -> &'static str {
    match self {
      OutputKind::Text => "text",
      OutputKind::Analysis => "analysis",
      OutputKind::Graph => "graph",
      OutputKind::Quality => "quality",
    }
  }

  /// Strictly parses raw collaborator output into the matching variant.
  #[instrument(level = "trace", skip(raw))]
  pub fn parse(self, raw: &str) -> Result<StageValue, SchemaError> {
    match self {
      OutputKind::Text => Ok(StageValue::Text(raw.trim().to_string())),
      OutputKind::Analysis => Ok(StageValue::Analysis(serde_json::from_str(raw.trim())?)),
      OutputKind::Graph => Ok(StageValue::Graph(serde_json::from_str(raw.trim())?)),
      OutputKind::Quality => {
        let q: QualityAssessment = serde_json::from_str(raw.trim())?;
        q.check_ranges()?;
        Ok(StageValue::Quality(q))
      }
    }
  }

  /// Checks an already-typed value has this kind (and valid ranges).
  pub fn check(self, value: &StageValue) -> Result<(), SchemaError> {
    let ok = matches!(
      (self, value),
      (OutputKind::Text, StageValue::Text(_))
        | (OutputKind::Analysis, StageValue::Analysis(_))
        | (OutputKind::Graph, StageValue::Graph(_))
        | (OutputKind::Quality, StageValue::Quality(_))
    );
    if !ok {
      return Err(SchemaError::UnexpectedKind {
        expected: self.name(),
        found: value.kind_name(),
      });
    }
    if let StageValue::Quality(q) = value {
      q.check_ranges()?;
    }
    Ok(())
  }
}
