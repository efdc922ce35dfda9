//! Structured payloads returned by the schema-constrained collaborators.

use serde::{Deserialize, Serialize};

use crate::error::SchemaError;

/// One step found in the process description.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Step {
  pub id: u32,
  /// e.g. `task`, `decision`, `start_event`, `end_event`.
  #[serde(rename = "type")]
  pub kind: String,
  pub action: String,
  #[serde(default)]
  pub actor: Option<String>,
  #[serde(default)]
  pub condition: Option<String>,
}

/// Ordering between two steps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dependency {
  pub from: u32,
  pub to: u32,
  #[serde(default)]
  pub label: Option<String>,
}

/// Output of the structural analysis stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessAnalysis {
  pub actors: Vec<String>,
  pub steps: Vec<Step>,
  pub dependencies: Vec<Dependency>,
}

/// Node of the converted process graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphNode {
  pub id: String,
  /// e.g. `task`, `exclusive_gateway`, `parallel_gateway`, `start_event`, `end_event`.
  #[serde(rename = "type")]
  pub kind: String,
  pub label: String,
  #[serde(default)]
  pub actor: Option<String>,
}

/// Directed edge of the converted process graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphEdge {
  pub from: String,
  pub to: String,
  #[serde(default)]
  pub label: Option<String>,
}

/// Output of the graph conversion stage (the refinement loop producer).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessGraph {
  pub nodes: Vec<GraphNode>,
  pub edges: Vec<GraphEdge>,
}

/// Output of the quality evaluator (the refinement loop evaluator).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityAssessment {
  pub reasoning: String,
  pub completeness_score: f64,
  pub clarity_score: f64,
  pub reduction_score: f64,
  pub consistency_score: f64,
  pub feedback: String,
  pub approved: bool,
  /// Termination signal read by the refinement loop.
  pub exit_loop: bool,
}

impl QualityAssessment {
  /// Checks every score lies in `[0, 1]`.
  pub fn check_ranges(&self) -> Result<(), SchemaError> {
    check_unit_range("completeness_score", self.completeness_score)?;
    check_unit_range("clarity_score", self.clarity_score)?;
    check_unit_range("reduction_score", self.reduction_score)?;
    check_unit_range("consistency_score", self.consistency_score)
  }

  /// Lowest of the four dimension scores.
  pub fn min_score(&self) -> f64 {
    [
      self.completeness_score,
      self.clarity_score,
      self.reduction_score,
      self.consistency_score,
    ]
    .into_iter()
    .fold(f64::INFINITY, f64::min)
  }
}

pub(crate) fn check_unit_range(field: &str, value: f64) -> Result<(), SchemaError> {
  if (0.0..=1.0).contains(&value) {
    Ok(())
  } else {
    Err(SchemaError::OutOfRange {
      field: field.to_string(),
      value,
    })
  }
}
