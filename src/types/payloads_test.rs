//! Tests for structured payloads.

use super::{ProcessAnalysis, ProcessGraph, QualityAssessment};

fn quality(score: f64) -> QualityAssessment {
  QualityAssessment {
    reasoning: "r".to_string(),
    completeness_score: score,
    clarity_score: 0.9,
    reduction_score: 0.9,
    consistency_score: 0.9,
    feedback: "f".to_string(),
    approved: false,
    exit_loop: false,
  }
}

#[test]
fn analysis_parses_type_and_optional_fields() {
  let json = r#"{
    "actors": ["Clerk"],
    "steps": [
      {"id": 0, "type": "start_event", "action": "Receive order"},
      {"id": 1, "type": "decision", "action": "Check value", "actor": "Clerk", "condition": "> 10000 EUR"}
    ],
    "dependencies": [{"from": 0, "to": 1}]
  }"#;
  let a: ProcessAnalysis = serde_json::from_str(json).unwrap();
  assert_eq!(a.steps.len(), 2);
  assert_eq!(a.steps[0].kind, "start_event");
  assert!(a.steps[0].actor.is_none());
  assert_eq!(a.steps[1].condition.as_deref(), Some("> 10000 EUR"));
  assert!(a.dependencies[0].label.is_none());
}

#[test]
fn analysis_rejects_negative_step_id() {
  let json = r#"{"actors": [], "steps": [{"id": -1, "type": "task", "action": "x"}], "dependencies": []}"#;
  assert!(serde_json::from_str::<ProcessAnalysis>(json).is_err());
}

#[test]
fn graph_edge_uses_from_field() {
  let json = r#"{"nodes": [{"id": "a", "type": "task", "label": "A"}], "edges": [{"from": "a", "to": "b", "label": "yes"}]}"#;
  let g: ProcessGraph = serde_json::from_str(json).unwrap();
  assert_eq!(g.edges[0].from, "a");
  assert_eq!(g.edges[0].label.as_deref(), Some("yes"));
}

#[test]
fn quality_ranges_checked() {
  assert!(quality(0.0).check_ranges().is_ok());
  assert!(quality(1.0).check_ranges().is_ok());
  let err = quality(1.2).check_ranges().unwrap_err();
  assert!(err.to_string().contains("completeness_score"));
  assert!(quality(-0.1).check_ranges().is_err());
  assert!(quality(f64::NAN).check_ranges().is_err());
}

#[test]
fn quality_min_score() {
  assert_eq!(quality(0.4).min_score(), 0.4);
}
