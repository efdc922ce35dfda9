//! Tests for the collaborator adapter and stage output application.

use std::sync::Arc;

use super::collaborator_stage::CollaboratorStage;
use super::stage::{RunContext, Stage, StageFlow, apply_stage_output};
use super::test_support::{ScriptedCollaborator, quality, text};
use crate::error::{SchemaError, StageError};
use crate::keys;
use crate::types::{OutputKind, StageValue, StateStore};

#[tokio::test]
async fn value_of_expected_kind_is_returned_for_its_key() {
  let collab = Arc::new(ScriptedCollaborator::new(
    "generate",
    keys::CURRENT_DIAGRAM,
    vec![text("flowchart TD")],
  ));
  let stage = CollaboratorStage::new(collab.clone(), OutputKind::Text);
  assert_eq!(stage.name(), "generate");
  assert_eq!(stage.output_key(), Some(keys::CURRENT_DIAGRAM));

  let mut ctx = RunContext::new(StateStore::new("s"));
  let outcome = stage.run(&mut ctx).await.unwrap();
  assert_eq!(outcome.flow, StageFlow::Continue);
  assert_eq!(outcome.value, Some(text("flowchart TD")));
  // the adapter does not write; the sequencer does
  assert!(ctx.store.is_empty());
}

#[tokio::test]
async fn wrong_kind_is_schema_error() {
  let collab = Arc::new(ScriptedCollaborator::new(
    "assess",
    keys::QUALITY_ASSESSMENT,
    vec![text("approved!")],
  ));
  let stage = CollaboratorStage::new(collab, OutputKind::Quality);
  let mut ctx = RunContext::new(StateStore::new("s"));
  let err = stage.run(&mut ctx).await.unwrap_err();
  match err {
    StageError::Schema { stage, source } => {
      assert_eq!(stage, "assess");
      assert!(matches!(source, SchemaError::UnexpectedKind { .. }));
    }
    other => panic!("expected schema error, got {:?}", other),
  }
}

#[tokio::test]
async fn out_of_range_score_is_schema_error() {
  let collab = Arc::new(ScriptedCollaborator::new(
    "assess",
    keys::QUALITY_ASSESSMENT,
    vec![quality(1.5, true)],
  ));
  let stage = CollaboratorStage::new(collab, OutputKind::Quality);
  let mut ctx = RunContext::new(StateStore::new("s"));
  let err = stage.run(&mut ctx).await.unwrap_err();
  assert!(matches!(
    err,
    StageError::Schema {
      source: SchemaError::OutOfRange { .. },
      ..
    }
  ));
}

#[tokio::test]
async fn collaborator_error_propagates() {
  let collab = Arc::new(ScriptedCollaborator::failing("analyze", keys::PROCESS_ANALYSIS, "boom"));
  let stage = CollaboratorStage::new(collab, OutputKind::Analysis);
  let mut ctx = RunContext::new(StateStore::new("s"));
  let err = stage.run(&mut ctx).await.unwrap_err();
  assert_eq!(err.to_string(), "stage 'analyze' failed: boom");
}

#[test]
fn apply_writes_only_with_key_and_value() {
  let mut store = StateStore::new("s");
  assert!(apply_stage_output(&mut store, "a", Some("k"), Some(text("v"))));
  assert_eq!(store.get_text("k"), Some("v"));

  assert!(!apply_stage_output(&mut store, "b", None, Some(text("dropped"))));
  assert!(!apply_stage_output(&mut store, "c", Some("k"), None));
  assert_eq!(store.len(), 1);
  assert_eq!(store.get("k"), Some(&StageValue::Text("v".to_string())));
}
