//! Tests for the approval gate.

use std::sync::Arc;

use super::approval_gate::{APPROVAL_HINT, ApprovalGate, GateOutcome};
use super::stage::{RunContext, Stage, StageFlow};
use super::test_support::RecordingChannel;
use crate::keys;
use crate::types::{
  ApprovalRecord, ApprovalResponse, ApprovalSource, ApprovalStatus, StageValue, StateStore,
};

fn store_with_diagram(diagram: &str) -> StateStore {
  let mut store = StateStore::new("s-gate");
  store.set(keys::CURRENT_DIAGRAM, StageValue::Text(diagram.to_string()));
  store
}

fn gate(channel: &Arc<RecordingChannel>) -> ApprovalGate {
  ApprovalGate::new("approval", channel.clone())
}

#[tokio::test]
async fn fresh_gate_requests_and_suspends() {
  let channel = Arc::new(RecordingChannel::default());
  let diagram = "x".repeat(800);
  let mut ctx = RunContext::new(store_with_diagram(&diagram));
  let outcome = gate(&channel).run(&mut ctx).await.unwrap();

  let StageFlow::Suspend(request) = &outcome.flow else {
    panic!("expected suspension, got {:?}", outcome.flow);
  };
  assert_eq!(request.session_id, "s-gate");
  assert_eq!(request.hint, APPROVAL_HINT);
  assert_eq!(request.payload.preview.chars().count(), 500);
  match &outcome.value {
    Some(StageValue::Approval(r)) => assert_eq!(r.status, ApprovalStatus::Pending),
    other => panic!("expected pending record, got {:?}", other),
  }
  assert_eq!(channel.requests().len(), 1);
}

#[tokio::test]
async fn preview_size_is_configurable() {
  let channel = Arc::new(RecordingChannel::default());
  let mut ctx = RunContext::new(store_with_diagram("flowchart TD\nA([Start])"));
  let decision = gate(&channel).preview_chars(9).decide(&mut ctx).await;
  let GateOutcome::Waiting(request) = decision.outcome else {
    panic!("expected waiting");
  };
  assert_eq!(request.payload.preview, "flowchart");
}

#[tokio::test]
async fn approved_record_never_requests() {
  let channel = Arc::new(RecordingChannel::default());
  let mut store = store_with_diagram("flowchart TD");
  let approved = ApprovalRecord::from_response(&ApprovalResponse::accept());
  store.set(keys::APPROVAL_STATUS, StageValue::Approval(approved));
  let mut ctx = RunContext::new(store);

  let outcome = gate(&channel).run(&mut ctx).await.unwrap();
  assert_eq!(outcome.flow, StageFlow::Continue);
  assert!(outcome.value.is_none());
  assert!(channel.requests().is_empty());
}

#[tokio::test]
async fn terminal_record_ignores_later_confirmation_and_unattended_mode() {
  let channel = Arc::new(RecordingChannel::default());
  let mut store = store_with_diagram("flowchart TD");
  let rejected = ApprovalRecord::from_response(&ApprovalResponse::decline(Some("wrong".into())));
  store.set(keys::APPROVAL_STATUS, StageValue::Approval(rejected));
  let mut ctx = RunContext::with_confirmation(store, Some(ApprovalResponse::accept()));

  let decision = gate(&channel).non_interactive(true).decide(&mut ctx).await;
  assert_eq!(
    decision.outcome,
    GateOutcome::Rejected {
      reason: Some("wrong".to_string())
    }
  );
  assert!(decision.record.is_none());
  assert!(channel.requests().is_empty());
}

#[tokio::test]
async fn non_interactive_approves_without_pending() {
  let channel = Arc::new(RecordingChannel::default());
  let mut ctx = RunContext::new(store_with_diagram("flowchart TD"));
  let outcome = gate(&channel)
    .non_interactive(true)
    .run(&mut ctx)
    .await
    .unwrap();

  assert_eq!(outcome.flow, StageFlow::Continue);
  match outcome.value {
    Some(StageValue::Approval(r)) => {
      assert_eq!(r.status, ApprovalStatus::Approved);
      assert_eq!(r.source, Some(ApprovalSource::Unattended));
    }
    other => panic!("expected approval, got {:?}", other),
  }
  assert!(channel.requests().is_empty());
}

#[tokio::test]
async fn pending_plus_accept_resolves_approved() {
  let channel = Arc::new(RecordingChannel::default());
  let mut store = store_with_diagram("flowchart TD");
  store.set(keys::APPROVAL_STATUS, StageValue::Approval(ApprovalRecord::pending()));
  let mut ctx = RunContext::with_confirmation(store, Some(ApprovalResponse::accept()));

  let decision = gate(&channel).decide(&mut ctx).await;
  assert_eq!(decision.outcome, GateOutcome::Approved);
  let record = decision.record.unwrap();
  assert!(record.is_human_approval());
  assert!(ctx.confirmation.is_none());
  assert!(channel.requests().is_empty());
}

#[tokio::test]
async fn pending_plus_decline_keeps_reason() {
  let channel = Arc::new(RecordingChannel::default());
  let mut store = store_with_diagram("flowchart TD");
  store.set(keys::APPROVAL_STATUS, StageValue::Approval(ApprovalRecord::pending()));
  let response = ApprovalResponse::decline(Some("missing escalation path".into()));
  let mut ctx = RunContext::with_confirmation(store, Some(response));

  let decision = gate(&channel).decide(&mut ctx).await;
  assert_eq!(
    decision.outcome,
    GateOutcome::Rejected {
      reason: Some("missing escalation path".to_string())
    }
  );
  assert_eq!(decision.record.unwrap().status, ApprovalStatus::Rejected);
}

#[tokio::test]
async fn pending_without_answer_asks_again() {
  let channel = Arc::new(RecordingChannel::default());
  let mut store = store_with_diagram("flowchart TD");
  store.set(keys::APPROVAL_STATUS, StageValue::Approval(ApprovalRecord::pending()));
  let mut ctx = RunContext::new(store);

  let outcome = gate(&channel).run(&mut ctx).await.unwrap();
  assert!(matches!(outcome.flow, StageFlow::Suspend(_)));
  assert_eq!(channel.requests().len(), 1);
}

#[tokio::test]
async fn confirmation_without_pending_is_ignored() {
  let channel = Arc::new(RecordingChannel::default());
  let mut ctx = RunContext::with_confirmation(
    store_with_diagram("flowchart TD"),
    Some(ApprovalResponse::accept()),
  );

  let decision = gate(&channel).decide(&mut ctx).await;
  assert!(matches!(decision.outcome, GateOutcome::Waiting(_)));
  assert_eq!(decision.record.unwrap().status, ApprovalStatus::Pending);
  assert_eq!(channel.requests().len(), 1);
}

#[tokio::test]
async fn missing_diagram_sends_empty_preview() {
  let channel = Arc::new(RecordingChannel::default());
  let mut ctx = RunContext::new(StateStore::new("s"));
  gate(&channel).run(&mut ctx).await.unwrap();
  assert_eq!(channel.requests()[0].payload.preview, "");
}
