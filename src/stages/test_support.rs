//! In-memory collaborators, channels and publishers for stage tests.

use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;

use super::approval_gate::ApprovalChannel;
use super::publication::Publisher;
use super::stage::Collaborator;
use crate::error::StageError;
use crate::types::{ApprovalRequest, QualityAssessment, StageValue, StateStore};

/// Returns scripted values in order, repeating the last one once exhausted.
pub(crate) struct ScriptedCollaborator {
  name: String,
  key: String,
  script: Vec<Result<StageValue, String>>,
  calls: AtomicUsize,
  seen: Mutex<Vec<StateStore>>,
}

impl ScriptedCollaborator {
  pub(crate) fn new(name: &str, key: &str, values: Vec<StageValue>) -> Self {
    Self {
      name: name.to_string(),
      key: key.to_string(),
      script: values.into_iter().map(Ok).collect(),
      calls: AtomicUsize::new(0),
      seen: Mutex::new(vec![]),
    }
  }

  pub(crate) fn failing(name: &str, key: &str, message: &str) -> Self {
    Self {
      name: name.to_string(),
      key: key.to_string(),
      script: vec![Err(message.to_string())],
      calls: AtomicUsize::new(0),
      seen: Mutex::new(vec![]),
    }
  }

  pub(crate) fn calls(&self) -> usize {
    self.calls.load(Ordering::SeqCst)
  }

  /// Store snapshots observed on each call.
  pub(crate) fn seen(&self) -> Vec<StateStore> {
    self.seen.lock().unwrap().clone()
  }
}

#[async_trait]
impl Collaborator for ScriptedCollaborator {
  fn name(&self) -> &str {
    &self.name
  }

  fn output_key(&self) -> &str {
    &self.key
  }

  async fn execute(&self, store: &StateStore) -> Result<StageValue, StageError> {
    let n = self.calls.fetch_add(1, Ordering::SeqCst);
    self.seen.lock().unwrap().push(store.clone());
    let idx = n.min(self.script.len().saturating_sub(1));
    match self.script.get(idx) {
      Some(Ok(v)) => Ok(v.clone()),
      Some(Err(msg)) => Err(StageError::collaborator(&self.name, msg.clone())),
      None => Err(StageError::collaborator(&self.name, "empty script")),
    }
  }
}

/// Counts confirmation requests.
#[derive(Default)]
pub(crate) struct RecordingChannel {
  requests: Mutex<Vec<ApprovalRequest>>,
}

impl RecordingChannel {
  pub(crate) fn requests(&self) -> Vec<ApprovalRequest> {
    self.requests.lock().unwrap().clone()
  }
}

#[async_trait]
impl ApprovalChannel for RecordingChannel {
  async fn request_confirmation(&self, request: &ApprovalRequest) {
    self.requests.lock().unwrap().push(request.clone());
  }
}

/// Counts publish calls without touching the filesystem.
#[derive(Default)]
pub(crate) struct RecordingPublisher {
  calls: AtomicUsize,
}

impl RecordingPublisher {
  pub(crate) fn calls(&self) -> usize {
    self.calls.load(Ordering::SeqCst)
  }
}

#[async_trait]
impl Publisher for RecordingPublisher {
  async fn publish(&self, _store: &StateStore) -> Result<String, StageError> {
    self.calls.fetch_add(1, Ordering::SeqCst);
    Ok("published".to_string())
  }
}

pub(crate) fn quality(score: f64, exit_loop: bool) -> StageValue {
  StageValue::Quality(QualityAssessment {
    reasoning: "checked".to_string(),
    completeness_score: score,
    clarity_score: score,
    reduction_score: score,
    consistency_score: score,
    feedback: if exit_loop { String::new() } else { "add the missing branch".to_string() },
    approved: exit_loop,
    exit_loop,
  })
}

pub(crate) fn text(s: &str) -> StageValue {
  StageValue::Text(s.to_string())
}
