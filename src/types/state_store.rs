//! Per-session key/value store shared by every stage of one run.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::{ApprovalRecord, StageValue, ValidationReport};
use crate::keys;

/// Shared state for one session. Passed by reference through every stage;
/// the sequencer guarantees a single writer at a time.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StateStore {
  pub session_id: String,
  values: BTreeMap<String, StageValue>,
}

impl StateStore {
  pub fn new(session_id: impl Into<String>) -> Self {
    Self {
      session_id: session_id.into(),
      values: BTreeMap::new(),
    }
  }

  pub fn get(&self, key: &str) -> Option<&StageValue> {
    self.values.get(key)
  }

  pub fn get_text(&self, key: &str) -> Option<&str> {
    self.values.get(key).and_then(StageValue::as_text)
  }

  pub fn contains(&self, key: &str) -> bool {
    self.values.contains_key(key)
  }

  /// Writes `value` under `key`, returning the previous value.
  pub fn set(&mut self, key: impl Into<String>, value: StageValue) -> Option<StageValue> {
    self.values.insert(key.into(), value)
  }

  pub fn keys(&self) -> impl Iterator<Item = &str> {
    self.values.keys().map(String::as_str)
  }

  pub fn len(&self) -> usize {
    self.values.len()
  }

  pub fn is_empty(&self) -> bool {
    self.values.is_empty()
  }

  /// Fresh read of the approval record; `None` when no approval was requested yet.
  pub fn approval(&self) -> Option<&ApprovalRecord> {
    match self.values.get(keys::APPROVAL_STATUS) {
      Some(StageValue::Approval(record)) => Some(record),
      _ => None,
    }
  }

  pub fn validation(&self) -> Option<&ValidationReport> {
    match self.values.get(keys::VALIDATION_RESULT) {
      Some(StageValue::Validation(report)) => Some(report),
      _ => None,
    }
  }

  /// Explicit human decision recorded outside the gate.
  ///
  /// This is the only path that may replace a terminal record.
  pub fn record_human_decision(&mut self, record: ApprovalRecord) {
    self
      .values
      .insert(keys::APPROVAL_STATUS.to_string(), StageValue::Approval(record));
  }
}
