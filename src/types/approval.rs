//! Approval record and the request/response exchanged with the external actor.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Tri-state sign-off status. Absent from the store means "not yet requested".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ApprovalStatus {
  Pending,
  Approved,
  Rejected,
}

impl ApprovalStatus {
  /// Approved and rejected are final for the run.
  pub fn is_terminal(self) -> bool {
    matches!(self, ApprovalStatus::Approved | ApprovalStatus::Rejected)
  }
}

impl fmt::Display for ApprovalStatus {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      ApprovalStatus::Pending => write!(f, "PENDING"),
      ApprovalStatus::Approved => write!(f, "APPROVED"),
      ApprovalStatus::Rejected => write!(f, "REJECTED"),
    }
  }
}

impl FromStr for ApprovalStatus {
  type Err = String;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.trim().to_ascii_uppercase().as_str() {
      "PENDING" => Ok(ApprovalStatus::Pending),
      "APPROVED" => Ok(ApprovalStatus::Approved),
      "REJECTED" => Ok(ApprovalStatus::Rejected),
      other => Err(format!("unknown approval status '{}'", other)),
    }
  }
}

/// Who resolved the record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalSource {
  /// An external actor answered a suspension request.
  Human,
  /// Resolved by the non-interactive escape hatch.
  Unattended,
}

/// The value stored under the approval key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApprovalRecord {
  pub status: ApprovalStatus,
  pub source: Option<ApprovalSource>,
  pub reason: Option<String>,
  pub updated_at: DateTime<Utc>,
}

impl ApprovalRecord {
  pub fn pending() -> Self {
    Self {
      status: ApprovalStatus::Pending,
      source: None,
      reason: None,
      updated_at: Utc::now(),
    }
  }

  pub fn unattended() -> Self {
    Self {
      status: ApprovalStatus::Approved,
      source: Some(ApprovalSource::Unattended),
      reason: None,
      updated_at: Utc::now(),
    }
  }

  /// Terminal record for an external actor's answer.
  pub fn from_response(response: &ApprovalResponse) -> Self {
    let status = if response.confirmed {
      ApprovalStatus::Approved
    } else {
      ApprovalStatus::Rejected
    };
    let reason = if response.confirmed {
      None
    } else {
      Some(
        response
          .reason
          .clone()
          .unwrap_or_else(|| "No reason given".to_string()),
      )
    };
    Self {
      status,
      source: Some(ApprovalSource::Human),
      reason,
      updated_at: Utc::now(),
    }
  }

  pub fn is_human_approval(&self) -> bool {
    self.status == ApprovalStatus::Approved && self.source == Some(ApprovalSource::Human)
  }
}

/// Bounded preview sent along with a suspension request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApprovalPayload {
  pub preview: String,
}

/// Suspension request emitted by the approval gate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApprovalRequest {
  pub session_id: String,
  pub hint: String,
  pub payload: ApprovalPayload,
}

/// Answer from the external actor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApprovalResponse {
  pub confirmed: bool,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub reason: Option<String>,
}

impl ApprovalResponse {
  pub fn accept() -> Self {
    Self {
      confirmed: true,
      reason: None,
    }
  }

  pub fn decline(reason: Option<String>) -> Self {
    Self {
      confirmed: false,
      reason,
    }
  }
}

/// First `max_chars` characters of `text` (never splits a char).
pub fn bounded_preview(text: &str, max_chars: usize) -> String {
  text.chars().take(max_chars).collect()
}
