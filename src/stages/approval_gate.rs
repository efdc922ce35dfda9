//! Human sign-off gate.
//!
//! State machine over the approval record (absent → PENDING → APPROVED | REJECTED):
//!
//! 1. Terminal record: return it unchanged; never re-prompt.
//! 2. PENDING and the actor has answered: write the terminal record.
//! 3. Non-interactive mode: auto-approve (recorded as unattended).
//! 4. Otherwise: send a request, write PENDING, suspend the run.
//!
//! The gate never blocks waiting for an answer; resumption re-enters it with the
//! answer in [RunContext::confirmation].

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{info, instrument, warn};

use super::stage::{RunContext, Stage, StageFlow, StageOutcome};
use crate::error::StageError;
use crate::keys;
use crate::types::{
  ApprovalPayload, ApprovalRecord, ApprovalRequest, ApprovalStatus, StageValue, bounded_preview,
};

/// Default preview size sent with a request.
pub const DEFAULT_PREVIEW_CHARS: usize = 500;

/// Hint shown to the external actor.
pub const APPROVAL_HINT: &str =
  "Review the generated diagram. Confirm to publish it, or decline with a reason.";

/// Transport for suspension requests.
#[async_trait]
pub trait ApprovalChannel: Send + Sync {
  async fn request_confirmation(&self, request: &ApprovalRequest);
}

/// Channel that only logs the request; the answer arrives through a resumed run.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogApprovalChannel;

#[async_trait]
impl ApprovalChannel for LogApprovalChannel {
  async fn request_confirmation(&self, request: &ApprovalRequest) {
    info!(
      session = %request.session_id,
      hint = %request.hint,
      preview_chars = request.payload.preview.chars().count(),
      "approval requested"
    );
  }
}

/// Result of one pass through the gate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateOutcome {
  Approved,
  Rejected { reason: Option<String> },
  Waiting(ApprovalRequest),
}

impl GateOutcome {
  fn from_terminal(record: &ApprovalRecord) -> Self {
    match record.status {
      ApprovalStatus::Rejected => GateOutcome::Rejected {
        reason: record.reason.clone(),
      },
      _ => GateOutcome::Approved,
    }
  }
}

/// Decision plus the record to write (None: leave the store untouched).
#[derive(Debug, Clone, PartialEq)]
pub struct GateDecision {
  pub outcome: GateOutcome,
  pub record: Option<ApprovalRecord>,
}

pub struct ApprovalGate {
  name: String,
  channel: Arc<dyn ApprovalChannel>,
  non_interactive: bool,
  preview_chars: usize,
}

impl ApprovalGate {
  pub fn new(name: impl Into<String>, channel: Arc<dyn ApprovalChannel>) -> Self {
    Self {
      name: name.into(),
      channel,
      non_interactive: false,
      preview_chars: DEFAULT_PREVIEW_CHARS,
    }
  }

  pub fn non_interactive(mut self, enabled: bool) -> Self {
    self.non_interactive = enabled;
    self
  }

  pub fn preview_chars(mut self, chars: usize) -> Self {
    self.preview_chars = chars;
    self
  }

  fn request_for(&self, ctx: &RunContext) -> ApprovalRequest {
    let diagram = ctx.store.get_text(keys::CURRENT_DIAGRAM).unwrap_or_default();
    ApprovalRequest {
      session_id: ctx.session_id().to_string(),
      hint: APPROVAL_HINT.to_string(),
      payload: ApprovalPayload {
        preview: bounded_preview(diagram, self.preview_chars),
      },
    }
  }

  /// Runs the state machine once.
  #[instrument(level = "trace", skip(self, ctx))]
  pub async fn decide(&self, ctx: &mut RunContext) -> GateDecision {
    let current = ctx.store.approval().cloned();
    let confirmation = ctx.take_confirmation();

    if let Some(record) = current.as_ref().filter(|r| r.status.is_terminal()) {
      info!(stage = %self.name, status = %record.status, "approval already resolved");
      return GateDecision {
        outcome: GateOutcome::from_terminal(record),
        record: None,
      };
    }

    let pending = current.is_some();
    match confirmation {
      Some(response) if pending => {
        let record = ApprovalRecord::from_response(&response);
        info!(stage = %self.name, status = %record.status, "approval resolved by actor");
        return GateDecision {
          outcome: GateOutcome::from_terminal(&record),
          record: Some(record),
        };
      }
      Some(_) => {
        warn!(stage = %self.name, "confirmation received without a pending request; ignored");
      }
      None => {}
    }

    if self.non_interactive {
      info!(stage = %self.name, "non-interactive mode: auto-approving");
      return GateDecision {
        outcome: GateOutcome::Approved,
        record: Some(ApprovalRecord::unattended()),
      };
    }

    let request = self.request_for(ctx);
    self.channel.request_confirmation(&request).await;
    info!(stage = %self.name, session = %request.session_id, "awaiting approval");
    GateDecision {
      outcome: GateOutcome::Waiting(request),
      record: Some(ApprovalRecord::pending()),
    }
  }
}

#[async_trait]
impl Stage for ApprovalGate {
  fn name(&self) -> &str {
    &self.name
  }

  fn output_key(&self) -> Option<&str> {
    Some(keys::APPROVAL_STATUS)
  }

  async fn run(&self, ctx: &mut RunContext) -> Result<StageOutcome, StageError> {
    let decision = self.decide(ctx).await;
    let value = decision.record.map(StageValue::Approval);
    Ok(match decision.outcome {
      GateOutcome::Waiting(request) => StageOutcome::suspend(value, request),
      GateOutcome::Approved | GateOutcome::Rejected { .. } => StageOutcome {
        value,
        flow: StageFlow::Continue,
      },
    })
  }
}
