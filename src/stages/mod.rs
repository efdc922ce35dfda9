//! Pipeline stages.
//!
//! - [Stage] / [Collaborator]: the seams.
//! - [CollaboratorStage], [CommandCollaborator]: content producers.
//! - [SourceTextStage], [ValidationStage]: built-in steps.
//! - [RefinementLoop], [ApprovalGate], [PublicationStage]: stages with their own control logic.

mod approval_gate;
#[cfg(test)]
mod approval_gate_test;
mod collaborator_stage;
#[cfg(test)]
mod collaborator_stage_test;
mod command_collaborator;
mod publication;
mod refinement_loop;
mod source_text;
mod stage;
#[cfg(test)]
pub(crate) mod test_support;
mod validation_stage;

pub use approval_gate::{
  APPROVAL_HINT, ApprovalChannel, ApprovalGate, DEFAULT_PREVIEW_CHARS, GateDecision, GateOutcome,
  LogApprovalChannel,
};
pub use collaborator_stage::CollaboratorStage;
pub use command_collaborator::CommandCollaborator;
pub(crate) use command_collaborator::run_agent_command;
pub use publication::{
  DEFAULT_STEM, FsPublisher, HALTED_MESSAGE, PublicationStage, Publisher, build_report,
  output_stem, publication_permitted,
};
pub use refinement_loop::{
  DEFAULT_APPROVAL_THRESHOLD, DEFAULT_MAX_ITERATIONS, LoopExit, RefinementLoop,
};
pub use source_text::{DEFAULT_MAX_PAGES, SourceTextStage, is_pdf};
pub(crate) use stage::apply_stage_output;
pub use stage::{Collaborator, RunContext, Stage, StageFlow, StageOutcome};
pub use validation_stage::ValidationStage;
