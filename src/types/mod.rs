//! Data types flowing through the pipeline: the shared store and its values,
//! approval exchange types, validation reports, checkpoints and execution logs.

mod approval;
mod checkpoint;
mod execution_log;
mod payloads;
#[cfg(test)]
mod payloads_test;
mod run_status;
mod stage_value;
mod state_store;
mod validation_report;

pub use approval::{
  ApprovalPayload, ApprovalRecord, ApprovalRequest, ApprovalResponse, ApprovalSource,
  ApprovalStatus, bounded_preview,
};
pub use checkpoint::Checkpoint;
pub use execution_log::{ExecutionLog, StageLogEntry, StageRunStatus};
pub use payloads::{
  Dependency, GraphEdge, GraphNode, ProcessAnalysis, ProcessGraph, QualityAssessment, Step,
};
pub use run_status::RunStatus;
pub use stage_value::{OutputKind, StageValue};
pub use state_store::StateStore;
pub use validation_report::{OverallStatus, ValidationReport, ValidationStats};
