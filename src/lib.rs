//! # flowgate
//!
//! Staged pipeline that turns a plain-text process description into a
//! validated flowchart diagram, gated by a human approval step.
//!
//! ## Architecture
//!
//! A [Pipeline] runs [stages::Stage]s strictly in order over a shared
//! [types::StateStore]:
//!
//! extract text → analyze → refine (convert ⇄ assess) → generate → validate → approval → publish
//!
//! Content is produced by [stages::Collaborator]s (an external agent command by
//! default). The approval gate suspends the run and a checkpoint is written;
//! [run_workflow] resumes it once the actor answers. Completed runs are scored
//! by an optional post-hoc evaluator whose failures never affect the result.

pub mod checkpoint_io;
pub mod config;
pub mod diagram_validator;
pub mod error;
pub mod evaluator;
pub mod execution_log_io;
pub mod keys;
pub mod pipeline;
pub mod prompts;
pub mod repair;
pub mod runner;
pub mod stages;
pub mod types;
pub mod workflow;

pub use config::PipelineConfig;
pub use diagram_validator::validate_diagram;
pub use error::{PipelineError, StageError};
pub use pipeline::{Pipeline, PipelineRun};
pub use runner::{RunMode, RunOptions, WorkflowResult, run_workflow};
pub use types::{ApprovalResponse, RunStatus, StageValue, StateStore, ValidationReport};
pub use workflow::{Collaborators, standard_pipeline};
