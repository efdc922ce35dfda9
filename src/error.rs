//! Error types for stages, the pipeline and configuration.
//!
//! Only [PipelineError::StageFailed] ends a run. Validation findings, repair
//! failures, approval waiting and post-hoc evaluation failures are carried as
//! data instead.

use thiserror::Error;

/// A structured collaborator payload did not conform to its schema.
#[derive(Debug, Error)]
pub enum SchemaError {
  #[error("malformed payload: {0}")]
  Malformed(#[from] serde_json::Error),

  #[error("field '{field}' out of range [0, 1]: {value}")]
  OutOfRange { field: String, value: f64 },

  #[error("expected {expected} payload, got {found}")]
  UnexpectedKind {
    expected: &'static str,
    found: &'static str,
  },
}

/// Failure of a single stage.
#[derive(Debug, Error)]
pub enum StageError {
  #[error("stage '{stage}' failed: {message}")]
  Collaborator { stage: String, message: String },

  #[error("stage '{stage}' returned a non-conforming payload: {source}")]
  Schema {
    stage: String,
    #[source]
    source: SchemaError,
  },

  #[error("stage '{stage}' timed out after {seconds}s")]
  Timeout { stage: String, seconds: u64 },

  #[error("stage '{stage}' is missing input '{key}'")]
  MissingInput { stage: String, key: String },

  #[error(transparent)]
  Io(#[from] std::io::Error),
}

impl StageError {
  pub fn collaborator(stage: impl Into<String>, message: impl Into<String>) -> Self {
    StageError::Collaborator {
      stage: stage.into(),
      message: message.into(),
    }
  }

  pub fn missing_input(stage: impl Into<String>, key: impl Into<String>) -> Self {
    StageError::MissingInput {
      stage: stage.into(),
      key: key.into(),
    }
  }
}

/// Run-level failure surfaced to the caller of a pipeline.
#[derive(Debug, Error)]
pub enum PipelineError {
  #[error("pipeline aborted at stage '{stage}': {source}")]
  StageFailed {
    stage: String,
    #[source]
    source: StageError,
  },

  #[error("checkpoint: {0}")]
  Checkpoint(#[from] std::io::Error),

  #[error("checkpoint points at stage {index} but the pipeline has {len} stages")]
  UnknownStage { index: usize, len: usize },

  #[error("session {0} already completed; nothing to resume")]
  ResumeCompleted(String),
}

/// Invalid configuration override.
#[derive(Debug, Error)]
pub enum ConfigError {
  #[error("invalid value for {key}: '{value}'")]
  InvalidValue { key: String, value: String },

  #[error("{key} must be at least 1")]
  ZeroIterations { key: String },
}
