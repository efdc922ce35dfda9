//! The standard diagram workflow:
//!
//! extract text → analyze → refine (convert ⇄ assess) → generate → validate → approval → publish

use std::path::Path;
use std::sync::Arc;

use crate::config::PipelineConfig;
use crate::keys;
use crate::pipeline::Pipeline;
use crate::prompts;
use crate::stages::{
  ApprovalChannel, ApprovalGate, Collaborator, CollaboratorStage, CommandCollaborator,
  PublicationStage, Publisher, RefinementLoop, SourceTextStage, ValidationStage,
};
use crate::types::{OutputKind, StageValue};

/// Stage names of the standard workflow.
pub mod stage_names {
  pub const EXTRACT: &str = "extract_text";
  pub const ANALYZE: &str = "analyze_process";
  pub const REFINE: &str = "refine_graph";
  pub const CONVERT: &str = "convert_graph";
  pub const ASSESS: &str = "assess_quality";
  pub const GENERATE: &str = "generate_diagram";
  pub const VALIDATE: &str = "validate_diagram";
  pub const APPROVAL: &str = "approval";
  pub const PUBLISH: &str = "publish";
}

/// The four content producers the workflow delegates to.
pub struct Collaborators {
  pub analysis: Arc<dyn Collaborator>,
  pub conversion: Arc<dyn Collaborator>,
  pub quality: Arc<dyn Collaborator>,
  pub generation: Arc<dyn Collaborator>,
}

impl Collaborators {
  /// All four backed by the same agent command.
  pub fn from_agent(agent_cmd: &str, config: &PipelineConfig) -> Self {
    let timeout = config.agent_timeout();
    let analysis = CommandCollaborator::new(
      stage_names::ANALYZE,
      keys::PROCESS_ANALYSIS,
      OutputKind::Analysis,
      agent_cmd,
      prompts::ANALYSIS_INSTRUCTION,
    )
    .reads(keys::EXTRACTED_TEXT)
    .reads_optional(keys::USER_QUERY)
    .with_timeout(timeout);
    let conversion = CommandCollaborator::new(
      stage_names::CONVERT,
      keys::PROCESS_GRAPH,
      OutputKind::Graph,
      agent_cmd,
      prompts::CONVERSION_INSTRUCTION,
    )
    .reads(keys::PROCESS_ANALYSIS)
    .reads_optional(keys::PROCESS_GRAPH)
    .reads_optional(keys::QUALITY_ASSESSMENT)
    .with_timeout(timeout);
    let quality = CommandCollaborator::new(
      stage_names::ASSESS,
      keys::QUALITY_ASSESSMENT,
      OutputKind::Quality,
      agent_cmd,
      prompts::quality_instruction(config.min_quality_score),
    )
    .reads(keys::PROCESS_ANALYSIS)
    .reads(keys::PROCESS_GRAPH)
    .with_timeout(timeout);
    let generation = CommandCollaborator::new(
      stage_names::GENERATE,
      keys::CURRENT_DIAGRAM,
      OutputKind::Text,
      agent_cmd,
      prompts::GENERATION_INSTRUCTION,
    )
    .reads(keys::PROCESS_GRAPH)
    .with_timeout(timeout);
    Self {
      analysis: Arc::new(analysis),
      conversion: Arc::new(conversion),
      quality: Arc::new(quality),
      generation: Arc::new(generation),
    }
  }
}

/// Builds the standard pipeline from configuration and collaborators.
pub fn standard_pipeline(
  config: &PipelineConfig,
  collaborators: Collaborators,
  channel: Arc<dyn ApprovalChannel>,
  publisher: Arc<dyn Publisher>,
) -> Pipeline {
  let refine = RefinementLoop::new(
    stage_names::REFINE,
    Box::new(CollaboratorStage::new(
      collaborators.conversion,
      OutputKind::Graph,
    )),
    Box::new(CollaboratorStage::new(
      collaborators.quality,
      OutputKind::Quality,
    )),
    config.max_quality_iterations,
  )
  .with_approval_threshold(config.min_quality_score);

  Pipeline::new()
    .stage(SourceTextStage::new(stage_names::EXTRACT).max_pages(config.pdf_max_pages))
    .stage(CollaboratorStage::new(
      collaborators.analysis,
      OutputKind::Analysis,
    ))
    .stage(refine)
    .stage(CollaboratorStage::new(
      collaborators.generation,
      OutputKind::Text,
    ))
    .stage(ValidationStage::new(stage_names::VALIDATE))
    .stage(
      ApprovalGate::new(stage_names::APPROVAL, channel)
        .non_interactive(config.non_interactive)
        .preview_chars(config.preview_chars),
    )
    .stage(
      PublicationStage::new(stage_names::PUBLISH, publisher)
        .require_human_approval(config.require_human_approval),
    )
}

/// Store values a new run starts from.
pub fn initial_values(source_path: &Path, user_query: Option<&str>) -> Vec<(String, StageValue)> {
  let mut values = vec![(
    keys::SOURCE_PATH.to_string(),
    StageValue::Text(source_path.display().to_string()),
  )];
  if let Some(query) = user_query {
    values.push((keys::USER_QUERY.to_string(), StageValue::Text(query.to_string())));
  }
  values
}
