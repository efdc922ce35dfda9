//! Publication behind the approval check.
//!
//! [PublicationStage] re-reads the approval record on every run and only then
//! calls its [Publisher]. Anything other than an approved record produces the
//! halted message and no side effect.

use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{info, instrument, warn};

use super::stage::{RunContext, Stage, StageOutcome};
use crate::diagram_validator::strip_code_fence;
use crate::error::StageError;
use crate::keys;
use crate::types::{ApprovalRecord, ApprovalStatus, StageValue, StateStore};

/// Message stored when publication is refused.
pub const HALTED_MESSAGE: &str = "Publication halted: approval pending or rejected.";

/// File stem used when the source path has none.
pub const DEFAULT_STEM: &str = "diagram";

/// Persists an approved run.
#[async_trait]
pub trait Publisher: Send + Sync {
  /// Returns a human-readable summary of what was written.
  async fn publish(&self, store: &StateStore) -> Result<String, StageError>;
}

/// True when the record allows publishing under the given policy.
pub fn publication_permitted(record: Option<&ApprovalRecord>, require_human: bool) -> bool {
  match record {
    Some(r) if r.status == ApprovalStatus::Approved => !require_human || r.is_human_approval(),
    _ => false,
  }
}

pub struct PublicationStage {
  name: String,
  publisher: Arc<dyn Publisher>,
  require_human_approval: bool,
}

impl PublicationStage {
  pub fn new(name: impl Into<String>, publisher: Arc<dyn Publisher>) -> Self {
    Self {
      name: name.into(),
      publisher,
      require_human_approval: false,
    }
  }

  /// Refuse approvals that were not given by a person.
  pub fn require_human_approval(mut self, required: bool) -> Self {
    self.require_human_approval = required;
    self
  }
}

#[async_trait]
impl Stage for PublicationStage {
  fn name(&self) -> &str {
    &self.name
  }

  fn output_key(&self) -> Option<&str> {
    Some(keys::PUBLICATION_RESULT)
  }

  #[instrument(level = "trace", skip(self, ctx))]
  async fn run(&self, ctx: &mut RunContext) -> Result<StageOutcome, StageError> {
    let record = ctx.store.approval();
    if !publication_permitted(record, self.require_human_approval) {
      info!(
        stage = %self.name,
        status = ?record.map(|r| r.status),
        source = ?record.and_then(|r| r.source),
        "publication halted"
      );
      return Ok(StageOutcome::output(StageValue::Text(
        HALTED_MESSAGE.to_string(),
      )));
    }
    let message = self.publisher.publish(&ctx.store).await?;
    info!(stage = %self.name, %message, "published");
    Ok(StageOutcome::output(StageValue::Text(message)))
  }
}

/// Writes the diagram source and a markdown report, and optionally renders an SVG.
pub struct FsPublisher {
  output_dir: PathBuf,
  renderer_cmd: Option<String>,
  render_timeout: Duration,
}

impl FsPublisher {
  pub fn new(output_dir: impl Into<PathBuf>) -> Self {
    Self {
      output_dir: output_dir.into(),
      renderer_cmd: None,
      render_timeout: Duration::from_secs(30),
    }
  }

  pub fn with_renderer(mut self, renderer_cmd: Option<String>, timeout: Duration) -> Self {
    self.renderer_cmd = renderer_cmd;
    self.render_timeout = timeout;
    self
  }

  /// Runs `<renderer> -i <mmd> -o <svg> -t default -b transparent`.
  async fn render(&self, renderer: &str, mmd: &Path, svg: &Path) -> Result<(), String> {
    let child = Command::new(renderer)
      .arg("-i")
      .arg(mmd)
      .arg("-o")
      .arg(svg)
      .args(["-t", "default", "-b", "transparent"])
      .kill_on_drop(true)
      .output();
    match tokio::time::timeout(self.render_timeout, child).await {
      Ok(Ok(out)) if out.status.success() => Ok(()),
      Ok(Ok(out)) => Err(format!(
        "renderer exited with {}: {}",
        out.status,
        String::from_utf8_lossy(&out.stderr).trim()
      )),
      Ok(Err(e)) => Err(format!("renderer failed to start: {}", e)),
      Err(_) => Err(format!(
        "renderer timed out after {}s",
        self.render_timeout.as_secs()
      )),
    }
  }
}

/// File stem derived from `source_path`, or [DEFAULT_STEM].
pub fn output_stem(store: &StateStore) -> String {
  store
    .get_text(keys::SOURCE_PATH)
    .and_then(|p| Path::new(p).file_stem())
    .and_then(|s| s.to_str())
    .filter(|s| !s.is_empty())
    .unwrap_or(DEFAULT_STEM)
    .to_string()
}

/// Markdown report: validation findings, quality scores and the diagram source.
pub fn build_report(store: &StateStore, diagram: &str) -> String {
  let mut out = String::from("# Process Diagram Report\n\n");
  let _ = writeln!(out, "Session: {}\n", store.session_id);

  out.push_str("## Validation\n\n");
  match store.validation() {
    Some(report) => {
      let _ = writeln!(out, "- Status: {}", report.overall_status);
      let _ = writeln!(out, "- Defined nodes: {}", report.stats.defined_nodes);
      let _ = writeln!(out, "- Gateways: {}", report.stats.gateways);
      for e in &report.errors {
        let _ = writeln!(out, "- Error: {}", e);
      }
      for w in &report.warnings {
        let _ = writeln!(out, "- Warning: {}", w);
      }
    }
    None => out.push_str("- Not validated\n"),
  }

  if let Some(StageValue::Quality(q)) = store.get(keys::QUALITY_ASSESSMENT) {
    out.push_str("\n## Quality\n\n");
    let _ = writeln!(out, "- Completeness: {:.2}", q.completeness_score);
    let _ = writeln!(out, "- Clarity: {:.2}", q.clarity_score);
    let _ = writeln!(out, "- Reduction: {:.2}", q.reduction_score);
    let _ = writeln!(out, "- Consistency: {:.2}", q.consistency_score);
    let _ = writeln!(out, "- Approved by reviewer: {}", q.approved);
    if !q.feedback.is_empty() {
      let _ = writeln!(out, "\n{}", q.feedback);
    }
  }

  if let Some(record) = store.approval() {
    out.push_str("\n## Approval\n\n");
    let _ = writeln!(out, "- Status: {}", record.status);
    if let Some(source) = record.source {
      let _ = writeln!(out, "- Source: {:?}", source);
    }
  }

  let _ = write!(out, "\n## Diagram\n\n```mermaid\n{}\n```\n", diagram);
  out
}

#[async_trait]
impl Publisher for FsPublisher {
  async fn publish(&self, store: &StateStore) -> Result<String, StageError> {
    let diagram = store
      .get_text(keys::CURRENT_DIAGRAM)
      .map(strip_code_fence)
      .ok_or_else(|| StageError::missing_input("publish", keys::CURRENT_DIAGRAM))?;
    let stem = output_stem(store);
    tokio::fs::create_dir_all(&self.output_dir).await?;

    let mmd = self.output_dir.join(format!("{}.mmd", stem));
    let report = self.output_dir.join(format!("{}_report.md", stem));
    tokio::fs::write(&mmd, format!("{}\n", diagram)).await?;
    tokio::fs::write(&report, build_report(store, diagram)).await?;

    let mut message = format!(
      "Published {} and {}",
      mmd.display(),
      report.display()
    );
    if let Some(renderer) = &self.renderer_cmd {
      let svg = self.output_dir.join(format!("{}.svg", stem));
      match self.render(renderer, &mmd, &svg).await {
        Ok(()) => {
          let _ = write!(message, "; rendered {}", svg.display());
        }
        Err(e) => {
          warn!(error = %e, "diagram rendering failed");
          let _ = write!(message, "; rendering failed: {}", e);
        }
      }
    }
    Ok(message)
  }
}
