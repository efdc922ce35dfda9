//! End-to-end runs of the standard workflow with in-memory collaborators,
//! a real source file and the filesystem publisher.

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use flowgate::error::StageError;
use flowgate::evaluator::RunJudge;
use flowgate::keys;
use flowgate::stages::{ApprovalChannel, Collaborator, FsPublisher, HALTED_MESSAGE};
use flowgate::types::{
  ApprovalRequest, ApprovalSource, ApprovalStatus, GraphEdge, GraphNode, OverallStatus,
  ProcessAnalysis, ProcessGraph, QualityAssessment, Step,
};
use flowgate::workflow::{initial_values, stage_names};
use flowgate::{
  ApprovalResponse, Collaborators, Pipeline, PipelineConfig, PipelineError, RunMode, RunOptions,
  RunStatus, StageValue, WorkflowResult, run_workflow, standard_pipeline,
};

const DIAGRAM: &str = "```mermaid
flowchart TD
    S([Start])
    T[Review request]
    G{Approved?}
    R[Rework request]
    E([End])
    S --> T
    T --> G
    G -->|yes| E
    G -->|no| R
    R --> T
```";

/// Returns the same value on every call and counts calls.
struct FixedCollaborator {
  name: &'static str,
  key: &'static str,
  value: Result<StageValue, String>,
  calls: AtomicUsize,
}

impl FixedCollaborator {
  fn new(name: &'static str, key: &'static str, value: StageValue) -> Arc<Self> {
    Arc::new(Self {
      name,
      key,
      value: Ok(value),
      calls: AtomicUsize::new(0),
    })
  }

  fn failing(name: &'static str, key: &'static str, message: &str) -> Arc<Self> {
    Arc::new(Self {
      name,
      key,
      value: Err(message.to_string()),
      calls: AtomicUsize::new(0),
    })
  }

  fn calls(&self) -> usize {
    self.calls.load(Ordering::SeqCst)
  }
}

#[async_trait]
impl Collaborator for FixedCollaborator {
  fn name(&self) -> &str {
    self.name
  }

  fn output_key(&self) -> &str {
    self.key
  }

  async fn execute(&self, _store: &flowgate::StateStore) -> Result<StageValue, StageError> {
    self.calls.fetch_add(1, Ordering::SeqCst);
    self
      .value
      .clone()
      .map_err(|m| StageError::collaborator(self.name, m))
  }
}

#[derive(Default)]
struct RecordingChannel {
  requests: Mutex<Vec<ApprovalRequest>>,
}

#[async_trait]
impl ApprovalChannel for RecordingChannel {
  async fn request_confirmation(&self, request: &ApprovalRequest) {
    self.requests.lock().unwrap().push(request.clone());
  }
}

struct FailingJudge;

#[async_trait]
impl RunJudge for FailingJudge {
  async fn judge(&self, _prompt: &str) -> Result<String, StageError> {
    Err(StageError::collaborator("evaluate_run", "judge unreachable"))
  }
}

fn analysis() -> StageValue {
  StageValue::Analysis(ProcessAnalysis {
    actors: vec!["Clerk".to_string()],
    steps: vec![Step {
      id: 1,
      kind: "task".to_string(),
      action: "Review request".to_string(),
      actor: Some("Clerk".to_string()),
      condition: None,
    }],
    dependencies: vec![],
  })
}

fn graph() -> StageValue {
  StageValue::Graph(ProcessGraph {
    nodes: vec![
      GraphNode {
        id: "S".to_string(),
        kind: "start_event".to_string(),
        label: "Start".to_string(),
        actor: None,
      },
      GraphNode {
        id: "T".to_string(),
        kind: "task".to_string(),
        label: "Review request".to_string(),
        actor: Some("Clerk".to_string()),
      },
    ],
    edges: vec![GraphEdge {
      from: "S".to_string(),
      to: "T".to_string(),
      label: None,
    }],
  })
}

fn quality() -> StageValue {
  StageValue::Quality(QualityAssessment {
    reasoning: "complete".to_string(),
    completeness_score: 0.9,
    clarity_score: 0.9,
    reduction_score: 0.9,
    consistency_score: 0.9,
    feedback: String::new(),
    approved: true,
    exit_loop: true,
  })
}

struct Fixture {
  dir: tempfile::TempDir,
  analysis: Arc<FixedCollaborator>,
  generation: Arc<FixedCollaborator>,
  channel: Arc<RecordingChannel>,
}

impl Fixture {
  fn new() -> Self {
    Self::with_analysis(FixedCollaborator::new(
      stage_names::ANALYZE,
      keys::PROCESS_ANALYSIS,
      analysis(),
    ))
  }

  fn with_analysis(analysis: Arc<FixedCollaborator>) -> Self {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
      dir.path().join("onboarding.txt"),
      "The clerk reviews each request. Approved requests end the process; others are reworked.",
    )
    .unwrap();
    Self {
      dir,
      analysis,
      generation: FixedCollaborator::new(
        stage_names::GENERATE,
        keys::CURRENT_DIAGRAM,
        StageValue::Text(DIAGRAM.to_string()),
      ),
      channel: Arc::new(RecordingChannel::default()),
    }
  }

  fn run_dir(&self) -> std::path::PathBuf {
    self.dir.path().join("runs")
  }

  fn output_dir(&self) -> std::path::PathBuf {
    self.dir.path().join("outputs")
  }

  fn source(&self) -> std::path::PathBuf {
    self.dir.path().join("onboarding.txt")
  }

  fn pipeline(&self, config: &PipelineConfig) -> Pipeline {
    let collaborators = Collaborators {
      analysis: self.analysis.clone(),
      conversion: FixedCollaborator::new(stage_names::CONVERT, keys::PROCESS_GRAPH, graph()),
      quality: FixedCollaborator::new(stage_names::ASSESS, keys::QUALITY_ASSESSMENT, quality()),
      generation: self.generation.clone(),
    };
    standard_pipeline(
      config,
      collaborators,
      self.channel.clone(),
      Arc::new(FsPublisher::new(self.output_dir())),
    )
  }

  async fn start(&self, config: &PipelineConfig, session: &str) -> Result<WorkflowResult, PipelineError> {
    self.run(config, start_mode(session, &self.source()), None).await
  }

  async fn run(
    &self,
    config: &PipelineConfig,
    mode: RunMode,
    judge: Option<&dyn RunJudge>,
  ) -> Result<WorkflowResult, PipelineError> {
    let run_dir = self.run_dir();
    run_workflow(
      &self.pipeline(config),
      RunOptions {
        run_dir: &run_dir,
        mode,
        judge,
      },
    )
    .await
  }
}

fn start_mode(session: &str, source: &Path) -> RunMode {
  RunMode::Start {
    session_id: Some(session.to_string()),
    initial: initial_values(source, Some("map the onboarding process")),
  }
}

fn resume_mode(session: &str, response: Option<ApprovalResponse>) -> RunMode {
  RunMode::Resume {
    session_id: session.to_string(),
    response,
  }
}

#[tokio::test]
async fn suspends_for_approval_then_publishes_on_resume() {
  let fx = Fixture::new();
  let config = PipelineConfig::default();

  let first = fx.start(&config, "onb-1").await.unwrap();
  assert!(matches!(first.status, RunStatus::AwaitingApproval { .. }));
  assert_eq!(
    first.completed_stages,
    vec![
      stage_names::EXTRACT,
      stage_names::ANALYZE,
      stage_names::REFINE,
      stage_names::GENERATE,
      stage_names::VALIDATE,
    ]
  );
  assert_eq!(first.store.approval().unwrap().status, ApprovalStatus::Pending);
  assert_eq!(
    first.store.validation().unwrap().overall_status,
    OverallStatus::Valid
  );
  assert!(first.store.get_text(keys::EXTRACTED_TEXT).unwrap().contains("clerk"));
  assert_eq!(fx.channel.requests.lock().unwrap().len(), 1);
  assert!(!fx.output_dir().exists());

  let second = fx
    .run(&config, resume_mode("onb-1", Some(ApprovalResponse::accept())), None)
    .await
    .unwrap();
  assert_eq!(second.status, RunStatus::Completed);
  assert!(second.final_message.starts_with("Published "));
  assert!(second.store.approval().unwrap().is_human_approval());
  assert_eq!(fx.analysis.calls(), 1);
  assert_eq!(fx.generation.calls(), 1);

  let mmd = std::fs::read_to_string(fx.output_dir().join("onboarding.mmd")).unwrap();
  assert!(mmd.starts_with("flowchart TD"));
  assert!(!mmd.contains("```"));
  let report = std::fs::read_to_string(fx.output_dir().join("onboarding_report.md")).unwrap();
  assert!(report.contains("## Validation"));
  assert!(report.contains("APPROVED"));
}

#[tokio::test]
async fn rejection_halts_publication() {
  let fx = Fixture::new();
  let config = PipelineConfig::default();
  fx.start(&config, "onb-2").await.unwrap();

  let result = fx
    .run(
      &config,
      resume_mode("onb-2", Some(ApprovalResponse::decline(Some("missing escalation".into())))),
      None,
    )
    .await
    .unwrap();
  assert_eq!(result.status, RunStatus::Completed);
  assert_eq!(result.final_message, HALTED_MESSAGE);
  assert_eq!(result.store.approval().unwrap().status, ApprovalStatus::Rejected);
  assert!(!fx.output_dir().join("onboarding.mmd").exists());
}

#[tokio::test]
async fn collaborator_failure_aborts_the_run() {
  let fx = Fixture::with_analysis(FixedCollaborator::failing(
    stage_names::ANALYZE,
    keys::PROCESS_ANALYSIS,
    "model unavailable",
  ));
  let err = fx.start(&PipelineConfig::default(), "onb-3").await.unwrap_err();
  assert!(
    matches!(err, PipelineError::StageFailed { ref stage, .. } if stage == stage_names::ANALYZE)
  );
  assert_eq!(fx.generation.calls(), 0);
  assert!(!fx.output_dir().exists());
}

#[tokio::test]
async fn non_interactive_runs_straight_through() {
  let fx = Fixture::new();
  let config = PipelineConfig {
    non_interactive: true,
    ..PipelineConfig::default()
  };
  let result = fx.start(&config, "onb-4").await.unwrap();
  assert_eq!(result.status, RunStatus::Completed);
  let record = result.store.approval().unwrap();
  assert_eq!(record.status, ApprovalStatus::Approved);
  assert_eq!(record.source, Some(ApprovalSource::Unattended));
  assert!(fx.channel.requests.lock().unwrap().is_empty());
  assert!(fx.output_dir().join("onboarding.mmd").exists());
}

#[tokio::test]
async fn unattended_approval_is_refused_when_a_person_must_sign_off() {
  let fx = Fixture::new();
  let config = PipelineConfig {
    non_interactive: true,
    require_human_approval: true,
    ..PipelineConfig::default()
  };
  let result = fx.start(&config, "onb-5").await.unwrap();
  assert_eq!(result.status, RunStatus::Completed);
  assert_eq!(result.final_message, HALTED_MESSAGE);
  assert!(!fx.output_dir().join("onboarding.mmd").exists());
}

#[tokio::test]
async fn judge_failure_leaves_the_result_intact() {
  let fx = Fixture::new();
  let config = PipelineConfig {
    non_interactive: true,
    ..PipelineConfig::default()
  };
  let judge = FailingJudge;
  let result = fx
    .run(&config, start_mode("onb-6", &fx.source()), Some(&judge))
    .await
    .unwrap();
  assert_eq!(result.status, RunStatus::Completed);
  assert!(result.final_message.starts_with("Published "));
  assert_eq!(result.evaluation.unwrap().score_display(), "N/A");
}
