//! CLI: Turn a process description into a validated flowchart diagram.
//!
//! A new run stops at the approval gate unless `--non-interactive` (or
//! `CLI_MODE=true`) is set. Answer it with `--resume <ID> --approve` or
//! `--resume <ID> --reject --reason "..."`.
//!
//! Usage: `run_pipeline [OPTIONS] <path-to-description>`
//!
//! Set RUST_LOG=flowgate=trace for TRACE-level span enter/exit and events.

use std::path::PathBuf;
use std::process;
use std::sync::Arc;

use clap::Parser;
use flowgate::evaluator::{CommandJudge, RunJudge};
use flowgate::stages::{FsPublisher, LogApprovalChannel};
use flowgate::workflow::initial_values;
use flowgate::{
  ApprovalResponse, Collaborators, PipelineConfig, RunMode, RunOptions, RunStatus,
  WorkflowResult, run_workflow, standard_pipeline,
};
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt::format::FmtSpan};

/// Turn a process description into a validated flowchart diagram.
#[derive(Parser, Debug)]
#[command(name = "run_pipeline")]
#[command(
  after_help = r#"Environment variables (override the matching flags when set):
  FLOWGATE_AGENT_CMD               Agent command; receives the prompt on stdin, replies on stdout.
  FLOWGATE_MAX_ITERATIONS          Refinement loop budget (default 2).
  FLOWGATE_MIN_QUALITY_SCORE       Quality threshold given to the evaluator (default 0.85).
  FLOWGATE_NON_INTERACTIVE         Auto-approve at the gate (CLI_MODE=true does the same).
  FLOWGATE_REQUIRE_HUMAN_APPROVAL  Refuse to publish on an unattended approval.
  FLOWGATE_RUN_DIR                 Checkpoints and execution logs (default .flowgate).
  FLOWGATE_OUTPUT_DIR              Published artifacts (default outputs).
  FLOWGATE_RENDERER                Diagram renderer, e.g. mmdc. Rendering is skipped when unset.
  FLOWGATE_PDF_MAX_PAGES           Page limit for PDF input (default 50).

Examples:
  run_pipeline --agent-cmd "my-agent --print" docs/onboarding.pdf
  run_pipeline --resume 3f1c... --approve
  run_pipeline --resume 3f1c... --reject --reason "missing escalation path""#
)]
struct Args {
  /// Agent command for the collaborators and the evaluator. Overridden by FLOWGATE_AGENT_CMD if set.
  #[arg(long, value_name = "CMD")]
  agent_cmd: Option<String>,

  /// Auto-approve at the gate instead of suspending.
  #[arg(long)]
  non_interactive: bool,

  /// Session id for a new run (default: random UUID).
  #[arg(long, value_name = "ID", conflicts_with = "resume")]
  session: Option<String>,

  /// Resume a checkpointed session.
  #[arg(long, value_name = "ID")]
  resume: Option<String>,

  /// Approve the pending diagram (with --resume).
  #[arg(long, requires = "resume", conflicts_with = "reject")]
  approve: bool,

  /// Reject the pending diagram (with --resume).
  #[arg(long, requires = "resume")]
  reject: bool,

  /// Reason recorded with --reject.
  #[arg(long, requires = "reject")]
  reason: Option<String>,

  /// Free-text request passed to the analysis step.
  #[arg(long, value_name = "TEXT")]
  query: Option<String>,

  /// Directory for checkpoints and execution logs.
  #[arg(long, value_name = "DIR")]
  run_dir: Option<PathBuf>,

  /// Directory for published artifacts.
  #[arg(long, value_name = "DIR")]
  output_dir: Option<PathBuf>,

  /// Path to the process description (.pdf or plain text)
  #[arg(value_name = "path-to-description", required_unless_present = "resume")]
  input: Option<PathBuf>,
}

fn print_result(r: &WorkflowResult) {
  match &r.status {
    RunStatus::Completed => println!("Pipeline completed."),
    RunStatus::AwaitingApproval { request } => {
      println!("Pipeline suspended.");
      println!("  Diagram preview:\n{}", request.payload.preview);
    }
  }
  println!("  Session: {}", r.session_id);
  println!("  Status: {}", r.status);
  println!("  Completed stages: {:?}", r.completed_stages);
  if let Some(record) = r.store.approval() {
    println!("  Approval: {}", record.status);
  }
  if let Some(report) = r.store.validation() {
    println!("  Validation: {}", report.overall_status);
  }
  println!("  {}", r.final_message);
  if let Some(evaluation) = &r.evaluation {
    println!("  Evaluation score: {}", evaluation.score_display());
  }
}

#[tokio::main]
async fn main() {
  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
    .with_span_events(FmtSpan::ENTER | FmtSpan::EXIT)
    .init();

  info!("run_pipeline starting");
  let args = Args::parse();

  // Flags first, then env vars override them.
  let mut config = PipelineConfig {
    non_interactive: args.non_interactive,
    agent_cmd: args.agent_cmd.clone(),
    ..PipelineConfig::default()
  };
  if let Some(dir) = &args.run_dir {
    config.run_dir = dir.clone();
  }
  if let Some(dir) = &args.output_dir {
    config.output_dir = dir.clone();
  }
  if let Err(e) = config.apply_env(|key| std::env::var(key).ok()) {
    eprintln!("Configuration error: {}", e);
    process::exit(1);
  }
  info!(agent_cmd = ?config.agent_cmd, run_dir = %config.run_dir.display(), output_dir = %config.output_dir.display(), "options (env or flags)");

  let agent_cmd = config.agent_cmd.clone().unwrap_or_default();
  let publisher = FsPublisher::new(&config.output_dir)
    .with_renderer(config.renderer_cmd.clone(), config.render_timeout());
  let pipeline = standard_pipeline(
    &config,
    Collaborators::from_agent(&agent_cmd, &config),
    Arc::new(LogApprovalChannel),
    Arc::new(publisher),
  );
  let judge = config
    .agent_cmd
    .as_ref()
    .map(|cmd| CommandJudge::new(cmd.clone(), config.agent_timeout()));

  let mode = match (&args.resume, &args.input) {
    (Some(id), _) => RunMode::Resume {
      session_id: id.clone(),
      response: if args.approve {
        Some(ApprovalResponse::accept())
      } else if args.reject {
        Some(ApprovalResponse::decline(args.reason.clone()))
      } else {
        None
      },
    },
    (None, Some(input)) => RunMode::Start {
      session_id: args.session.clone(),
      initial: initial_values(input, args.query.as_deref()),
    },
    (None, None) => {
      eprintln!("Either a description path or --resume is required");
      process::exit(1);
    }
  };

  let options = RunOptions {
    run_dir: config.run_dir.as_path(),
    mode,
    judge: judge.as_ref().map(|j| j as &dyn RunJudge),
  };

  let r = match run_workflow(&pipeline, options).await {
    Ok(res) => res,
    Err(e) => {
      eprintln!("Pipeline error: {}", e);
      process::exit(1);
    }
  };

  info!(session = %r.session_id, status = %r.status, stages = ?r.completed_stages, "pipeline finished");
  print_result(&r);
}
