//! Agent invocation: run the agent command with the prompt on stdin and read stdout.
//! Shared by [CommandCollaborator] and the post-hoc judge.

use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, info, instrument};

use super::stage::Collaborator;
use crate::diagram_validator::strip_code_fence;
use crate::error::StageError;
use crate::types::{OutputKind, StageValue, StateStore};

/// Runs `agent_cmd` (split on whitespace) with `prompt` on stdin and returns stdout.
///
/// The whole exchange is bounded by `limit`; on expiry the child is killed.
#[instrument(level = "trace", skip(agent_cmd, prompt))]
pub(crate) async fn run_agent_command(
  stage: &str,
  agent_cmd: &str,
  prompt: &str,
  limit: Duration,
) -> Result<String, StageError> {
  let parts: Vec<&str> = agent_cmd.split_whitespace().collect();
  let Some((bin, args)) = parts.split_first() else {
    return Err(StageError::collaborator(stage, "agent_cmd is empty"));
  };

  let mut child = Command::new(bin)
    .args(args)
    .stdin(Stdio::piped())
    .stdout(Stdio::piped())
    .stderr(Stdio::inherit())
    .kill_on_drop(true)
    .spawn()
    .map_err(|e| StageError::collaborator(stage, format!("agent spawn: {}", e)))?;

  // Stdin is fed while stdout drains; an agent that answers before it has read
  // the whole prompt would otherwise block on a full pipe.
  let stdin = child.stdin.take();
  let feed = async move {
    if let Some(mut stdin) = stdin {
      let payload = format!("{}\n", prompt);
      if let Err(e) = stdin.write_all(payload.as_bytes()).await {
        debug!(stage, error = %e, "agent closed stdin early");
      }
    }
  };
  let exchange = async move {
    let ((), output) = tokio::join!(feed, child.wait_with_output());
    output
  };

  let output = match tokio::time::timeout(limit, exchange).await {
    Ok(Ok(output)) => output,
    Ok(Err(e)) => return Err(StageError::collaborator(stage, format!("agent wait: {}", e))),
    Err(_) => {
      return Err(StageError::Timeout {
        stage: stage.to_string(),
        seconds: limit.as_secs(),
      });
    }
  };

  if !output.status.success() {
    let msg = output
      .status
      .code()
      .map(|c| format!("agent exit {}", c))
      .unwrap_or_else(|| "agent signal".to_string());
    return Err(StageError::collaborator(stage, msg));
  }
  Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

/// Builds the agent prompt: instruction, then one section per available input key.
///
/// Missing required keys are reported by name; missing optional keys are skipped.
pub(crate) fn render_prompt(
  instruction: &str,
  store: &StateStore,
  required: &[String],
  optional: &[String],
) -> Result<String, String> {
  let mut prompt = instruction.trim_end().to_string();
  for key in required {
    let value = store.get(key).ok_or_else(|| key.clone())?;
    prompt.push_str(&format!("\n\n## {}\n{}", key, value.render()));
  }
  for key in optional {
    if let Some(value) = store.get(key) {
      prompt.push_str(&format!("\n\n## {}\n{}", key, value.render()));
    }
  }
  Ok(prompt)
}

/// A collaborator backed by an external agent command.
pub struct CommandCollaborator {
  name: String,
  output_key: String,
  instruction: String,
  kind: OutputKind,
  agent_cmd: String,
  timeout: Duration,
  required: Vec<String>,
  optional: Vec<String>,
}

impl CommandCollaborator {
  pub fn new(
    name: impl Into<String>,
    output_key: impl Into<String>,
    kind: OutputKind,
    agent_cmd: impl Into<String>,
    instruction: impl Into<String>,
  ) -> Self {
    Self {
      name: name.into(),
      output_key: output_key.into(),
      instruction: instruction.into(),
      kind,
      agent_cmd: agent_cmd.into(),
      timeout: Duration::from_secs(300),
      required: vec![],
      optional: vec![],
    }
  }

  pub fn with_timeout(mut self, timeout: Duration) -> Self {
    self.timeout = timeout;
    self
  }

  /// Adds a key that must be present in the store.
  pub fn reads(mut self, key: impl Into<String>) -> Self {
    self.required.push(key.into());
    self
  }

  /// Adds a key included in the prompt only when present.
  pub fn reads_optional(mut self, key: impl Into<String>) -> Self {
    self.optional.push(key.into());
    self
  }

  pub fn kind(&self) -> OutputKind {
    self.kind
  }

  /// Parses agent stdout. Structured kinds may arrive inside a code fence.
  pub(crate) fn parse_output(&self, raw: &str) -> Result<StageValue, StageError> {
    let body = match self.kind {
      OutputKind::Text => raw,
      _ => strip_code_fence(raw),
    };
    self.kind.parse(body).map_err(|source| StageError::Schema {
      stage: self.name.clone(),
      source,
    })
  }
}

#[async_trait]
impl Collaborator for CommandCollaborator {
  fn name(&self) -> &str {
    &self.name
  }

  fn output_key(&self) -> &str {
    &self.output_key
  }

  async fn execute(&self, store: &StateStore) -> Result<StageValue, StageError> {
    let prompt = render_prompt(&self.instruction, store, &self.required, &self.optional)
      .map_err(|key| StageError::missing_input(&self.name, key))?;
    info!(stage = %self.name, agent_cmd = %self.agent_cmd, prompt_len = prompt.len(), "invoking agent");
    let raw = run_agent_command(&self.name, &self.agent_cmd, &prompt, self.timeout).await?;
    self.parse_output(&raw)
  }
}
