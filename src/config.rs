//! Pipeline configuration: defaults, then environment overrides.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::ConfigError;
use crate::stages::{
  DEFAULT_APPROVAL_THRESHOLD, DEFAULT_MAX_ITERATIONS, DEFAULT_MAX_PAGES, DEFAULT_PREVIEW_CHARS,
};

pub const ENV_MAX_ITERATIONS: &str = "FLOWGATE_MAX_ITERATIONS";
pub const ENV_MIN_QUALITY_SCORE: &str = "FLOWGATE_MIN_QUALITY_SCORE";
pub const ENV_NON_INTERACTIVE: &str = "FLOWGATE_NON_INTERACTIVE";
/// Legacy switch for headless runs; only `true` has an effect.
pub const ENV_CLI_MODE: &str = "CLI_MODE";
pub const ENV_REQUIRE_HUMAN_APPROVAL: &str = "FLOWGATE_REQUIRE_HUMAN_APPROVAL";
pub const ENV_RUN_DIR: &str = "FLOWGATE_RUN_DIR";
pub const ENV_OUTPUT_DIR: &str = "FLOWGATE_OUTPUT_DIR";
pub const ENV_AGENT_CMD: &str = "FLOWGATE_AGENT_CMD";
pub const ENV_AGENT_TIMEOUT_SECS: &str = "FLOWGATE_AGENT_TIMEOUT_SECS";
pub const ENV_RENDERER: &str = "FLOWGATE_RENDERER";
pub const ENV_PDF_MAX_PAGES: &str = "FLOWGATE_PDF_MAX_PAGES";

/// Default directory for checkpoints and execution logs.
pub const DEFAULT_RUN_DIR: &str = ".flowgate";
/// Default directory for published artifacts.
pub const DEFAULT_OUTPUT_DIR: &str = "outputs";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
  /// Refinement loop budget (at least 1).
  pub max_quality_iterations: usize,
  /// Threshold the quality evaluator is told to apply.
  pub min_quality_score: f64,
  /// Auto-approve at the gate instead of suspending.
  pub non_interactive: bool,
  /// Refuse to publish on an unattended approval.
  pub require_human_approval: bool,
  pub preview_chars: usize,
  pub run_dir: PathBuf,
  pub output_dir: PathBuf,
  pub agent_cmd: Option<String>,
  pub agent_timeout_secs: u64,
  /// External diagram renderer, e.g. `mmdc`. Rendering is skipped when unset.
  pub renderer_cmd: Option<String>,
  pub render_timeout_secs: u64,
  /// PDF sources with more pages fail the extraction stage.
  pub pdf_max_pages: usize,
}

impl Default for PipelineConfig {
  fn default() -> Self {
    Self {
      max_quality_iterations: DEFAULT_MAX_ITERATIONS,
      min_quality_score: DEFAULT_APPROVAL_THRESHOLD,
      non_interactive: false,
      require_human_approval: false,
      preview_chars: DEFAULT_PREVIEW_CHARS,
      run_dir: PathBuf::from(DEFAULT_RUN_DIR),
      output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
      agent_cmd: None,
      agent_timeout_secs: 300,
      renderer_cmd: None,
      render_timeout_secs: 30,
      pdf_max_pages: DEFAULT_MAX_PAGES,
    }
  }
}

fn parse_bool(key: &str, raw: &str) -> Result<bool, ConfigError> {
  match raw.trim().to_ascii_lowercase().as_str() {
    "1" | "true" | "yes" | "on" => Ok(true),
    "0" | "false" | "no" | "off" => Ok(false),
    _ => Err(invalid(key, raw)),
  }
}

fn invalid(key: &str, raw: &str) -> ConfigError {
  ConfigError::InvalidValue {
    key: key.to_string(),
    value: raw.to_string(),
  }
}

impl PipelineConfig {
  /// Defaults with overrides from the process environment.
  pub fn from_env() -> Result<Self, ConfigError> {
    let mut config = Self::default();
    config.apply_env(|key| std::env::var(key).ok())?;
    Ok(config)
  }

  /// Applies overrides read through `lookup`. Empty values count as unset.
  pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
  where
    F: Fn(&str) -> Option<String>,
  {
    let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

    if let Some(raw) = get(ENV_MAX_ITERATIONS) {
      let n: usize = raw
        .trim()
        .parse()
        .map_err(|_| invalid(ENV_MAX_ITERATIONS, &raw))?;
      if n == 0 {
        return Err(ConfigError::ZeroIterations {
          key: ENV_MAX_ITERATIONS.to_string(),
        });
      }
      self.max_quality_iterations = n;
    }
    if let Some(raw) = get(ENV_MIN_QUALITY_SCORE) {
      let score: f64 = raw
        .trim()
        .parse()
        .map_err(|_| invalid(ENV_MIN_QUALITY_SCORE, &raw))?;
      if !(0.0..=1.0).contains(&score) {
        return Err(invalid(ENV_MIN_QUALITY_SCORE, &raw));
      }
      self.min_quality_score = score;
    }
    if get(ENV_CLI_MODE).is_some_and(|raw| raw.trim().eq_ignore_ascii_case("true")) {
      self.non_interactive = true;
    }
    if let Some(raw) = get(ENV_NON_INTERACTIVE) {
      self.non_interactive = parse_bool(ENV_NON_INTERACTIVE, &raw)?;
    }
    if let Some(raw) = get(ENV_REQUIRE_HUMAN_APPROVAL) {
      self.require_human_approval = parse_bool(ENV_REQUIRE_HUMAN_APPROVAL, &raw)?;
    }
    if let Some(raw) = get(ENV_RUN_DIR) {
      self.run_dir = PathBuf::from(raw);
    }
    if let Some(raw) = get(ENV_OUTPUT_DIR) {
      self.output_dir = PathBuf::from(raw);
    }
    if let Some(raw) = get(ENV_AGENT_CMD) {
      self.agent_cmd = Some(raw);
    }
    if let Some(raw) = get(ENV_AGENT_TIMEOUT_SECS) {
      self.agent_timeout_secs = raw
        .trim()
        .parse()
        .map_err(|_| invalid(ENV_AGENT_TIMEOUT_SECS, &raw))?;
    }
    if let Some(raw) = get(ENV_RENDERER) {
      self.renderer_cmd = Some(raw);
    }
    if let Some(raw) = get(ENV_PDF_MAX_PAGES) {
      let pages: usize = raw
        .trim()
        .parse()
        .map_err(|_| invalid(ENV_PDF_MAX_PAGES, &raw))?;
      if pages == 0 {
        return Err(invalid(ENV_PDF_MAX_PAGES, &raw));
      }
      self.pdf_max_pages = pages;
    }
    debug!(config = ?self, "configuration resolved");
    Ok(())
  }

  pub fn agent_timeout(&self) -> Duration {
    Duration::from_secs(self.agent_timeout_secs)
  }

  pub fn render_timeout(&self) -> Duration {
    Duration::from_secs(self.render_timeout_secs)
  }
}
