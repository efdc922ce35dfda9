//! Static validation of flowchart source (lint rules over the node/edge graph).
//!
//! Grammar subset relied upon:
//!
//! - a leading declaration line starting with `flowchart`;
//! - node definitions `ID[...]` (task), `ID(...)` / `ID([...])` (rounded, terminal)
//!   and `ID{...}` / `ID{{...}}` (decision);
//! - edges `ID --> ID` and `ID -->|label| ID`, possibly chained.
//!
//! [validate_diagram] is pure and total: malformed input is reported, never raised.

use std::collections::{BTreeMap, BTreeSet};

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, instrument};

use crate::types::{ValidationReport, ValidationStats};

/// Required prefix of the first non-empty line.
pub const DECLARATION_PREFIX: &str = "flowchart";

/// Characters that break the renderer outside of labels.
const RISKY_CHARS: [char; 4] = ['"', '\'', ';', '|'];

static NODE_DEF: Lazy<Regex> =
  Lazy::new(|| Regex::new(r"^(\w+)[\[\(\{]").expect("NODE_DEF regex should compile"));

static EDGE: Lazy<Regex> = Lazy::new(|| {
  Regex::new(r"(\w+)\s*-->\s*(?:\|[^|]*\|\s*)?(\w+)").expect("EDGE regex should compile")
});

static TERMINAL_DEF: Lazy<Regex> =
  Lazy::new(|| Regex::new(r"\w+\(\[").expect("TERMINAL_DEF regex should compile"));

static GATEWAY_DEF: Lazy<Regex> =
  Lazy::new(|| Regex::new(r"(\w+)\{.*?\}").expect("GATEWAY_DEF regex should compile"));

static EDGE_LABEL: Lazy<Regex> =
  Lazy::new(|| Regex::new(r"-->\s*\|[^|]*\|").expect("EDGE_LABEL regex should compile"));

/// Bracketed label of a node definition, longest bracket families first.
static NODE_LABEL: Lazy<Regex> = Lazy::new(|| {
  Regex::new(r"(\w+)(?:\(\[.*?\]\)|\[\[.*?\]\]|\(\(.*?\)\)|\{\{.*?\}\}|\[.*?\]|\(.*?\)|\{.*?\})")
    .expect("NODE_LABEL regex should compile")
});

/// Warning categories that make the logic invalid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WarningKind {
  Orphan,
  GatewayFanOut,
  NoTerminal,
  RiskyCharacter,
}

impl WarningKind {
  fn affects_logic(self) -> bool {
    matches!(self, WarningKind::Orphan | WarningKind::GatewayFanOut)
  }
}

/// Node/edge view of one diagram, recomputed on every call.
#[derive(Debug, Default)]
pub(crate) struct DiagramGraph {
  pub(crate) defined: BTreeSet<String>,
  pub(crate) referenced: BTreeSet<String>,
  /// Gateway id → outgoing edge count, in first-seen order of definition.
  pub(crate) gateways: Vec<(String, usize)>,
  pub(crate) edges: Vec<(String, String)>,
}

/// Removes a surrounding ``` fence (with or without a language tag).
pub fn strip_code_fence(source: &str) -> &str {
  let trimmed = source.trim();
  let Some(rest) = trimmed.strip_prefix("```") else {
    return trimmed;
  };
  let body = match rest.find('\n') {
    Some(nl) => &rest[nl + 1..],
    None => rest.trim_start_matches(|c: char| c.is_ascii_alphanumeric()),
  };
  body.trim_end().trim_end_matches("```").trim()
}

/// All edges on one line, including chained `A --> B --> C`.
pub(crate) fn edges_in_line(line: &str) -> Vec<(String, String)> {
  let mut edges = Vec::new();
  let mut pos = 0;
  while pos < line.len() {
    let Some(caps) = EDGE.captures_at(line, pos) else {
      break;
    };
    let (Some(from), Some(to)) = (caps.get(1), caps.get(2)) else {
      break;
    };
    edges.push((from.as_str().to_string(), to.as_str().to_string()));
    pos = to.start();
  }
  edges
}

/// Builds the node/edge view from body lines (declaration excluded).
pub(crate) fn build_graph(body: &[&str]) -> DiagramGraph {
  let mut graph = DiagramGraph::default();
  let mut gateway_ids: Vec<String> = Vec::new();

  for line in body {
    if let Some(caps) = NODE_DEF.captures(line) {
      graph.defined.insert(caps[1].to_string());
    }
    for (from, to) in edges_in_line(line) {
      graph.referenced.insert(from.clone());
      graph.referenced.insert(to.clone());
      graph.edges.push((from, to));
    }
    if let Some(caps) = GATEWAY_DEF.captures(line) {
      let id = caps[1].to_string();
      if !gateway_ids.contains(&id) {
        gateway_ids.push(id);
      }
    }
  }

  let mut outgoing: BTreeMap<&str, usize> = BTreeMap::new();
  for (from, _) in &graph.edges {
    *outgoing.entry(from.as_str()).or_default() += 1;
  }
  graph.gateways = gateway_ids
    .into_iter()
    .map(|id| {
      let n = outgoing.get(id.as_str()).copied().unwrap_or(0);
      (id, n)
    })
    .collect();
  graph
}

/// Line with edge labels and node labels removed, for the risky character scan.
pub(crate) fn strip_labels(line: &str) -> String {
  let without_edge_labels = EDGE_LABEL.replace_all(line, "-->");
  NODE_LABEL
    .replace_all(&without_edge_labels, "$1")
    .into_owned()
}

fn join_ids<'a>(ids: impl IntoIterator<Item = &'a String>) -> String {
  ids
    .into_iter()
    .map(String::as_str)
    .collect::<Vec<_>>()
    .join(", ")
}

fn truncate_line(line: &str) -> String {
  line.chars().take(50).collect()
}

/// Validates flowchart source and returns a structural report.
#[instrument(level = "trace", skip(source))]
pub fn validate_diagram(source: &str) -> ValidationReport {
  let code = strip_code_fence(source);
  let lines: Vec<&str> = code
    .lines()
    .map(str::trim)
    .filter(|l| !l.is_empty())
    .collect();

  let mut errors = Vec::new();
  let mut warnings: Vec<(WarningKind, String)> = Vec::new();

  match lines.first() {
    Some(first) if first.starts_with(DECLARATION_PREFIX) => {}
    _ => errors.push(format!(
      "Diagram source must start with '{} TD'",
      DECLARATION_PREFIX
    )),
  }

  let body = lines.get(1..).unwrap_or(&[]);
  let graph = build_graph(body);

  let undefined: Vec<&String> = graph.referenced.difference(&graph.defined).collect();
  if !undefined.is_empty() {
    errors.push(format!("Undefined nodes referenced: {}", join_ids(undefined)));
  }

  let orphans: Vec<&String> = graph.defined.difference(&graph.referenced).collect();
  if !orphans.is_empty() {
    warnings.push((
      WarningKind::Orphan,
      format!("Unconnected nodes (orphans): {}", join_ids(orphans)),
    ));
  }

  if !body.iter().any(|l| TERMINAL_DEF.is_match(l)) {
    warnings.push((
      WarningKind::NoTerminal,
      "No start/end event found (node with '([...])')".to_string(),
    ));
  }

  for (gateway, outgoing) in &graph.gateways {
    if *outgoing < 2 {
      warnings.push((
        WarningKind::GatewayFanOut,
        format!(
          "Gateway '{}' has only {} outgoing edge(s). Expected: at least 2.",
          gateway, outgoing
        ),
      ));
    }
  }

  for line in body {
    let cleaned = strip_labels(line);
    if let Some(c) = RISKY_CHARS.iter().find(|c| cleaned.contains(**c)) {
      warnings.push((
        WarningKind::RiskyCharacter,
        format!(
          "Potentially problematic character '{}' in line: {}",
          c,
          truncate_line(line)
        ),
      ));
    }
  }

  let logic_warnings = warnings.iter().filter(|(k, _)| k.affects_logic()).count();
  let stats = ValidationStats {
    defined_nodes: graph.defined.len(),
    referenced_nodes: graph.referenced.len(),
    gateways: graph.gateways.len(),
  };
  let report = ValidationReport::from_findings(
    errors,
    warnings.into_iter().map(|(_, w)| w).collect(),
    logic_warnings,
    stats,
  );
  debug!(
    status = %report.overall_status,
    errors = report.errors.len(),
    warnings = report.warnings.len(),
    defined = stats.defined_nodes,
    "diagram validated"
  );
  report
}
