//! Tolerant parser for near-valid JSON returned by collaborators.
//!
//! Strict parse first; on failure apply one bounded repair pass (drop trailing
//! commas before a closing bracket, map `True`/`False`/`None` to JSON literals)
//! and retry exactly once. Only used for post-hoc reporting text; the schema
//! path in [crate::types::OutputKind] never repairs.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use tracing::{debug, instrument};

/// Outermost `{ ... }` span, greedy across lines.
static JSON_BLOCK: Lazy<Regex> =
  Lazy::new(|| Regex::new(r"(\{[\s\S]*\})").expect("JSON_BLOCK regex should compile"));

/// Result of [repair_and_parse]. Never an error: callers treat
/// [RepairOutcome::Unparseable] as "no data".
#[derive(Debug, Clone, PartialEq)]
pub enum RepairOutcome {
  /// Strict parse succeeded.
  Parsed(Value),
  /// Parse succeeded after the repair pass.
  Repaired(Value),
  /// Both attempts failed; carries the retry's parse error.
  Unparseable(String),
}

impl RepairOutcome {
  pub fn value(&self) -> Option<&Value> {
    match self {
      RepairOutcome::Parsed(v) | RepairOutcome::Repaired(v) => Some(v),
      RepairOutcome::Unparseable(_) => None,
    }
  }

  pub fn into_value(self) -> Option<Value> {
    match self {
      RepairOutcome::Parsed(v) | RepairOutcome::Repaired(v) => Some(v),
      RepairOutcome::Unparseable(_) => None,
    }
  }
}

/// Parses `text`, repairing it once if the strict parse fails.
#[instrument(level = "trace", skip(text))]
pub fn repair_and_parse(text: &str) -> RepairOutcome {
  if let Ok(v) = serde_json::from_str::<Value>(text) {
    return RepairOutcome::Parsed(v);
  }
  let repaired = repair_text(text);
  match serde_json::from_str::<Value>(&repaired) {
    Ok(v) => {
      debug!("parsed after repair");
      RepairOutcome::Repaired(v)
    }
    Err(e) => RepairOutcome::Unparseable(e.to_string()),
  }
}

/// Returns the outermost `{...}` block of `text`, if any.
pub fn extract_json_block(text: &str) -> Option<&str> {
  JSON_BLOCK
    .captures(text)
    .and_then(|c| c.get(1))
    .map(|m| m.as_str())
}

/// Applies the repair pass. String literals are copied untouched.
pub(crate) fn repair_text(text: &str) -> String {
  let chars: Vec<char> = text.chars().collect();
  let mut out = String::with_capacity(text.len());
  let mut i = 0;
  let mut in_string = false;

  while i < chars.len() {
    let c = chars[i];
    if in_string {
      out.push(c);
      if c == '\\' && i + 1 < chars.len() {
        out.push(chars[i + 1]);
        i += 2;
        continue;
      }
      if c == '"' {
        in_string = false;
      }
      i += 1;
      continue;
    }

    match c {
      '"' => {
        in_string = true;
        out.push(c);
        i += 1;
      }
      ',' if closes_after_whitespace(&chars, i + 1) => {
        i += 1;
      }
      c if c.is_ascii_alphabetic() => {
        let start = i;
        while i < chars.len() && (chars[i].is_ascii_alphanumeric() || chars[i] == '_') {
          i += 1;
        }
        let word: String = chars[start..i].iter().collect();
        out.push_str(normalize_literal(&word));
      }
      _ => {
        out.push(c);
        i += 1;
      }
    }
  }
  out
}

/// True when the next non-whitespace char from `from` is `]` or `}`.
fn closes_after_whitespace(chars: &[char], from: usize) -> bool {
  chars[from..]
    .iter()
    .find(|c| !c.is_whitespace())
    .is_some_and(|c| *c == ']' || *c == '}')
}

fn normalize_literal(word: &str) -> &str {
  match word {
    "True" => "true",
    "False" => "false",
    "None" => "null",
    other => other,
  }
}
