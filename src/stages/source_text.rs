//! Loads the process description named by `source_path`.
//!
//! `.pdf` files are extracted page by page with `--- Page N ---` markers and a
//! page limit; anything else is read as UTF-8 text.

use std::fmt::Write;
use std::path::Path;

use async_trait::async_trait;
use lopdf::Document;
use tracing::{debug, info, instrument};

use super::stage::{RunContext, Stage, StageOutcome};
use crate::error::StageError;
use crate::keys;
use crate::types::StageValue;

/// Default upper bound on PDF pages.
pub const DEFAULT_MAX_PAGES: usize = 50;

/// True when `path` has a `.pdf` extension (any case).
pub fn is_pdf(path: &str) -> bool {
  Path::new(path)
    .extension()
    .and_then(|e| e.to_str())
    .is_some_and(|e| e.eq_ignore_ascii_case("pdf"))
}

/// Extracts the text of every page, each preceded by its page marker.
/// Pages without text are skipped. Fails when the document exceeds `max_pages`.
pub(crate) fn pdf_text(bytes: &[u8], max_pages: usize) -> Result<String, String> {
  let doc = Document::load_mem(bytes).map_err(|e| format!("parse pdf: {}", e))?;
  let pages = doc.get_pages();
  if pages.len() > max_pages {
    return Err(format!(
      "PDF has {} pages, maximum allowed is {}",
      pages.len(),
      max_pages
    ));
  }
  let mut text = String::new();
  for page in pages.keys() {
    let page_text = doc
      .extract_text(&[*page])
      .map_err(|e| format!("page {}: {}", page, e))?;
    if page_text.trim().is_empty() {
      debug!(page, "page has no text");
      continue;
    }
    let _ = write!(text, "\n--- Page {} ---\n{}", page, page_text);
  }
  Ok(text.trim().to_string())
}

/// Reads the source file into `extracted_text`.
pub struct SourceTextStage {
  name: String,
  max_pages: usize,
}

impl SourceTextStage {
  pub fn new(name: impl Into<String>) -> Self {
    Self {
      name: name.into(),
      max_pages: DEFAULT_MAX_PAGES,
    }
  }

  pub fn max_pages(mut self, pages: usize) -> Self {
    self.max_pages = pages;
    self
  }

  async fn read_pdf(&self, path: &str) -> Result<String, StageError> {
    let bytes = tokio::fs::read(path)
      .await
      .map_err(|e| StageError::collaborator(&self.name, format!("read {}: {}", path, e)))?;
    let max_pages = self.max_pages;
    tokio::task::spawn_blocking(move || pdf_text(&bytes, max_pages))
      .await
      .map_err(|e| StageError::collaborator(&self.name, format!("pdf extraction: {}", e)))?
      .map_err(|e| StageError::collaborator(&self.name, format!("{}: {}", path, e)))
  }
}

#[async_trait]
impl Stage for SourceTextStage {
  fn name(&self) -> &str {
    &self.name
  }

  fn output_key(&self) -> Option<&str> {
    Some(keys::EXTRACTED_TEXT)
  }

  #[instrument(level = "trace", skip(self, ctx))]
  async fn run(&self, ctx: &mut RunContext) -> Result<StageOutcome, StageError> {
    let path = ctx
      .store
      .get_text(keys::SOURCE_PATH)
      .ok_or_else(|| StageError::missing_input(&self.name, keys::SOURCE_PATH))?;
    let text = if is_pdf(path) {
      self.read_pdf(path).await?
    } else {
      tokio::fs::read_to_string(path)
        .await
        .map_err(|e| StageError::collaborator(&self.name, format!("read {}: {}", path, e)))?
    };
    if text.trim().is_empty() {
      return Err(StageError::collaborator(
        &self.name,
        format!("no text in {}", path),
      ));
    }
    info!(stage = %self.name, path, chars = text.chars().count(), "source text loaded");
    Ok(StageOutcome::output(StageValue::Text(text)))
  }
}
