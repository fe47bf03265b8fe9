//! CSV ingestion: raw delimited text into header-keyed rows

use std::collections::BTreeMap;

use crate::error::{PipelineError, Result};

pub const FEEDBACK_ID: &str = "feedback_id";
pub const EMPLOYEE_ID: &str = "employee_id";
pub const DEPARTMENT: &str = "department";
pub const FEEDBACK_TEXT: &str = "feedback_text";

const BYTE_ORDER_MARK: char = '\u{feff}';

/// One CSV data line keyed by header name
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeedbackRow {
  columns: BTreeMap<String, String>,
}

impl FeedbackRow {
  pub fn from_pairs<K, V, I>(pairs: I) -> Self
  where
    K: Into<String>,
    V: Into<String>,
    I: IntoIterator<Item = (K, V)>,
  {
    Self { columns: pairs.into_iter().map(|(k, v)| (k.into(), v.into())).collect() }
  }

  pub fn get(&self, column: &str) -> Option<&str> {
    self.columns.get(column).map(String::as_str)
  }

  pub fn contains(&self, column: &str) -> bool {
    self.columns.contains_key(column)
  }

  pub fn keys(&self) -> impl Iterator<Item = &str> {
    self.columns.keys().map(String::as_str)
  }

  pub fn len(&self) -> usize {
    self.columns.len()
  }

  pub fn is_empty(&self) -> bool {
    self.columns.is_empty()
  }

  pub fn feedback_id(&self) -> Option<&str> {
    self.get(FEEDBACK_ID)
  }

  pub fn employee_id(&self) -> Option<&str> {
    self.get(EMPLOYEE_ID)
  }

  pub fn department(&self) -> Option<&str> {
    self.get(DEPARTMENT)
  }

  /// Text to classify; empty when the column is absent
  pub fn feedback_text(&self) -> &str {
    self.get(FEEDBACK_TEXT).unwrap_or("")
  }

  /// Both identifying columns are present. Used for reporting only.
  pub fn is_complete(&self) -> bool {
    self.contains(FEEDBACK_ID) && self.contains(FEEDBACK_TEXT)
  }
}

/// Decode object bytes as UTF-8 text
pub fn decode_content(bytes: &[u8]) -> Result<&str> {
  std::str::from_utf8(bytes)
    .map_err(|e| PipelineError::InputFetch(format!("object is not valid UTF-8: {e}")))
}

/// Parse CSV content into rows.
///
/// The first line names the columns. Short lines leave their trailing columns
/// absent and extra cells are dropped, so a header-only file yields no rows
/// rather than an error.
pub fn parse_feedback(content: &str) -> Result<Vec<FeedbackRow>> {
  let content = content.strip_prefix(BYTE_ORDER_MARK).unwrap_or(content);

  let mut reader =
    csv::ReaderBuilder::new().has_headers(true).flexible(true).from_reader(content.as_bytes());

  let headers = reader.headers().map_err(|e| PipelineError::Parse(e.to_string()))?.clone();

  let mut rows = Vec::new();
  for record in reader.records() {
    let record = record.map_err(|e| PipelineError::Parse(e.to_string()))?;
    rows.push(FeedbackRow::from_pairs(headers.iter().zip(record.iter())));
  }

  tracing::debug!(rows = rows.len(), columns = headers.len(), "parsed feedback content");
  Ok(rows)
}
