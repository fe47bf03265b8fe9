//! Merging rows with their classification into persistable records

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::annotate::{Sentiment, SentimentResult, SentimentScores};
use crate::ingest::FeedbackRow;

pub const UNKNOWN: &str = "unknown";

/// Source of merge timestamps
pub trait Clock: Send + Sync {
  /// Seconds since the Unix epoch
  fn now_unix(&self) -> i64;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
  fn now_unix(&self) -> i64 {
    Utc::now().timestamp()
  }
}

/// A feedback row combined with its sentiment. Keyed by `(feedback_id, timestamp)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrichedRecord {
  pub feedback_id: String,
  pub employee_id: String,
  pub department: String,
  pub feedback_text: String,
  pub timestamp: i64,
  pub sentiment: Sentiment,
  pub sentiment_scores: SentimentScores,
}

impl EnrichedRecord {
  pub fn key(&self) -> (&str, i64) {
    (self.feedback_id.as_str(), self.timestamp)
  }
}

/// Synthetic id for rows that carry none, derived from their input position
pub fn synthetic_feedback_id(index: usize) -> String {
  format!("fb_{index}")
}

/// Build the record for the row at global position `index`
pub fn merge(row: &FeedbackRow, result: SentimentResult, index: usize, timestamp: i64) -> EnrichedRecord {
  EnrichedRecord {
    feedback_id: row.feedback_id().map(str::to_string).unwrap_or_else(|| synthetic_feedback_id(index)),
    employee_id: row.employee_id().unwrap_or(UNKNOWN).to_string(),
    department: row.department().unwrap_or(UNKNOWN).to_string(),
    feedback_text: row.feedback_text().to_string(),
    timestamp,
    sentiment: result.sentiment,
    sentiment_scores: result.scores,
  }
}
