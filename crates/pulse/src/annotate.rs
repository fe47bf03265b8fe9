//! Sentiment annotation seam
//!
//! The pipeline only depends on [`SentimentAnnotator`]; the managed service
//! adapter lives in `comprehend`, and tests substitute their own.

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::{PipelineError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Sentiment {
  Positive,
  Negative,
  Neutral,
  Mixed,
}

impl Sentiment {
  pub fn as_str(&self) -> &'static str {
    match self {
      Sentiment::Positive => "POSITIVE",
      Sentiment::Negative => "NEGATIVE",
      Sentiment::Neutral => "NEUTRAL",
      Sentiment::Mixed => "MIXED",
    }
  }
}

impl fmt::Display for Sentiment {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

/// Per-class confidence, each in `[0, 1]`
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SentimentScores {
  pub positive: f64,
  pub negative: f64,
  pub neutral: f64,
  pub mixed: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SentimentResult {
  pub sentiment: Sentiment,
  pub scores: SentimentScores,
}

impl SentimentResult {
  pub fn new(sentiment: Sentiment, scores: SentimentScores) -> Self {
    Self { sentiment, scores }
  }
}

/// Classifies one batch of texts in a single external call.
///
/// Implementations return exactly one result per text, in input order, or
/// fail the whole batch.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SentimentAnnotator: Send + Sync {
  async fn classify_batch(&self, texts: &[String], language_code: &str) -> Result<Vec<SentimentResult>>;
}

/// Reject results that do not line up one-to-one with the submitted texts
pub fn ensure_aligned(submitted: usize, results: &[SentimentResult]) -> Result<()> {
  if results.len() != submitted {
    return Err(PipelineError::Annotation(format!(
      "expected {submitted} results, service returned {}",
      results.len()
    )));
  }
  Ok(())
}
