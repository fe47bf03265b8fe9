//! Amazon Comprehend adapter for [`SentimentAnnotator`]

use async_trait::async_trait;
use aws_sdk_comprehend::error::DisplayErrorContext;
use aws_sdk_comprehend::types::{
  BatchDetectSentimentItemResult, BatchItemError, LanguageCode, SentimentScore, SentimentType,
};
use aws_sdk_comprehend::Client;

use crate::annotate::{Sentiment, SentimentAnnotator, SentimentResult, SentimentScores};
use crate::error::{PipelineError, Result};

pub struct ComprehendAnnotator {
  client: Client,
}

impl ComprehendAnnotator {
  pub fn new(client: Client) -> Self {
    Self { client }
  }
}

#[async_trait]
impl SentimentAnnotator for ComprehendAnnotator {
  async fn classify_batch(&self, texts: &[String], language_code: &str) -> Result<Vec<SentimentResult>> {
    let output = self
      .client
      .batch_detect_sentiment()
      .set_text_list(Some(texts.to_vec()))
      .language_code(LanguageCode::from(language_code))
      .send()
      .await
      .map_err(|e| PipelineError::Annotation(DisplayErrorContext(&e).to_string()))?;

    collect_results(texts.len(), output.result_list(), output.error_list())
  }
}

/// Place each item result at its reported index.
///
/// Any per-item error, gap, or duplicate fails the whole batch.
fn collect_results(
  expected: usize,
  results: &[BatchDetectSentimentItemResult],
  errors: &[BatchItemError],
) -> Result<Vec<SentimentResult>> {
  if let Some(error) = errors.first() {
    return Err(PipelineError::Annotation(format!(
      "{} of {expected} items rejected, first at index {}: {} {}",
      errors.len(),
      error.index().map(|i| i.to_string()).unwrap_or_else(|| "?".to_string()),
      error.error_code().unwrap_or("UnknownError"),
      error.error_message().unwrap_or(""),
    )));
  }

  let mut slots: Vec<Option<SentimentResult>> = vec![None; expected];
  for item in results {
    let index = item_index(item, expected)?;
    if slots[index].is_some() {
      return Err(PipelineError::Annotation(format!("duplicate result for index {index}")));
    }
    slots[index] = Some(convert_item(item)?);
  }

  slots
    .into_iter()
    .enumerate()
    .map(|(i, slot)| slot.ok_or_else(|| PipelineError::Annotation(format!("no result for index {i}"))))
    .collect()
}

fn item_index(item: &BatchDetectSentimentItemResult, expected: usize) -> Result<usize> {
  let index = item.index().ok_or_else(|| PipelineError::Annotation("result without index".to_string()))?;
  usize::try_from(index)
    .ok()
    .filter(|i| *i < expected)
    .ok_or_else(|| PipelineError::Annotation(format!("result index {index} out of range")))
}

fn convert_item(item: &BatchDetectSentimentItemResult) -> Result<SentimentResult> {
  let sentiment = match item.sentiment() {
    Some(SentimentType::Positive) => Sentiment::Positive,
    Some(SentimentType::Negative) => Sentiment::Negative,
    Some(SentimentType::Neutral) => Sentiment::Neutral,
    Some(SentimentType::Mixed) => Sentiment::Mixed,
    Some(other) => {
      return Err(PipelineError::Annotation(format!("unknown sentiment '{}'", other.as_str())))
    }
    None => return Err(PipelineError::Annotation("result without sentiment".to_string())),
  };

  Ok(SentimentResult::new(sentiment, convert_scores(item.sentiment_score())))
}

/// Scores the service leaves out count as zero
fn convert_scores(score: Option<&SentimentScore>) -> SentimentScores {
  let Some(score) = score else {
    return SentimentScores::default();
  };
  let value = |v: Option<f32>| v.map(f64::from).unwrap_or(0.0);

  SentimentScores {
    positive: value(score.positive()),
    negative: value(score.negative()),
    neutral: value(score.neutral()),
    mixed: value(score.mixed()),
  }
}
