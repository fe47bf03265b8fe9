//! Orchestration of one invocation: fetch, parse, annotate, merge, persist
//!
//! Batches run strictly one after another. Each batch is annotated, merged
//! and persisted before the next one starts, so a failure in a later batch
//! leaves the earlier batches stored while the invocation still fails.

use std::sync::Arc;

use serde::Serialize;
use tracing::Instrument;
use uuid::Uuid;

use crate::annotate::{ensure_aligned, SentimentAnnotator};
use crate::batch::{batch_count, partition, Batch};
use crate::error::{Result, Stage};
use crate::event::{ObjectLocator, S3Event};
use crate::ingest::{decode_content, parse_feedback, FeedbackRow};
use crate::merge::{merge, Clock, EnrichedRecord};
use crate::response::InvocationResponse;
use crate::source::ObjectSource;
use crate::store::RecordSink;

/// Handles to the external services, created once per process
#[derive(Clone)]
pub struct Collaborators {
  pub source: Arc<dyn ObjectSource>,
  pub annotator: Arc<dyn SentimentAnnotator>,
  pub sink: Arc<dyn RecordSink>,
  pub clock: Arc<dyn Clock>,
}

/// Outcome of a successful invocation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Summary {
  pub invocation_id: Uuid,
  pub processed_count: usize,
  pub batch_count: usize,
  /// Rows lacking `feedback_id` or `feedback_text`; processed regardless
  pub incomplete_rows: usize,
}

pub struct Pipeline {
  services: Collaborators,
  language_code: String,
}

impl Pipeline {
  pub fn new(services: Collaborators, language_code: impl Into<String>) -> Self {
    Self { services, language_code: language_code.into() }
  }

  /// Process a trigger payload and produce the response for the caller.
  ///
  /// Every failure is caught here, logged once and reported as a 500.
  pub async fn handle_event(&self, payload: serde_json::Value) -> InvocationResponse {
    let locator = match S3Event::from_value(payload).and_then(|event| event.first_object()) {
      Ok(locator) => locator,
      Err(e) => {
        tracing::error!(stage = %e.stage(), error = %e, "rejected trigger event");
        return InvocationResponse::failure(e);
      }
    };

    self.handle_object(&locator).await
  }

  /// Process one object and produce the response for the caller
  pub async fn handle_object(&self, locator: &ObjectLocator) -> InvocationResponse {
    match self.run(locator).await {
      Ok(summary) => InvocationResponse::success(summary.processed_count),
      Err(e) => InvocationResponse::failure(e),
    }
  }

  /// Run the pipeline for one object
  pub async fn run(&self, locator: &ObjectLocator) -> Result<Summary> {
    let invocation_id = Uuid::new_v4();
    let span = tracing::info_span!("invocation", id = %invocation_id, object = %locator);

    async move {
      let outcome = self.execute(invocation_id, locator).await;
      match &outcome {
        Ok(summary) => {
          enter(Stage::Done);
          tracing::info!(processed = summary.processed_count, batches = summary.batch_count, "invocation complete");
        }
        Err(e) => {
          enter(Stage::Failed);
          tracing::error!(stage = %e.stage(), error = %e, "error processing feedback");
        }
      }
      outcome
    }
    .instrument(span)
    .await
  }

  async fn execute(&self, invocation_id: Uuid, locator: &ObjectLocator) -> Result<Summary> {
    enter(Stage::Fetch);
    tracing::info!("processing file: {locator}");
    let bytes = self.services.source.fetch(locator).await?;
    let content = decode_content(&bytes)?;

    enter(Stage::Parse);
    let rows = parse_feedback(content)?;
    let incomplete_rows = rows.iter().filter(|row| !row.is_complete()).count();
    tracing::info!(rows = rows.len(), batches = batch_count(rows.len()), "loaded feedback entries");
    if incomplete_rows > 0 {
      tracing::warn!(incomplete_rows, "rows without feedback_id or feedback_text will use defaults");
    }

    let mut processed_count = 0;
    let mut batch_count = 0;
    for batch in partition(&rows) {
      processed_count += self.process_batch(&batch).await?;
      batch_count += 1;
    }

    Ok(Summary { invocation_id, processed_count, batch_count, incomplete_rows })
  }

  async fn process_batch(&self, batch: &Batch<'_, FeedbackRow>) -> Result<usize> {
    enter(Stage::BatchAnnotate);
    let texts: Vec<String> = batch.items.iter().map(|row| row.feedback_text().to_string()).collect();
    let results = self.services.annotator.classify_batch(&texts, &self.language_code).await?;
    ensure_aligned(texts.len(), &results)?;

    enter(Stage::Merge);
    let records: Vec<EnrichedRecord> = batch
      .indexed()
      .zip(results)
      .map(|((index, row), result)| merge(row, result, index, self.services.clock.now_unix()))
      .collect();

    enter(Stage::Persist);
    self.services.sink.bulk_upsert(&records).await?;
    tracing::debug!(offset = batch.offset, records = records.len(), "batch stored");

    Ok(records.len())
  }
}

fn enter(stage: Stage) {
  tracing::debug!(%stage, "entering stage");
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::annotate::{MockSentimentAnnotator, Sentiment, SentimentResult, SentimentScores};
  use crate::error::PipelineError;
  use crate::source::MockObjectSource;
  use crate::store::MockRecordSink;
  use bytes::Bytes;
  use mockall::predicate::*;

  struct FixedClock(i64);

  impl Clock for FixedClock {
    fn now_unix(&self) -> i64 {
      self.0
    }
  }

  fn neutral() -> SentimentResult {
    SentimentResult::new(Sentiment::Neutral, SentimentScores { neutral: 1.0, ..Default::default() })
  }

  fn source_with(content: impl Into<String>) -> MockObjectSource {
    let content: String = content.into();
    let mut source = MockObjectSource::new();
    source.expect_fetch().times(1).returning(move |_| Ok(Bytes::from(content.clone())));
    source
  }

  fn pipeline(source: MockObjectSource, annotator: MockSentimentAnnotator, sink: MockRecordSink) -> Pipeline {
    Pipeline::new(
      Collaborators {
        source: Arc::new(source),
        annotator: Arc::new(annotator),
        sink: Arc::new(sink),
        clock: Arc::new(FixedClock(1_700_000_000)),
      },
      "en",
    )
  }

  #[tokio::test]
  async fn test_each_batch_is_annotated_then_persisted() {
    let mut content = String::from("feedback_text\n");
    for i in 0..30 {
      content.push_str(&format!("text {i}\n"));
    }

    let mut annotator = MockSentimentAnnotator::new();
    annotator
      .expect_classify_batch()
      .withf(|_, language| language == "en")
      .times(2)
      .returning(|texts, _| Ok(vec![neutral(); texts.len()]));

    let mut sink = MockRecordSink::new();
    sink.expect_bulk_upsert().withf(|records| records.len() == 25).times(1).returning(|r| Ok(r.len()));
    sink
      .expect_bulk_upsert()
      .withf(|records| records.len() == 5 && records[0].feedback_id == "fb_25")
      .times(1)
      .returning(|r| Ok(r.len()));

    let summary = pipeline(source_with(content), annotator, sink)
      .run(&ObjectLocator::new("uploads", "feedback.csv"))
      .await
      .unwrap();

    assert_eq!(summary.processed_count, 30);
    assert_eq!(summary.batch_count, 2);
    assert_eq!(summary.incomplete_rows, 30);
  }

  #[tokio::test]
  async fn test_misaligned_results_fail_before_persisting() {
    let mut annotator = MockSentimentAnnotator::new();
    annotator.expect_classify_batch().times(1).returning(|_, _| Ok(vec![neutral()]));

    let mut sink = MockRecordSink::new();
    sink.expect_bulk_upsert().times(0);

    let err = pipeline(source_with("feedback_id,feedback_text\nfb_1,a\nfb_2,b"), annotator, sink)
      .run(&ObjectLocator::new("uploads", "feedback.csv"))
      .await
      .unwrap_err();

    assert!(matches!(err, PipelineError::Annotation(_)));
  }

  #[tokio::test]
  async fn test_persistence_failure_is_reported() {
    let mut annotator = MockSentimentAnnotator::new();
    annotator.expect_classify_batch().times(1).returning(|texts, _| Ok(vec![neutral(); texts.len()]));

    let mut sink = MockRecordSink::new();
    sink
      .expect_bulk_upsert()
      .times(1)
      .returning(|_| Err(PipelineError::Persistence("ResourceNotFoundException".to_string())));

    let response = pipeline(source_with("feedback_id,feedback_text\nfb_1,a"), annotator, sink)
      .handle_event(serde_json::json!({
        "Records": [{ "s3": { "bucket": { "name": "uploads" }, "object": { "key": "feedback.csv" } } }]
      }))
      .await;

    assert_eq!(response.status_code, 500);
    assert!(response.body_json().unwrap()["error"].as_str().unwrap().contains("ResourceNotFoundException"));
  }

  #[tokio::test]
  async fn test_bad_event_touches_no_service() {
    let mut source = MockObjectSource::new();
    source.expect_fetch().times(0);
    let mut annotator = MockSentimentAnnotator::new();
    annotator.expect_classify_batch().times(0);
    let mut sink = MockRecordSink::new();
    sink.expect_bulk_upsert().times(0);

    let response = pipeline(source, annotator, sink).handle_event(serde_json::json!({ "Records": [] })).await;

    assert_eq!(response.status_code, 500);
    assert_eq!(response.body_json().unwrap()["error"], "invalid trigger event: event has no records");
  }

  #[tokio::test]
  async fn test_fetch_failure_skips_annotation() {
    let mut source = MockObjectSource::new();
    source
      .expect_fetch()
      .with(eq(ObjectLocator::new("uploads", "missing.csv")))
      .times(1)
      .returning(|_| Err(PipelineError::InputFetch("s3://uploads/missing.csv not found".to_string())));
    let mut annotator = MockSentimentAnnotator::new();
    annotator.expect_classify_batch().times(0);
    let mut sink = MockRecordSink::new();
    sink.expect_bulk_upsert().times(0);

    let err = pipeline(source, annotator, sink)
      .run(&ObjectLocator::new("uploads", "missing.csv"))
      .await
      .unwrap_err();

    assert_eq!(err.stage(), Stage::Fetch);
  }
}
