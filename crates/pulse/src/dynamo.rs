//! DynamoDB adapter for [`RecordSink`]

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use aws_sdk_dynamodb::error::DisplayErrorContext;
use aws_sdk_dynamodb::types::{AttributeValue, PutRequest, WriteRequest};
use aws_sdk_dynamodb::Client;

use crate::annotate::SentimentScores;
use crate::error::{PipelineError, Result};
use crate::merge::EnrichedRecord;
use crate::store::RecordSink;

/// Most puts a single `BatchWriteItem` request may carry
const MAX_WRITE_BATCH: usize = 25;

/// Consecutive requests with nothing accepted before the session gives up
const MAX_STALLED_ROUNDS: usize = 8;

/// Pause before resubmitting after a request in which nothing was accepted
const STALL_BACKOFF: Duration = Duration::from_millis(250);

/// One `BatchWriteItem` round trip
#[async_trait]
trait BatchWriter: Send + Sync {
  /// Submit up to [`MAX_WRITE_BATCH`] puts and return what the service left unprocessed
  async fn write_batch(&self, requests: Vec<WriteRequest>) -> Result<Vec<WriteRequest>>;
}

/// Table of enriched records, hash key `feedback_id`, range key `timestamp`
pub struct DynamoRecordStore {
  client: Client,
  table_name: String,
}

impl DynamoRecordStore {
  pub fn new(client: Client, table_name: impl Into<String>) -> Self {
    Self { client, table_name: table_name.into() }
  }

  pub fn table_name(&self) -> &str {
    &self.table_name
  }
}

#[async_trait]
impl BatchWriter for DynamoRecordStore {
  async fn write_batch(&self, requests: Vec<WriteRequest>) -> Result<Vec<WriteRequest>> {
    let output = self
      .client
      .batch_write_item()
      .request_items(&self.table_name, requests)
      .send()
      .await
      .map_err(|e| PipelineError::Persistence(DisplayErrorContext(&e).to_string()))?;

    let unprocessed = output
      .unprocessed_items()
      .and_then(|items| items.get(&self.table_name))
      .cloned()
      .unwrap_or_default();
    Ok(unprocessed)
  }
}

#[async_trait]
impl RecordSink for DynamoRecordStore {
  async fn bulk_upsert(&self, records: &[EnrichedRecord]) -> Result<usize> {
    write_all(self, records, STALL_BACKOFF).await?;

    tracing::info!(table = %self.table_name, records = records.len(), "stored records");
    Ok(records.len())
  }
}

async fn write_all(writer: &dyn BatchWriter, records: &[EnrichedRecord], backoff: Duration) -> Result<()> {
  let mut session = WriteSession::new(writer, backoff);
  for record in records {
    session.put(put_request(record)?).await?;
  }
  session.close().await
}

/// Buffers puts and flushes them in full requests.
///
/// A request may not name the same key twice, so a put replaces any buffered
/// put with the same key. Closing drains the buffer, resubmitting unprocessed
/// items, so every put has been accepted by the service once `close` returns.
struct WriteSession<'a> {
  writer: &'a dyn BatchWriter,
  pending: Vec<WriteRequest>,
  backoff: Duration,
}

impl<'a> WriteSession<'a> {
  fn new(writer: &'a dyn BatchWriter, backoff: Duration) -> Self {
    Self { writer, pending: Vec::with_capacity(MAX_WRITE_BATCH), backoff }
  }

  async fn put(&mut self, request: WriteRequest) -> Result<()> {
    let key = request_key(&request);
    let buffered = key.and_then(|key| self.pending.iter().position(|p| request_key(p) == Some(key)));

    if let Some(index) = buffered {
      tracing::debug!(index, "replacing buffered put with the same key");
      self.pending[index] = request;
      return Ok(());
    }

    self.pending.push(request);
    if self.pending.len() >= MAX_WRITE_BATCH {
      self.flush().await?;
    }
    Ok(())
  }

  /// Send one full (or final) request, keeping unprocessed items buffered.
  /// Returns how many items the service accepted.
  async fn flush(&mut self) -> Result<usize> {
    let take = self.pending.len().min(MAX_WRITE_BATCH);
    let batch: Vec<WriteRequest> = self.pending.drain(..take).collect();
    if batch.is_empty() {
      return Ok(0);
    }

    let submitted = batch.len();
    let unprocessed = self.writer.write_batch(batch).await?;
    let accepted = submitted - unprocessed.len().min(submitted);
    if !unprocessed.is_empty() {
      tracing::debug!(count = unprocessed.len(), "resubmitting unprocessed items");
    }
    self.pending.extend(unprocessed);
    Ok(accepted)
  }

  async fn close(mut self) -> Result<()> {
    let mut stalled = 0;
    while !self.pending.is_empty() {
      if self.flush().await? > 0 {
        stalled = 0;
        continue;
      }
      stalled += 1;
      if stalled >= MAX_STALLED_ROUNDS {
        return Err(PipelineError::Persistence(format!(
          "{} items still unprocessed after {stalled} attempts",
          self.pending.len()
        )));
      }
      tokio::time::sleep(self.backoff).await;
    }
    Ok(())
  }
}

/// `(feedback_id, timestamp)` of a put, as written to the table
fn request_key(request: &WriteRequest) -> Option<(&str, &str)> {
  let item = request.put_request()?.item();
  let feedback_id = item.get("feedback_id")?.as_s().ok()?;
  let timestamp = item.get("timestamp")?.as_n().ok()?;
  Some((feedback_id.as_str(), timestamp.as_str()))
}

fn put_request(record: &EnrichedRecord) -> Result<WriteRequest> {
  let put = PutRequest::builder()
    .set_item(Some(to_item(record)))
    .build()
    .map_err(|e| PipelineError::Persistence(e.to_string()))?;
  Ok(WriteRequest::builder().put_request(put).build())
}

/// Attribute map for one record
pub fn to_item(record: &EnrichedRecord) -> HashMap<String, AttributeValue> {
  HashMap::from([
    ("feedback_id".to_string(), AttributeValue::S(record.feedback_id.clone())),
    ("employee_id".to_string(), AttributeValue::S(record.employee_id.clone())),
    ("department".to_string(), AttributeValue::S(record.department.clone())),
    ("feedback_text".to_string(), AttributeValue::S(record.feedback_text.clone())),
    ("timestamp".to_string(), AttributeValue::N(record.timestamp.to_string())),
    ("sentiment".to_string(), AttributeValue::S(record.sentiment.as_str().to_string())),
    ("sentiment_scores".to_string(), AttributeValue::M(scores_item(&record.sentiment_scores))),
  ])
}

fn scores_item(scores: &SentimentScores) -> HashMap<String, AttributeValue> {
  HashMap::from([
    ("positive".to_string(), AttributeValue::N(scores.positive.to_string())),
    ("negative".to_string(), AttributeValue::N(scores.negative.to_string())),
    ("neutral".to_string(), AttributeValue::N(scores.neutral.to_string())),
    ("mixed".to_string(), AttributeValue::N(scores.mixed.to_string())),
  ])
}
