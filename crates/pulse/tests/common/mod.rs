//! Hand-rolled service doubles shared by the integration tests
#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use bytes::Bytes;
use pulse::error::Result;
use pulse::source::ObjectSource;
use pulse::{
  Clock, Collaborators, MemoryRecordStore, ObjectLocator, Pipeline, PipelineError, Sentiment,
  SentimentAnnotator, SentimentResult, SentimentScores,
};
use serde_json::json;

/// Objects held in memory, keyed by bucket and key
#[derive(Default)]
pub struct MockSource {
  pub objects: HashMap<(String, String), Vec<u8>>,
}

impl MockSource {
  pub fn with_object(bucket: &str, key: &str, content: &str) -> Self {
    let mut source = Self::default();
    source.objects.insert((bucket.to_string(), key.to_string()), content.as_bytes().to_vec());
    source
  }
}

#[async_trait]
impl ObjectSource for MockSource {
  async fn fetch(&self, locator: &ObjectLocator) -> Result<Bytes> {
    self
      .objects
      .get(&(locator.bucket.clone(), locator.key.clone()))
      .map(|content| Bytes::from(content.clone()))
      .ok_or_else(|| PipelineError::InputFetch(format!("{locator} not found")))
  }
}

/// Annotator that replays scripted batches and records every call.
///
/// Without a script it answers NEUTRAL for every text.
#[derive(Default)]
pub struct MockAnnotator {
  pub scripted: Mutex<VecDeque<Vec<SentimentResult>>>,
  pub calls: Mutex<Vec<(Vec<String>, String)>>,
  /// Zero-based call number that fails with a throttling error
  pub fail_on_call: Option<usize>,
}

impl MockAnnotator {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn scripted(batches: Vec<Vec<SentimentResult>>) -> Self {
    Self { scripted: Mutex::new(batches.into()), ..Self::default() }
  }

  pub fn failing_on_call(call: usize) -> Self {
    Self { fail_on_call: Some(call), ..Self::default() }
  }

  pub fn call_count(&self) -> usize {
    self.calls.lock().unwrap().len()
  }

  pub fn batch_sizes(&self) -> Vec<usize> {
    self.calls.lock().unwrap().iter().map(|(texts, _)| texts.len()).collect()
  }
}

#[async_trait]
impl SentimentAnnotator for MockAnnotator {
  async fn classify_batch(&self, texts: &[String], language_code: &str) -> Result<Vec<SentimentResult>> {
    let call = {
      let mut calls = self.calls.lock().unwrap();
      calls.push((texts.to_vec(), language_code.to_string()));
      calls.len() - 1
    };

    if self.fail_on_call == Some(call) {
      return Err(PipelineError::Annotation("ThrottlingException: Rate exceeded".to_string()));
    }

    match self.scripted.lock().unwrap().pop_front() {
      Some(results) => Ok(results),
      None => Ok(texts.iter().map(|_| neutral()).collect()),
    }
  }
}

pub struct FixedClock(pub i64);

impl Clock for FixedClock {
  fn now_unix(&self) -> i64 {
    self.0
  }
}

/// Advances one second per reading
pub struct SteppingClock(pub AtomicI64);

impl Clock for SteppingClock {
  fn now_unix(&self) -> i64 {
    self.0.fetch_add(1, Ordering::SeqCst)
  }
}

pub const BUCKET: &str = "feedback-uploads";
pub const KEY: &str = "2024/q1/feedback.csv";
pub const TIMESTAMP: i64 = 1_700_000_000;

pub fn scored(sentiment: Sentiment, confidence: f64) -> SentimentResult {
  let mut scores = SentimentScores::default();
  match sentiment {
    Sentiment::Positive => scores.positive = confidence,
    Sentiment::Negative => scores.negative = confidence,
    Sentiment::Neutral => scores.neutral = confidence,
    Sentiment::Mixed => scores.mixed = confidence,
  }
  SentimentResult::new(sentiment, scores)
}

pub fn neutral() -> SentimentResult {
  scored(Sentiment::Neutral, 0.9)
}

pub fn upload_event(bucket: &str, key: &str) -> serde_json::Value {
  json!({
    "Records": [{
      "eventVersion": "2.1",
      "eventSource": "aws:s3",
      "eventName": "ObjectCreated:Put",
      "s3": { "bucket": { "name": bucket }, "object": { "key": key } }
    }]
  })
}

/// CSV with `n` rows and no feedback_id column
pub fn anonymous_rows(n: usize) -> String {
  let mut content = String::from("employee_id,department,feedback_text\n");
  for i in 0..n {
    content.push_str(&format!("emp_{i},Engineering,comment number {i}\n"));
  }
  content
}

/// CSV with `n` rows carrying distinct feedback ids
pub fn identified_rows(n: usize) -> String {
  let mut content = String::from("feedback_id,feedback_text\n");
  for i in 0..n {
    content.push_str(&format!("id_{i:03},comment number {i}\n"));
  }
  content
}

pub struct Harness {
  pub annotator: Arc<MockAnnotator>,
  pub store: Arc<MemoryRecordStore>,
  pub pipeline: Pipeline,
}

pub fn harness(source: impl ObjectSource + 'static, annotator: MockAnnotator, clock: impl Clock + 'static) -> Harness {
  let annotator = Arc::new(annotator);
  let store = Arc::new(MemoryRecordStore::new());
  let pipeline = Pipeline::new(
    Collaborators {
      source: Arc::new(source),
      annotator: annotator.clone(),
      sink: store.clone(),
      clock: Arc::new(clock),
    },
    "en",
  );
  Harness { annotator, store, pipeline }
}
