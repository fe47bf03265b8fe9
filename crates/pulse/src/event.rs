//! Object-storage trigger payloads

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{PipelineError, Result};

/// Bucket and key of one uploaded object
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectLocator {
  pub bucket: String,
  pub key: String,
}

impl ObjectLocator {
  pub fn new(bucket: impl Into<String>, key: impl Into<String>) -> Self {
    Self { bucket: bucket.into(), key: key.into() }
  }

  /// Parse an `s3://bucket/key/path` URI.
  pub fn parse_uri(uri: &str) -> Result<Self> {
    let without_scheme = uri
      .strip_prefix("s3://")
      .ok_or_else(|| PipelineError::Event(format!("expected 's3://' prefix in '{uri}'")))?;

    match without_scheme.split_once('/') {
      Some((bucket, key)) if !bucket.is_empty() && !key.is_empty() => Ok(Self::new(bucket, key)),
      _ => Err(PipelineError::Event(format!("expected 's3://bucket/key' format in '{uri}'"))),
    }
  }
}

impl fmt::Display for ObjectLocator {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "s3://{}/{}", self.bucket, self.key)
  }
}

/// S3 event notification, reduced to the fields the pipeline reads
#[derive(Debug, Clone, Deserialize)]
pub struct S3Event {
  #[serde(rename = "Records", default)]
  pub records: Vec<S3EventRecord>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct S3EventRecord {
  pub s3: S3Entity,
}

#[derive(Debug, Clone, Deserialize)]
pub struct S3Entity {
  pub bucket: S3Bucket,
  pub object: S3Object,
}

#[derive(Debug, Clone, Deserialize)]
pub struct S3Bucket {
  pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct S3Object {
  pub key: String,
}

impl S3Event {
  pub fn from_value(payload: serde_json::Value) -> Result<Self> {
    serde_json::from_value(payload).map_err(|e| PipelineError::Event(e.to_string()))
  }

  /// Locator of the first record. Later records are not processed.
  pub fn first_object(&self) -> Result<ObjectLocator> {
    let record =
      self.records.first().ok_or_else(|| PipelineError::Event("event has no records".to_string()))?;

    if self.records.len() > 1 {
      tracing::debug!(ignored = self.records.len() - 1, "only the first event record is processed");
    }

    Ok(ObjectLocator::new(&record.s3.bucket.name, &record.s3.object.key))
  }
}
