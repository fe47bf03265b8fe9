//! Persistence seam for enriched records

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;

use crate::error::Result;
use crate::merge::EnrichedRecord;

/// Key-value store that accepts bulk upserts.
///
/// Each record is an independent put keyed by `(feedback_id, timestamp)`;
/// a colliding key is overwritten. Nothing is ordered or atomic across items.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RecordSink: Send + Sync {
  /// Write every record, returning how many were submitted
  async fn bulk_upsert(&self, records: &[EnrichedRecord]) -> Result<usize>;
}

type RecordKey = (String, i64);

/// In-process store with the same keying rules as the production table
#[derive(Debug, Default)]
pub struct MemoryRecordStore {
  records: Mutex<HashMap<RecordKey, EnrichedRecord>>,
}

impl MemoryRecordStore {
  pub fn new() -> Self {
    Self::default()
  }

  /// Writes insert whole records, so a poisoned map is still consistent
  fn lock(&self) -> MutexGuard<'_, HashMap<RecordKey, EnrichedRecord>> {
    self.records.lock().unwrap_or_else(PoisonError::into_inner)
  }

  pub fn len(&self) -> usize {
    self.lock().len()
  }

  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }

  pub fn get(&self, feedback_id: &str, timestamp: i64) -> Option<EnrichedRecord> {
    self.lock().get(&(feedback_id.to_string(), timestamp)).cloned()
  }

  /// All stored records, ordered by key
  pub fn records(&self) -> Vec<EnrichedRecord> {
    let mut all: Vec<EnrichedRecord> = self.lock().values().cloned().collect();
    all.sort_by(|a, b| a.key().cmp(&b.key()));
    all
  }
}

#[async_trait]
impl RecordSink for MemoryRecordStore {
  async fn bulk_upsert(&self, records: &[EnrichedRecord]) -> Result<usize> {
    let mut stored = self.lock();
    for record in records {
      stored.insert((record.feedback_id.clone(), record.timestamp), record.clone());
    }
    Ok(records.len())
  }
}
