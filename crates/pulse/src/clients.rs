//! Construction of the production collaborators
//!
//! Clients are built once at process start and handed to the pipeline; they
//! hold connections and credentials but no per-invocation state.

use std::path::PathBuf;
use std::sync::Arc;

use aws_config::{BehaviorVersion, Region, SdkConfig};

use crate::comprehend::ComprehendAnnotator;
use crate::config::Config;
use crate::dynamo::DynamoRecordStore;
use crate::merge::SystemClock;
use crate::pipeline::Collaborators;
use crate::source::{ObjectSource, ObjectStoreSource};
use crate::store::RecordSink;

/// Overrides for local runs
#[derive(Default)]
pub struct ConnectOptions {
  /// Read objects from `<root>/<bucket>/<key>` instead of S3
  pub local_root: Option<PathBuf>,
  /// Write records here instead of the DynamoDB table
  pub sink: Option<Arc<dyn RecordSink>>,
}

pub async fn load_sdk_config(region: &str) -> SdkConfig {
  aws_config::defaults(BehaviorVersion::latest()).region(Region::new(region.to_string())).load().await
}

pub async fn connect(config: &Config, options: ConnectOptions) -> Collaborators {
  let sdk_config = load_sdk_config(&config.region).await;

  let source: Arc<dyn ObjectSource> = match options.local_root {
    Some(root) => {
      tracing::info!(root = %root.display(), "reading objects from local directory");
      Arc::new(ObjectStoreSource::local(root))
    }
    None => Arc::new(ObjectStoreSource::s3(&config.region)),
  };

  let sink: Arc<dyn RecordSink> = match options.sink {
    Some(sink) => sink,
    None => {
      let store = DynamoRecordStore::new(aws_sdk_dynamodb::Client::new(&sdk_config), &config.table_name);
      tracing::info!(table = store.table_name(), region = %config.region, "writing records to DynamoDB");
      Arc::new(store)
    }
  };

  let annotator = ComprehendAnnotator::new(aws_sdk_comprehend::Client::new(&sdk_config));

  Collaborators { source, annotator: Arc::new(annotator), sink, clock: Arc::new(SystemClock) }
}
