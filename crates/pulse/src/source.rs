//! Object retrieval for uploaded feedback files

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use bytes::Bytes;
use object_store::aws::AmazonS3Builder;
use object_store::local::LocalFileSystem;
use object_store::path::Path;
use object_store::ObjectStore;

use crate::error::{PipelineError, Result};
use crate::event::ObjectLocator;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ObjectSource: Send + Sync {
  /// Read the full content of one object
  async fn fetch(&self, locator: &ObjectLocator) -> Result<Bytes>;
}

#[derive(Debug, Clone)]
enum Backend {
  S3 { region: String },
  /// `<root>/<bucket>/<key>` on the local filesystem
  Local { root: PathBuf },
}

/// [`ObjectSource`] backed by `object_store`, keeping one store per bucket
pub struct ObjectStoreSource {
  backend: Backend,
  stores: Mutex<HashMap<String, Arc<dyn ObjectStore>>>,
}

impl ObjectStoreSource {
  /// Read from S3. Credentials come from the standard AWS environment.
  pub fn s3(region: impl Into<String>) -> Self {
    Self::with_backend(Backend::S3 { region: region.into() })
  }

  /// Read from a directory in which each bucket is a subdirectory
  pub fn local(root: impl Into<PathBuf>) -> Self {
    Self::with_backend(Backend::Local { root: root.into() })
  }

  fn with_backend(backend: Backend) -> Self {
    Self { backend, stores: Mutex::new(HashMap::new()) }
  }

  fn store_for(&self, bucket: &str) -> Result<Arc<dyn ObjectStore>> {
    let mut stores =
      self.stores.lock().map_err(|_| PipelineError::InputFetch("object store cache poisoned".to_string()))?;

    if let Some(store) = stores.get(bucket) {
      return Ok(store.clone());
    }

    let store = self.build_store(bucket)?;
    stores.insert(bucket.to_string(), store.clone());
    Ok(store)
  }

  fn build_store(&self, bucket: &str) -> Result<Arc<dyn ObjectStore>> {
    match &self.backend {
      Backend::S3 { region } => {
        tracing::info!(bucket, region = region.as_str(), "creating S3 client");
        let store = AmazonS3Builder::from_env()
          .with_bucket_name(bucket)
          .with_region(region)
          .build()
          .map_err(|e| PipelineError::InputFetch(format!("failed to create S3 client: {e}")))?;
        Ok(Arc::new(store))
      }
      Backend::Local { root } => {
        let store = LocalFileSystem::new_with_prefix(root.join(bucket))
          .map_err(|e| PipelineError::InputFetch(format!("bucket '{bucket}' is not readable: {e}")))?;
        Ok(Arc::new(store))
      }
    }
  }
}

#[async_trait]
impl ObjectSource for ObjectStoreSource {
  async fn fetch(&self, locator: &ObjectLocator) -> Result<Bytes> {
    let store = self.store_for(&locator.bucket)?;
    // Keys are used as given; `Path::from` would percent-encode reserved characters
    let path = Path::parse(&locator.key)
      .map_err(|e| PipelineError::InputFetch(format!("{locator} is not a valid object key: {e}")))?;

    let result = store.get(&path).await.map_err(|e| fetch_error(locator, e))?;
    let bytes = result.bytes().await.map_err(|e| fetch_error(locator, e))?;

    tracing::info!(object = %locator, size = bytes.len(), "fetched feedback object");
    Ok(bytes)
  }
}

fn fetch_error(locator: &ObjectLocator, error: object_store::Error) -> PipelineError {
  match error {
    object_store::Error::NotFound { .. } => PipelineError::InputFetch(format!("{locator} not found")),
    other => PipelineError::InputFetch(format!("{locator}: {other}")),
  }
}
