//! Pulse - Employee Feedback Sentiment Pipeline
//!
//! Takes feedback CSV files uploaded to object storage, classifies every row
//! with a managed sentiment service in batches of at most 25, and stores the
//! enriched records in a key-value table keyed by `(feedback_id, timestamp)`.

pub mod annotate;
pub mod batch;
pub mod config;
pub mod error;
pub mod event;
pub mod ingest;
pub mod logging;
pub mod merge;
pub mod pipeline;
pub mod response;
pub mod source;
pub mod store;

#[cfg(feature = "aws")]
pub mod clients;
#[cfg(feature = "aws")]
pub mod comprehend;
#[cfg(feature = "aws")]
pub mod dynamo;

pub use annotate::{Sentiment, SentimentAnnotator, SentimentResult, SentimentScores};
pub use config::Config;
pub use error::{PipelineError, Stage};
pub use event::ObjectLocator;
pub use merge::{Clock, EnrichedRecord, SystemClock};
pub use pipeline::{Collaborators, Pipeline, Summary};
pub use response::InvocationResponse;
pub use store::{MemoryRecordStore, RecordSink};
