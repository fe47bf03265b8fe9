//! Error taxonomy for a single pipeline invocation

use std::fmt;

use thiserror::Error;

/// Pipeline stages, in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
  Fetch,
  Parse,
  BatchAnnotate,
  Merge,
  Persist,
  Done,
  Failed,
}

impl fmt::Display for Stage {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let name = match self {
      Stage::Fetch => "FETCH",
      Stage::Parse => "PARSE",
      Stage::BatchAnnotate => "BATCH-ANNOTATE",
      Stage::Merge => "MERGE",
      Stage::Persist => "PERSIST",
      Stage::Done => "DONE",
      Stage::Failed => "FAILED",
    };
    f.write_str(name)
  }
}

/// Errors raised while processing one uploaded feedback file
#[derive(Debug, Error)]
pub enum PipelineError {
  /// The trigger payload does not name an object
  #[error("invalid trigger event: {0}")]
  Event(String),

  /// Object not found, access denied, or unreadable content
  #[error("failed to fetch input: {0}")]
  InputFetch(String),

  /// Parsing is permissive; kept so the taxonomy is complete
  #[error("failed to parse feedback: {0}")]
  Parse(String),

  #[error("sentiment annotation failed: {0}")]
  Annotation(String),

  #[error("failed to persist records: {0}")]
  Persistence(String),
}

impl PipelineError {
  /// The stage this error fails
  pub fn stage(&self) -> Stage {
    match self {
      PipelineError::Event(_) | PipelineError::InputFetch(_) => Stage::Fetch,
      PipelineError::Parse(_) => Stage::Parse,
      PipelineError::Annotation(_) => Stage::BatchAnnotate,
      PipelineError::Persistence(_) => Stage::Persist,
    }
  }
}

pub type Result<T> = std::result::Result<T, PipelineError>;
