//! Log output setup for the binary. Logs go to stderr; stdout carries responses.

use tracing_subscriber::util::TryInitError;
use tracing_subscriber::{filter::EnvFilter, fmt, prelude::*};

/// Directives used when `RUST_LOG` is not set
pub fn default_directives(verbose: bool) -> &'static str {
  if verbose {
    // Verbose mode: debug for pulse, but reduced for the SDK and HTTP stack
    "pulse=debug,info,aws_config=warn,aws_smithy_runtime=warn,hyper=warn,object_store=info"
  } else {
    "pulse=info,warn"
  }
}

pub fn init(verbose: bool) -> Result<(), TryInitError> {
  let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directives(verbose)));

  tracing_subscriber::registry().with(fmt::layer().with_writer(std::io::stderr)).with(filter).try_init()
}
