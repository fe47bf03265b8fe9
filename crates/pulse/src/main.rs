//! Pulse CLI
//!
//! Runs the feedback sentiment pipeline for object-storage trigger events or
//! for a single object URI, printing one response per invocation.

use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};

use pulse::clients::{self, ConnectOptions};
use pulse::config::{DEFAULT_LANGUAGE_CODE, DEFAULT_REGION, LANGUAGE_CODE_ENV, REGION_ENV, TABLE_ENV};
use pulse::{Config, InvocationResponse, MemoryRecordStore, ObjectLocator, Pipeline, RecordSink};

#[derive(Parser)]
#[command(name = "pulse")]
#[command(about = "Employee feedback sentiment pipeline")]
#[command(version = concat!(env!("CARGO_PKG_VERSION"), ", courtesy of Kernelle Software"))]
struct Cli {
  /// Table that receives the enriched records
  #[arg(long, env = TABLE_ENV)]
  table: String,

  /// AWS region for all service clients
  #[arg(long, env = REGION_ENV, default_value = DEFAULT_REGION)]
  region: String,

  /// Language code sent with every sentiment batch
  #[arg(long, env = LANGUAGE_CODE_ENV, default_value = DEFAULT_LANGUAGE_CODE)]
  language_code: String,

  /// Read objects from <DIR>/<bucket>/<key> instead of S3
  #[arg(long, value_name = "DIR")]
  local_root: Option<PathBuf>,

  /// Keep records in memory and print them as JSON lines instead of writing the table
  #[arg(long)]
  dry_run: bool,

  /// Enable verbose logging
  #[arg(short, long)]
  verbose: bool,

  #[command(subcommand)]
  command: Commands,
}

#[derive(Subcommand)]
enum Commands {
  /// Handle trigger events; each file is one invocation (stdin when none or '-')
  Invoke {
    /// Event payload files
    events: Vec<PathBuf>,
  },
  /// Handle a single object given as s3://bucket/key
  Process {
    /// Object URI
    uri: String,
  },
}

#[tokio::main]
#[cfg(not(tarpaulin_include))]
async fn main() -> Result<()> {
  let cli = Cli::parse();

  pulse::logging::init(cli.verbose).context("failed to initialize logging")?;

  let config =
    Config::new(&cli.table).with_region(&cli.region).with_language_code(&cli.language_code);
  config.validate()?;

  let dry_run_store = cli.dry_run.then(|| Arc::new(MemoryRecordStore::new()));
  let options = ConnectOptions {
    local_root: cli.local_root.clone(),
    sink: dry_run_store.clone().map(|store| store as Arc<dyn RecordSink>),
  };

  let pipeline = Pipeline::new(clients::connect(&config, options).await, &config.language_code);

  let responses = match &cli.command {
    Commands::Invoke { events } => invoke(&pipeline, events).await?,
    Commands::Process { uri } => vec![process(&pipeline, uri).await?],
  };

  if let Some(store) = dry_run_store {
    for record in store.records() {
      println!("{}", serde_json::to_string(&record)?);
    }
  }

  let failed = responses.iter().filter(|response| !response.is_success()).count();
  if failed > 0 {
    return Err(anyhow!("{failed} of {} invocations failed", responses.len()));
  }
  Ok(())
}

async fn invoke(pipeline: &Pipeline, events: &[PathBuf]) -> Result<Vec<InvocationResponse>> {
  let stdin = [PathBuf::from("-")];
  let events = if events.is_empty() { &stdin[..] } else { events };

  let mut responses = Vec::with_capacity(events.len());
  for path in events {
    let payload = read_event(path)?;
    let response = pipeline.handle_event(payload).await;
    print_response(&response)?;
    responses.push(response);
  }
  Ok(responses)
}

async fn process(pipeline: &Pipeline, uri: &str) -> Result<InvocationResponse> {
  let response = match ObjectLocator::parse_uri(uri) {
    Ok(locator) => pipeline.handle_object(&locator).await,
    Err(e) => InvocationResponse::failure(e),
  };
  print_response(&response)?;
  Ok(response)
}

fn read_event(path: &Path) -> Result<serde_json::Value> {
  let raw = if path == Path::new("-") {
    let mut raw = String::new();
    std::io::stdin().read_to_string(&mut raw).context("failed to read event from stdin")?;
    raw
  } else {
    std::fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?
  };

  serde_json::from_str(&raw).with_context(|| format!("{} is not valid JSON", path.display()))
}

fn print_response(response: &InvocationResponse) -> Result<()> {
  println!("{}", serde_json::to_string(response)?);
  Ok(())
}
