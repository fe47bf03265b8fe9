//! Process configuration, resolved once at startup

use thiserror::Error;

pub const TABLE_ENV: &str = "DYNAMODB_TABLE";
pub const REGION_ENV: &str = "AWS_REGION";
pub const LANGUAGE_CODE_ENV: &str = "PULSE_LANGUAGE_CODE";

pub const DEFAULT_REGION: &str = "us-east-1";
pub const DEFAULT_LANGUAGE_CODE: &str = "en";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
  #[error("{0} must not be empty")]
  Empty(&'static str),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
  /// Target table for enriched records
  pub table_name: String,
  pub region: String,
  /// Language code sent with every annotation batch
  pub language_code: String,
}

impl Config {
  pub fn new(table_name: impl Into<String>) -> Self {
    Self {
      table_name: table_name.into(),
      region: DEFAULT_REGION.to_string(),
      language_code: DEFAULT_LANGUAGE_CODE.to_string(),
    }
  }

  pub fn with_region(mut self, region: impl Into<String>) -> Self {
    self.region = region.into();
    self
  }

  pub fn with_language_code(mut self, language_code: impl Into<String>) -> Self {
    self.language_code = language_code.into();
    self
  }

  /// Reject blank settings. Flags and their env fallbacks are resolved by the CLI.
  pub fn validate(&self) -> Result<(), ConfigError> {
    if self.table_name.trim().is_empty() {
      return Err(ConfigError::Empty(TABLE_ENV));
    }
    if self.region.trim().is_empty() {
      return Err(ConfigError::Empty(REGION_ENV));
    }
    if self.language_code.trim().is_empty() {
      return Err(ConfigError::Empty(LANGUAGE_CODE_ENV));
    }
    Ok(())
  }
}
