//! Invocation result returned to the trigger

use serde::{Deserialize, Serialize};
use serde_json::json;

/// Response shape consumed by the caller; `body` is itself a JSON document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvocationResponse {
  #[serde(rename = "statusCode")]
  pub status_code: u16,
  pub body: String,
}

impl InvocationResponse {
  pub fn success(processed_count: usize) -> Self {
    let body = json!({
      "message": format!("Successfully processed {processed_count} feedback entries"),
      "processed_count": processed_count,
    });
    Self { status_code: 200, body: body.to_string() }
  }

  pub fn failure(error: impl ToString) -> Self {
    let body = json!({ "error": error.to_string() });
    Self { status_code: 500, body: body.to_string() }
  }

  pub fn is_success(&self) -> bool {
    self.status_code == 200
  }

  /// Decoded body
  pub fn body_json(&self) -> serde_json::Result<serde_json::Value> {
    serde_json::from_str(&self.body)
  }
}
