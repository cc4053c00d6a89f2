use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Response body recorded the first time a request id succeeded
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IdempotencyEntry {
    pub key: String,
    pub response: Value,
    pub created_at: DateTime<Utc>,
}

impl IdempotencyEntry {
    pub fn new(key: impl Into<String>, response: Value) -> Self {
        Self {
            key: key.into(),
            response,
            created_at: Utc::now(),
        }
    }
}
