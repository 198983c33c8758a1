//! Execution result data model.
//!
//! This is what the executor hands to the post-response script runner and to
//! the UI after a request completes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Outcome of executing one request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionResult {
    /// HTTP status code (e.g., 200, 404, 500).
    pub status: u16,

    /// HTTP status text (e.g., "OK", "Not Found").
    pub status_text: String,

    /// Response headers in the order the server sent them.
    #[serde(default)]
    pub headers: Vec<(String, String)>,

    /// Response body decoded as text.
    #[serde(default)]
    pub body: String,

    /// Total request duration in milliseconds.
    #[serde(default)]
    pub duration_ms: u64,

    /// When the response was received.
    pub received_at: DateTime<Utc>,
}

impl ExecutionResult {
    /// Creates a result with the given status, no headers and an empty body.
    pub fn new(status: u16, status_text: impl Into<String>) -> Self {
        Self {
            status,
            status_text: status_text.into(),
            headers: Vec::new(),
            body: String::new(),
            duration_ms: 0,
            received_at: Utc::now(),
        }
    }

    /// Builder-style body setter.
    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = body.into();
        self
    }

    /// Builder-style header setter.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Checks if the response status indicates success (2xx).
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Case-insensitive header lookup; the first matching header wins.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// The body parsed as JSON, or the raw string when it is not JSON.
    pub fn parsed_body(&self) -> serde_json::Value {
        serde_json::from_str(&self.body)
            .unwrap_or_else(|_| serde_json::Value::String(self.body.clone()))
    }
}
