//! Postman v2.1 collection and environment import.
//!
//! Exports are machine-generated, so a structurally invalid root (no
//! `info`/`item` for collections, no `name`/`values` for environments) is a
//! hard [`PostmanError`]. Anything optional that is missing or oddly shaped
//! inside an otherwise valid document is skipped.

pub mod collection;
pub mod environment;

pub use collection::{
    parse_collection, parse_collection_str, ParsedPostmanCollection, ParsedPostmanFolder,
    ParsedPostmanRequest, GENERAL_FOLDER,
};
pub use environment::{parse_environment, parse_environment_str, ParsedPostmanEnvironment};

/// Errors raised by the Postman importers.
#[derive(Debug, Clone, PartialEq)]
pub enum PostmanError {
    /// The collection root is missing `info` or `item`.
    InvalidCollection(String),

    /// The environment root is missing `name` or `values`.
    InvalidEnvironment(String),

    /// The input is not JSON at all.
    Json(String),
}

impl std::fmt::Display for PostmanError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PostmanError::InvalidCollection(msg) => {
                write!(f, "Invalid Postman collection format: {}", msg)
            }
            PostmanError::InvalidEnvironment(msg) => {
                write!(f, "Invalid Postman environment format: {}", msg)
            }
            PostmanError::Json(msg) => write!(f, "Failed to parse Postman JSON: {}", msg),
        }
    }
}

impl std::error::Error for PostmanError {}

impl From<serde_json::Error> for PostmanError {
    fn from(err: serde_json::Error) -> Self {
        PostmanError::Json(err.to_string())
    }
}

/// Reads a Postman value that may be a plain string or `{ "content": "..." }`.
pub(crate) fn text_of(value: Option<&serde_json::Value>) -> Option<String> {
    match value? {
        serde_json::Value::String(s) => Some(s.clone()),
        serde_json::Value::Object(map) => map
            .get("content")
            .and_then(|c| c.as_str())
            .map(str::to_string),
        _ => None,
    }
}

/// Stringifies a scalar Postman value; strings are returned without quotes.
pub(crate) fn scalar_to_string(value: Option<&serde_json::Value>) -> String {
    match value {
        None | Some(serde_json::Value::Null) => String::new(),
        Some(serde_json::Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_error_display() {
        assert_eq!(
            PostmanError::InvalidCollection("missing info".to_string()).to_string(),
            "Invalid Postman collection format: missing info"
        );
    }

    #[test]
    fn test_text_of() {
        assert_eq!(text_of(Some(&json!("plain"))), Some("plain".to_string()));
        assert_eq!(
            text_of(Some(&json!({"content": "rich", "type": "text/markdown"}))),
            Some("rich".to_string())
        );
        assert_eq!(text_of(Some(&json!(5))), None);
        assert_eq!(text_of(None), None);
    }

    #[test]
    fn test_scalar_to_string() {
        assert_eq!(scalar_to_string(Some(&json!("a"))), "a");
        assert_eq!(scalar_to_string(Some(&json!(42))), "42");
        assert_eq!(scalar_to_string(Some(&json!(true))), "true");
        assert_eq!(scalar_to_string(Some(&json!(null))), "");
        assert_eq!(scalar_to_string(None), "");
    }
}
