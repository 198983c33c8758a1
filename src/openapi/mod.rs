//! OpenAPI 3.x import.
//!
//! Every `get`/`post`/`put`/`delete`/`patch` operation becomes a request
//! template rooted at `{{baseUrl}}`. Security schemes are promoted to
//! environment variables and headers so imported requests authenticate once
//! the user fills in the values.
//!
//! # Examples
//!
//! ```
//! use rest_workbench::openapi::parse_openapi_document;
//! use serde_json::json;
//!
//! let parsed = parse_openapi_document(&json!({
//!     "info": {"title": "Users"},
//!     "servers": [{"url": "https://api.example.com"}],
//!     "paths": {"/users": {"get": {"summary": "List users"}}}
//! }))
//! .unwrap();
//!
//! assert_eq!(parsed.requests[0].name, "List users");
//! assert_eq!(parsed.requests[0].url, "{{baseUrl}}/users");
//! ```

pub mod fetch;
pub mod parser;
pub mod schema;

pub use fetch::{fetch_spec, parse_openapi};
pub use parser::{
    parse_openapi_document, ParsedOpenApi, ParsedOpenApiRequest, BASE_URL_VARIABLE,
    BEARER_TOKEN_VARIABLE,
};
pub use schema::generate_example;

use std::fmt;

/// Errors raised while importing an OpenAPI document.
#[derive(Debug)]
pub enum OpenApiError {
    /// The server answered with a non-2xx status.
    Fetch { status: u16, status_text: String },

    /// Connection or transport failure.
    Network(String),

    /// The fetch exceeded the configured timeout.
    Timeout,

    /// The document is not JSON or its root is not an object.
    Parse(String),

    /// Neither a URL nor an inline document was supplied.
    MissingSource,
}

impl fmt::Display for OpenApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OpenApiError::Fetch {
                status,
                status_text,
            } => write!(
                f,
                "Failed to fetch OpenAPI spec: {} ({})",
                status_text, status
            ),
            OpenApiError::Network(msg) => write!(f, "Failed to fetch OpenAPI spec: {}", msg),
            OpenApiError::Timeout => write!(f, "Failed to fetch OpenAPI spec: request timed out"),
            OpenApiError::Parse(msg) => write!(f, "Failed to parse OpenAPI spec: {}", msg),
            OpenApiError::MissingSource => {
                write!(f, "Either a spec URL or a spec document is required")
            }
        }
    }
}

impl std::error::Error for OpenApiError {}

impl From<reqwest::Error> for OpenApiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            OpenApiError::Timeout
        } else {
            OpenApiError::Network(err.to_string())
        }
    }
}

impl From<serde_json::Error> for OpenApiError {
    fn from(err: serde_json::Error) -> Self {
        OpenApiError::Parse(err.to_string())
    }
}
