//! Request data models.
//!
//! This module defines the normalized request shape that every importer
//! (cURL, Postman, OpenAPI) produces and that the executor consumes.

use serde::{Deserialize, Serialize};

/// HTTP request method.
///
/// The workbench stores requests with one of the five methods the request
/// editor offers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HttpMethod {
    /// HTTP GET method - retrieve a resource
    GET,
    /// HTTP POST method - submit data to create a resource
    POST,
    /// HTTP PUT method - replace a resource
    PUT,
    /// HTTP DELETE method - remove a resource
    DELETE,
    /// HTTP PATCH method - partially modify a resource
    PATCH,
}

impl HttpMethod {
    /// All supported methods, in the order the OpenAPI importer visits them.
    pub const ALL: [HttpMethod; 5] = [
        HttpMethod::GET,
        HttpMethod::POST,
        HttpMethod::PUT,
        HttpMethod::DELETE,
        HttpMethod::PATCH,
    ];

    /// Returns the string representation of the HTTP method.
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::GET => "GET",
            HttpMethod::POST => "POST",
            HttpMethod::PUT => "PUT",
            HttpMethod::DELETE => "DELETE",
            HttpMethod::PATCH => "PATCH",
        }
    }

    /// Parses a string into an HttpMethod, ignoring case.
    ///
    /// # Returns
    ///
    /// `Some(HttpMethod)` if the string is a supported method, `None` otherwise.
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "GET" => Some(HttpMethod::GET),
            "POST" => Some(HttpMethod::POST),
            "PUT" => Some(HttpMethod::PUT),
            "DELETE" => Some(HttpMethod::DELETE),
            "PATCH" => Some(HttpMethod::PATCH),
            _ => None,
        }
    }

    /// Parses an imported method, falling back to `GET` for methods the
    /// workbench cannot store.
    pub fn from_str_or_get(s: &str) -> Self {
        Self::from_str(s).unwrap_or_else(|| {
            log::warn!("Unsupported method '{}' imported as GET", s);
            HttpMethod::GET
        })
    }
}

impl std::fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl Default for HttpMethod {
    fn default() -> Self {
        HttpMethod::GET
    }
}

/// A header, query parameter or variable-like pair that can be toggled off.
///
/// Disabled entries are kept so the user can re-enable them, but they are
/// skipped by substitution and execution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyValue {
    pub key: String,
    pub value: String,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_enabled() -> bool {
    true
}

impl KeyValue {
    /// Creates an enabled entry.
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
            enabled: true,
        }
    }

    /// Creates an entry with an explicit enabled flag.
    pub fn with_enabled(key: impl Into<String>, value: impl Into<String>, enabled: bool) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
            enabled,
        }
    }
}

/// Finds the first enabled entry whose key matches `key` case-insensitively.
pub fn find_enabled<'a>(entries: &'a [KeyValue], key: &str) -> Option<&'a KeyValue> {
    entries
        .iter()
        .find(|kv| kv.enabled && kv.key.eq_ignore_ascii_case(key))
}

/// How a request body should be interpreted when it is sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BodyType {
    Json,
    Form,
    Raw,
}

impl BodyType {
    /// Content-Type header a body of this type implies.
    pub fn content_type(&self) -> &'static str {
        match self {
            BodyType::Json => "application/json",
            BodyType::Form => "application/x-www-form-urlencoded",
            BodyType::Raw => "text/plain",
        }
    }
}

/// Request body with its declared type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestBody {
    #[serde(rename = "type")]
    pub body_type: BodyType,
    pub content: String,
}

impl RequestBody {
    pub fn new(body_type: BodyType, content: impl Into<String>) -> Self {
        Self {
            body_type,
            content: content.into(),
        }
    }

    pub fn json(content: impl Into<String>) -> Self {
        Self::new(BodyType::Json, content)
    }

    pub fn raw(content: impl Into<String>) -> Self {
        Self::new(BodyType::Raw, content)
    }

    pub fn form(content: impl Into<String>) -> Self {
        Self::new(BodyType::Form, content)
    }
}

/// A stored request.
///
/// Every request is owned by exactly one folder; deleting the folder deletes
/// the request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Request {
    /// Unique identifier for this request.
    pub id: String,

    /// Display name shown in the sidebar.
    pub name: String,

    pub method: HttpMethod,

    /// Target URL without the query string.
    ///
    /// May contain `{{variableName}}` placeholders resolved at execution time.
    pub url: String,

    #[serde(default)]
    pub headers: Vec<KeyValue>,

    /// Query parameters, appended to `url` at execution time.
    #[serde(default)]
    pub params: Vec<KeyValue>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<RequestBody>,

    /// Post-response script run against the response of this request.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub script: Option<String>,

    /// Folder that owns this request.
    pub folder_id: String,
}

impl Request {
    /// Creates a new request with a random id and no headers, params or body.
    pub fn new(
        name: impl Into<String>,
        method: HttpMethod,
        url: impl Into<String>,
        folder_id: impl Into<String>,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            name: name.into(),
            method,
            url: url.into(),
            headers: Vec::new(),
            params: Vec::new(),
            body: None,
            script: None,
            folder_id: folder_id.into(),
        }
    }

    /// Adds an enabled header.
    pub fn add_header(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.headers.push(KeyValue::new(key, value));
    }

    /// Adds an enabled query parameter.
    pub fn add_param(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.params.push(KeyValue::new(key, value));
    }

    /// Sets the request body.
    pub fn set_body(&mut self, body: RequestBody) {
        self.body = Some(body);
    }

    /// Checks if the request has a non-empty body.
    pub fn has_body(&self) -> bool {
        self.body.as_ref().map_or(false, |b| !b.content.is_empty())
    }

    /// Gets the enabled Content-Type header value if present.
    pub fn content_type(&self) -> Option<&str> {
        find_enabled(&self.headers, "content-type").map(|kv| kv.value.as_str())
    }

    /// Headers that take part in execution.
    pub fn enabled_headers(&self) -> impl Iterator<Item = &KeyValue> {
        self.headers.iter().filter(|kv| kv.enabled)
    }

    /// Query parameters that take part in execution.
    pub fn enabled_params(&self) -> impl Iterator<Item = &KeyValue> {
        self.params.iter().filter(|kv| kv.enabled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_method_as_str() {
        assert_eq!(HttpMethod::GET.as_str(), "GET");
        assert_eq!(HttpMethod::POST.as_str(), "POST");
        assert_eq!(HttpMethod::DELETE.as_str(), "DELETE");
    }

    #[test]
    fn test_http_method_from_str() {
        assert_eq!(HttpMethod::from_str("GET"), Some(HttpMethod::GET));
        assert_eq!(HttpMethod::from_str("get"), Some(HttpMethod::GET));
        assert_eq!(HttpMethod::from_str("Patch"), Some(HttpMethod::PATCH));
        assert_eq!(HttpMethod::from_str("OPTIONS"), None);
    }

    #[test]
    fn test_http_method_from_str_or_get() {
        assert_eq!(HttpMethod::from_str_or_get("delete"), HttpMethod::DELETE);
        assert_eq!(HttpMethod::from_str_or_get("PURGE"), HttpMethod::GET);
    }

    #[test]
    fn test_http_method_display() {
        assert_eq!(format!("{}", HttpMethod::PUT), "PUT");
    }

    #[test]
    fn test_request_new() {
        let request = Request::new("List users", HttpMethod::GET, "https://example.com", "f1");

        assert!(!request.id.is_empty());
        assert_eq!(request.name, "List users");
        assert_eq!(request.folder_id, "f1");
        assert!(request.headers.is_empty());
        assert!(request.params.is_empty());
        assert_eq!(request.body, None);
        assert!(!request.has_body());
    }

    #[test]
    fn test_content_type_ignores_disabled() {
        let mut request = Request::new("r", HttpMethod::POST, "https://example.com", "f1");
        request
            .headers
            .push(KeyValue::with_enabled("Content-Type", "text/plain", false));
        assert_eq!(request.content_type(), None);

        request.add_header("content-type", "application/json");
        assert_eq!(request.content_type(), Some("application/json"));
    }

    #[test]
    fn test_enabled_params() {
        let mut request = Request::new("r", HttpMethod::GET, "https://example.com", "f1");
        request.add_param("page", "1");
        request
            .params
            .push(KeyValue::with_enabled("debug", "true", false));

        let keys: Vec<&str> = request.enabled_params().map(|p| p.key.as_str()).collect();
        assert_eq!(keys, vec!["page"]);
    }

    #[test]
    fn test_serialization_shape() {
        let mut request = Request::new("r", HttpMethod::POST, "https://example.com", "folder-9");
        request.set_body(RequestBody::json("{}"));

        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["folderId"], "folder-9");
        assert_eq!(json["body"]["type"], "json");
        assert!(json.get("script").is_none());

        let back: Request = serde_json::from_value(json).unwrap();
        assert_eq!(back, request);
    }

    #[test]
    fn test_key_value_enabled_defaults_true() {
        let kv: KeyValue = serde_json::from_str(r#"{"key":"a","value":"b"}"#).unwrap();
        assert!(kv.enabled);
    }
}
