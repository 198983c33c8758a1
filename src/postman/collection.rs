//! Postman collection parsing.
//!
//! Postman folders nest arbitrarily deep; the workbench shows one level of
//! folders per collection. Top-level folders become folders, and requests
//! found deeper are lifted into their top-level folder with the intermediate
//! folder names prefixed (`"Child / Request"`). Requests at the collection
//! root land in a synthetic [`GENERAL_FOLDER`].

use super::{scalar_to_string, text_of, PostmanError};
use crate::models::{BodyType, HttpMethod, KeyValue, Request, RequestBody};
use log::debug;
use serde::Serialize;
use serde_json::Value;
use url::form_urlencoded;

/// Folder that collects requests sitting directly at the collection root.
pub const GENERAL_FOLDER: &str = "General";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParsedPostmanCollection {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub folders: Vec<ParsedPostmanFolder>,
    /// Collection-level variables.
    pub variables: Vec<KeyValue>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParsedPostmanFolder {
    pub name: String,
    pub requests: Vec<ParsedPostmanRequest>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParsedPostmanRequest {
    pub name: String,
    /// Uppercased method as written in the export.
    pub method: String,
    pub url: String,
    pub headers: Vec<KeyValue>,
    pub params: Vec<KeyValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<RequestBody>,
    /// Post-response (`test`) script.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub script: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl ParsedPostmanRequest {
    /// Converts the parse result into a request owned by `folder_id`.
    pub fn into_request(self, folder_id: impl Into<String>) -> Request {
        let method = HttpMethod::from_str_or_get(&self.method);
        let mut request = Request::new(self.name, method, self.url, folder_id);
        request.headers = self.headers;
        request.params = self.params;
        request.body = self.body;
        request.script = self.script;
        request
    }
}

impl ParsedPostmanCollection {
    /// Total number of requests across all folders.
    pub fn request_count(&self) -> usize {
        self.folders.iter().map(|f| f.requests.len()).sum()
    }
}

/// Parses a Postman collection from its JSON text.
pub fn parse_collection_str(json: &str) -> Result<ParsedPostmanCollection, PostmanError> {
    let value: Value = serde_json::from_str(json)?;
    parse_collection(&value)
}

/// Parses a Postman v2.1 collection document.
///
/// # Errors
///
/// Returns [`PostmanError::InvalidCollection`] when `info` is not an object or
/// `item` is not an array.
///
/// # Examples
///
/// ```
/// use rest_workbench::postman::parse_collection;
/// use serde_json::json;
///
/// let collection = parse_collection(&json!({
///     "info": {"name": "Demo"},
///     "item": [{"name": "Ping", "request": {"method": "get", "url": "https://x.io/ping"}}]
/// }))
/// .unwrap();
///
/// assert_eq!(collection.folders[0].name, "General");
/// assert_eq!(collection.folders[0].requests[0].method, "GET");
/// ```
pub fn parse_collection(json: &Value) -> Result<ParsedPostmanCollection, PostmanError> {
    let info = json
        .get("info")
        .filter(|v| v.is_object())
        .ok_or_else(|| PostmanError::InvalidCollection("missing 'info' object".to_string()))?;
    let items = json
        .get("item")
        .and_then(Value::as_array)
        .ok_or_else(|| PostmanError::InvalidCollection("missing 'item' array".to_string()))?;

    let mut collection = ParsedPostmanCollection {
        name: info
            .get("name")
            .and_then(Value::as_str)
            .unwrap_or("Imported Collection")
            .to_string(),
        description: text_of(info.get("description")),
        folders: Vec::new(),
        variables: parse_variables(json.get("variable")),
    };

    for item in items {
        match item.get("item").and_then(Value::as_array) {
            Some(children) => {
                let mut folder = ParsedPostmanFolder {
                    name: item_name(item),
                    requests: Vec::new(),
                };
                collect_requests(children, "", &mut folder.requests);
                collection.folders.push(folder);
            }
            None => {
                let Some(request) = parse_request(item, "") else {
                    continue;
                };
                let index = match collection
                    .folders
                    .iter()
                    .position(|f| f.name == GENERAL_FOLDER)
                {
                    Some(index) => index,
                    None => {
                        collection.folders.push(ParsedPostmanFolder {
                            name: GENERAL_FOLDER.to_string(),
                            requests: Vec::new(),
                        });
                        collection.folders.len() - 1
                    }
                };
                collection.folders[index].requests.push(request);
            }
        }
    }

    debug!(
        "Parsed Postman collection '{}' with {} folders",
        collection.name,
        collection.folders.len()
    );
    Ok(collection)
}

fn item_name(item: &Value) -> String {
    item.get("name")
        .and_then(Value::as_str)
        .unwrap_or("Untitled")
        .to_string()
}

/// Walks nested folders, prefixing request names with the folder path below
/// the top-level folder.
fn collect_requests(items: &[Value], prefix: &str, out: &mut Vec<ParsedPostmanRequest>) {
    for item in items {
        match item.get("item").and_then(Value::as_array) {
            Some(children) => {
                let path = format!("{}{} / ", prefix, item_name(item));
                collect_requests(children, &path, out);
            }
            None => {
                if let Some(request) = parse_request(item, prefix) {
                    out.push(request);
                }
            }
        }
    }
}

/// Parses one request item. Items without a `request` are skipped.
fn parse_request(item: &Value, prefix: &str) -> Option<ParsedPostmanRequest> {
    let request = item.get("request")?;

    // v2.1 allows a bare URL string in place of the request object
    if request.is_string() {
        let (url, params) = parse_url(Some(request));
        return Some(ParsedPostmanRequest {
            name: format!("{}{}", prefix, item_name(item)),
            method: HttpMethod::GET.to_string(),
            url,
            headers: Vec::new(),
            params,
            body: None,
            script: parse_test_script(item.get("event")),
            description: None,
        });
    }

    let method = request
        .get("method")
        .and_then(Value::as_str)
        .unwrap_or("GET")
        .to_uppercase();
    let (url, params) = parse_url(request.get("url"));

    Some(ParsedPostmanRequest {
        name: format!("{}{}", prefix, item_name(item)),
        method,
        url,
        headers: parse_key_values(request.get("header")),
        params,
        body: parse_body(request.get("body")),
        script: parse_test_script(item.get("event")),
        description: text_of(request.get("description")),
    })
}

/// Reads `url` as either a string or the structured Postman URL object.
///
/// `raw` is kept verbatim when present; otherwise the URL is rebuilt from
/// host and path. Params come from `query[]` only, so a query written into
/// `raw` stays in the URL.
fn parse_url(url: Option<&Value>) -> (String, Vec<KeyValue>) {
    let Some(url) = url else {
        return (String::new(), Vec::new());
    };
    if let Some(raw) = url.as_str() {
        return (raw.to_string(), Vec::new());
    }

    let base = match url.get("raw").and_then(Value::as_str) {
        Some(raw) => raw.to_string(),
        None => rebuild_url(url),
    };
    (base, parse_key_values(url.get("query")))
}

fn join_parts(value: Option<&Value>, separator: &str) -> String {
    match value {
        Some(Value::Array(parts)) => parts
            .iter()
            .map(|p| scalar_to_string(Some(p)))
            .collect::<Vec<_>>()
            .join(separator),
        Some(Value::String(s)) => s.clone(),
        _ => String::new(),
    }
}

fn rebuild_url(url: &Value) -> String {
    let host = join_parts(url.get("host"), ".");
    let path = join_parts(url.get("path"), "/");
    let protocol = match url.get("protocol").and_then(Value::as_str) {
        Some(p) => p.to_string(),
        None if host.contains("localhost") || host.contains("127.0.0.1") => "http".to_string(),
        None => "https".to_string(),
    };
    let port = match url.get("port") {
        Some(p) => format!(":{}", scalar_to_string(Some(p))),
        None => String::new(),
    };

    let mut rebuilt = format!("{}://{}{}", protocol, host, port);
    if !path.is_empty() {
        if !path.starts_with('/') {
            rebuilt.push('/');
        }
        rebuilt.push_str(&path);
    }
    rebuilt
}

/// Reads `[{key, value, disabled}]` entries. Entries without a key are skipped.
fn parse_key_values(value: Option<&Value>) -> Vec<KeyValue> {
    let Some(entries) = value.and_then(Value::as_array) else {
        return Vec::new();
    };
    entries
        .iter()
        .filter_map(|entry| {
            let key = entry.get("key").and_then(Value::as_str)?;
            let disabled = entry
                .get("disabled")
                .and_then(Value::as_bool)
                .unwrap_or(false);
            Some(KeyValue::with_enabled(
                key,
                scalar_to_string(entry.get("value")),
                !disabled,
            ))
        })
        .collect()
}

/// Collection `variable[]` entries.
fn parse_variables(value: Option<&Value>) -> Vec<KeyValue> {
    parse_key_values(value)
}

fn parse_body(body: Option<&Value>) -> Option<RequestBody> {
    let body = body?;
    match body.get("mode").and_then(Value::as_str)? {
        "raw" => {
            let raw = body.get("raw").and_then(Value::as_str).unwrap_or_default();
            let language = body
                .get("options")
                .and_then(|o| o.get("raw"))
                .and_then(|r| r.get("language"))
                .and_then(Value::as_str);
            let is_json = language == Some("json")
                || serde_json::from_str::<Value>(raw).map_or(false, |v| v.is_object() || v.is_array());
            let body_type = if is_json { BodyType::Json } else { BodyType::Raw };
            Some(RequestBody::new(body_type, raw))
        }
        mode @ ("formdata" | "urlencoded") => {
            let fields: Vec<(String, String)> = body
                .get(mode)
                .and_then(Value::as_array)
                .map(|entries| {
                    entries
                        .iter()
                        .filter(|e| e.get("type").and_then(Value::as_str) != Some("file"))
                        .filter(|e| !e.get("disabled").and_then(Value::as_bool).unwrap_or(false))
                        .filter_map(|e| {
                            let key = e.get("key").and_then(Value::as_str)?;
                            Some((key.to_string(), scalar_to_string(e.get("value"))))
                        })
                        .collect()
                })
                .unwrap_or_default();
            let content = form_urlencoded::Serializer::new(String::new())
                .extend_pairs(fields.iter())
                .finish();
            Some(RequestBody::form(content))
        }
        "graphql" => {
            let graphql = body.get("graphql")?;
            let query = graphql.get("query").and_then(Value::as_str).unwrap_or_default();
            let variables = match graphql.get("variables") {
                Some(Value::String(s)) if !s.trim().is_empty() => {
                    serde_json::from_str(s).unwrap_or(Value::Null)
                }
                Some(v @ Value::Object(_)) => v.clone(),
                _ => Value::Null,
            };
            let payload = serde_json::json!({ "query": query, "variables": variables });
            serde_json::to_string_pretty(&payload)
                .ok()
                .map(RequestBody::json)
        }
        other => {
            debug!("Skipping unsupported Postman body mode '{}'", other);
            None
        }
    }
}

/// Joins the `exec` lines of the first `test` event.
fn parse_test_script(events: Option<&Value>) -> Option<String> {
    let events = events?.as_array()?;
    let event = events
        .iter()
        .find(|e| e.get("listen").and_then(Value::as_str) == Some("test"))?;
    let exec = event.get("script")?.get("exec")?;
    let script = match exec {
        Value::Array(lines) => lines
            .iter()
            .filter_map(Value::as_str)
            .collect::<Vec<_>>()
            .join("\n"),
        Value::String(s) => s.clone(),
        _ => return None,
    };
    if script.trim().is_empty() {
        None
    } else {
        Some(script)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_missing_info_or_item_is_error() {
        assert!(matches!(
            parse_collection(&json!({"item": []})),
            Err(PostmanError::InvalidCollection(_))
        ));
        assert!(matches!(
            parse_collection(&json!({"info": {"name": "x"}})),
            Err(PostmanError::InvalidCollection(_))
        ));
        assert!(matches!(
            parse_collection(&json!([])),
            Err(PostmanError::InvalidCollection(_))
        ));
        assert!(matches!(
            parse_collection_str("not json"),
            Err(PostmanError::Json(_))
        ));
    }

    #[test]
    fn test_nested_folders_flatten_into_top_level() {
        let collection = parse_collection(&json!({
            "info": {"name": "Nested"},
            "item": [{
                "name": "Parent",
                "item": [{
                    "name": "Child",
                    "item": [{
                        "name": "Request",
                        "request": {"method": "GET", "url": "https://x.io"}
                    }]
                }]
            }]
        }))
        .unwrap();

        assert_eq!(collection.folders.len(), 1);
        assert_eq!(collection.folders[0].name, "Parent");
        assert_eq!(collection.folders[0].requests.len(), 1);
        assert_eq!(collection.folders[0].requests[0].name, "Child / Request");
    }

    #[test]
    fn test_deep_nesting_joins_full_path() {
        let collection = parse_collection(&json!({
            "info": {"name": "Deep"},
            "item": [{
                "name": "A",
                "item": [
                    {"name": "direct", "request": {"method": "GET", "url": "https://x.io/1"}},
                    {"name": "B", "item": [{"name": "C", "item": [
                        {"name": "leaf", "request": {"method": "GET", "url": "https://x.io/2"}}
                    ]}]}
                ]
            }]
        }))
        .unwrap();

        let names: Vec<&str> = collection.folders[0]
            .requests
            .iter()
            .map(|r| r.name.as_str())
            .collect();
        assert_eq!(names, vec!["direct", "B / C / leaf"]);
    }

    #[test]
    fn test_root_requests_share_general_folder() {
        let collection = parse_collection(&json!({
            "info": {"name": "Mixed"},
            "item": [
                {"name": "one", "request": {"method": "get", "url": "https://x.io/1"}},
                {"name": "Folder", "item": []},
                {"name": "two", "request": {"method": "delete", "url": "https://x.io/2"}}
            ]
        }))
        .unwrap();

        assert_eq!(collection.folders.len(), 2);
        assert_eq!(collection.folders[0].name, GENERAL_FOLDER);
        assert_eq!(collection.folders[0].requests.len(), 2);
        assert_eq!(collection.folders[0].requests[1].method, "DELETE");
        assert_eq!(collection.request_count(), 2);
    }

    #[test]
    fn test_structured_url_rebuilt() {
        let (url, params) = parse_url(Some(&json!({
            "host": ["api", "example", "com"],
            "path": ["v1", "users"],
            "query": [
                {"key": "page", "value": "1"},
                {"key": "debug", "value": "true", "disabled": true}
            ]
        })));
        assert_eq!(url, "https://api.example.com/v1/users");
        assert_eq!(
            params,
            vec![
                KeyValue::new("page", "1"),
                KeyValue::with_enabled("debug", "true", false)
            ]
        );

        let (local, _) = parse_url(Some(&json!({
            "host": ["localhost"],
            "port": "3000",
            "path": ["health"]
        })));
        assert_eq!(local, "http://localhost:3000/health");
    }

    #[test]
    fn test_raw_url_is_kept_verbatim() {
        let (url, params) = parse_url(Some(&json!({
            "raw": "{{baseUrl}}/users?page=2",
            "host": ["ignored"],
            "query": [{"key": "page", "value": "2"}]
        })));
        assert_eq!(url, "{{baseUrl}}/users?page=2");
        assert_eq!(params, vec![KeyValue::new("page", "2")]);

        let (url, params) = parse_url(Some(&json!({"raw": "https://x.io/a?b=c"})));
        assert_eq!(url, "https://x.io/a?b=c");
        assert!(params.is_empty());

        let (url, params) = parse_url(Some(&json!("https://x.io/a?b=c")));
        assert_eq!(url, "https://x.io/a?b=c");
        assert!(params.is_empty());
    }

    #[test]
    fn test_headers_respect_disabled() {
        let headers = parse_key_values(Some(&json!([
            {"key": "Accept", "value": "application/json"},
            {"key": "X-Old", "value": "1", "disabled": true},
            {"value": "no key"}
        ])));
        assert_eq!(
            headers,
            vec![
                KeyValue::new("Accept", "application/json"),
                KeyValue::with_enabled("X-Old", "1", false)
            ]
        );
    }

    #[test]
    fn test_raw_body_types() {
        let by_language = parse_body(Some(&json!({
            "mode": "raw",
            "raw": "{not json",
            "options": {"raw": {"language": "json"}}
        })))
        .unwrap();
        assert_eq!(by_language.body_type, BodyType::Json);

        let by_content =
            parse_body(Some(&json!({"mode": "raw", "raw": "{\"a\": 1}"}))).unwrap();
        assert_eq!(by_content.body_type, BodyType::Json);

        let text = parse_body(Some(&json!({"mode": "raw", "raw": "hello"}))).unwrap();
        assert_eq!(text.body_type, BodyType::Raw);
        assert_eq!(text.content, "hello");
    }

    #[test]
    fn test_form_bodies() {
        let body = parse_body(Some(&json!({
            "mode": "urlencoded",
            "urlencoded": [
                {"key": "name", "value": "John Doe"},
                {"key": "skip", "value": "x", "disabled": true}
            ]
        })))
        .unwrap();
        assert_eq!(body.body_type, BodyType::Form);
        assert_eq!(body.content, "name=John+Doe");

        let multipart = parse_body(Some(&json!({
            "mode": "formdata",
            "formdata": [
                {"key": "file", "type": "file", "src": "/tmp/a"},
                {"key": "title", "value": "doc", "type": "text"}
            ]
        })))
        .unwrap();
        assert_eq!(multipart.body_type, BodyType::Form);
        assert_eq!(multipart.content, "title=doc");
    }

    #[test]
    fn test_graphql_body_becomes_json() {
        let body = parse_body(Some(&json!({
            "mode": "graphql",
            "graphql": {"query": "{ me { id } }", "variables": "{\"a\": 1}"}
        })))
        .unwrap();
        assert_eq!(body.body_type, BodyType::Json);
        let value: Value = serde_json::from_str(&body.content).unwrap();
        assert_eq!(value["variables"]["a"], 1);
    }

    #[test]
    fn test_unknown_body_mode_skipped() {
        assert_eq!(parse_body(Some(&json!({"mode": "file", "file": {}}))), None);
        assert_eq!(parse_body(Some(&json!({}))), None);
    }

    #[test]
    fn test_test_script_and_variables() {
        let collection = parse_collection(&json!({
            "info": {"name": "Scripts", "description": "demo"},
            "variable": [{"key": "baseUrl", "value": "https://x.io"}],
            "item": [{
                "name": "Login",
                "event": [
                    {"listen": "prerequest", "script": {"exec": ["ignored()"]}},
                    {"listen": "test", "script": {"exec": [
                        "const data = pm.response.json();",
                        "pm.environment.set('token', data.token);"
                    ]}}
                ],
                "request": {"method": "POST", "url": "{{baseUrl}}/login"}
            }]
        }))
        .unwrap();

        assert_eq!(collection.description.as_deref(), Some("demo"));
        assert_eq!(collection.variables, vec![KeyValue::new("baseUrl", "https://x.io")]);
        let request = &collection.folders[0].requests[0];
        assert_eq!(
            request.script.as_deref(),
            Some("const data = pm.response.json();\npm.environment.set('token', data.token);")
        );
    }

    #[test]
    fn test_into_request() {
        let parsed = ParsedPostmanRequest {
            name: "Ping".to_string(),
            method: "HEAD".to_string(),
            url: "https://x.io".to_string(),
            headers: vec![KeyValue::new("A", "b")],
            params: Vec::new(),
            body: None,
            script: Some("console.log(1)".to_string()),
            description: None,
        };
        let request = parsed.into_request("folder-1");
        assert_eq!(request.method, HttpMethod::GET);
        assert_eq!(request.script.as_deref(), Some("console.log(1)"));
        assert_eq!(request.folder_id, "folder-1");
    }
}
