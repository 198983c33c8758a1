//! OpenAPI 3.x document to request templates.

use super::schema::{generate_example, resolve};
use super::OpenApiError;
use crate::models::{HttpMethod, KeyValue, Request, RequestBody};
use log::debug;
use serde::Serialize;
use serde_json::Value;

/// Name of the variable every generated URL is rooted at.
pub const BASE_URL_VARIABLE: &str = "baseUrl";

/// Variable the bearer security scheme is promoted to.
pub const BEARER_TOKEN_VARIABLE: &str = "bearerToken";

const DEFAULT_TITLE: &str = "Imported API";
const JSON_MEDIA_TYPE: &str = "application/json";

/// Result of importing an OpenAPI document.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ParsedOpenApi {
    pub title: String,
    pub description: String,
    /// `servers[0].url`, empty when the document declares no servers.
    pub base_url: String,
    pub requests: Vec<ParsedOpenApiRequest>,
    /// Variables inferred from the servers and security schemes.
    pub variables: Vec<KeyValue>,
    /// Headers inferred from the security schemes.
    pub headers: Vec<KeyValue>,
}

/// One operation of one path.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ParsedOpenApiRequest {
    pub name: String,
    pub method: HttpMethod,
    /// `{{baseUrl}}` followed by the templated path.
    pub url: String,
    pub headers: Vec<KeyValue>,
    pub params: Vec<KeyValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<RequestBody>,
    /// First tag of the operation, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
}

impl ParsedOpenApiRequest {
    pub fn into_request(self, folder_id: impl Into<String>) -> Request {
        let mut request = Request::new(self.name, self.method, self.url, folder_id);
        request.headers = self.headers;
        request.params = self.params;
        request.body = self.body;
        request
    }
}

/// Query parameter every request gets from an `apiKey`-in-query scheme.
struct QueryKey {
    name: String,
}

/// Converts an already loaded OpenAPI document.
///
/// Only a non-object root is an error. Missing `paths`, `parameters`,
/// `requestBody` or `components` simply produce fewer requests and variables.
pub fn parse_openapi_document(document: &Value) -> Result<ParsedOpenApi, OpenApiError> {
    if !document.is_object() {
        return Err(OpenApiError::Parse(
            "OpenAPI document must be a JSON object".to_string(),
        ));
    }

    let info = document.get("info");
    let title = info
        .and_then(|i| i.get("title"))
        .and_then(Value::as_str)
        .unwrap_or(DEFAULT_TITLE)
        .to_string();
    let description = info
        .and_then(|i| i.get("description"))
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    let base_url = document
        .get("servers")
        .and_then(Value::as_array)
        .and_then(|servers| servers.first())
        .and_then(|server| server.get("url"))
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();

    let mut variables = vec![KeyValue::new(BASE_URL_VARIABLE, base_url.clone())];
    let mut headers = Vec::new();
    let mut query_keys = Vec::new();
    promote_security_schemes(document, &mut variables, &mut headers, &mut query_keys);

    let mut requests = Vec::new();
    if let Some(paths) = document.get("paths").and_then(Value::as_object) {
        for (path, item) in paths {
            let Some(item) = resolve(document, item) else {
                continue;
            };
            for method in HttpMethod::ALL {
                let key = method.as_str().to_lowercase();
                if let Some(operation) = item.get(&key).filter(|op| op.is_object()) {
                    let mut request = parse_operation(document, path, method, item, operation);
                    for query_key in &query_keys {
                        request.params.push(KeyValue::new(
                            query_key.name.clone(),
                            placeholder(&query_key.name),
                        ));
                    }
                    requests.push(request);
                }
            }
        }
    }

    debug!(
        "Parsed OpenAPI document '{}' with {} operations",
        title,
        requests.len()
    );
    Ok(ParsedOpenApi {
        title,
        description,
        base_url,
        requests,
        variables,
        headers,
    })
}

fn placeholder(name: &str) -> String {
    format!("{{{{{}}}}}", name)
}

fn parse_operation(
    document: &Value,
    path: &str,
    method: HttpMethod,
    path_item: &Value,
    operation: &Value,
) -> ParsedOpenApiRequest {
    // a present but empty summary is kept as the name
    let name = ["summary", "description"]
        .iter()
        .find_map(|field| operation.get(*field).and_then(Value::as_str))
        .map(str::to_string)
        .unwrap_or_else(|| format!("{} {}", method, path));

    let mut request = ParsedOpenApiRequest {
        name,
        method,
        url: format!("{}{}", placeholder(BASE_URL_VARIABLE), path),
        headers: Vec::new(),
        params: Vec::new(),
        body: None,
        tag: operation
            .get("tags")
            .and_then(Value::as_array)
            .and_then(|tags| tags.first())
            .and_then(Value::as_str)
            .map(str::to_string),
    };

    for parameter in merged_parameters(document, path_item, operation) {
        let Some(name) = parameter.get("name").and_then(Value::as_str) else {
            continue;
        };
        let required = parameter
            .get("required")
            .and_then(Value::as_bool)
            .unwrap_or(false);
        let entry = KeyValue::with_enabled(name, parameter_value(document, parameter), required);
        match parameter.get("in").and_then(Value::as_str) {
            Some("query") => request.params.push(entry),
            Some("header") => request.headers.push(entry),
            _ => {}
        }
    }

    if let Some(body) = json_body(document, operation) {
        request
            .headers
            .push(KeyValue::new("Content-Type", JSON_MEDIA_TYPE));
        request.body = Some(body);
    }

    request
}

/// Path-item parameters overlaid by operation parameters with the same
/// `name` and `in`.
fn merged_parameters<'a>(
    document: &'a Value,
    path_item: &'a Value,
    operation: &'a Value,
) -> Vec<&'a Value> {
    let resolved = |holder: &'a Value| -> Vec<&'a Value> {
        holder
            .get("parameters")
            .and_then(Value::as_array)
            .map(|params| params.iter().filter_map(|p| resolve(document, p)).collect())
            .unwrap_or_default()
    };

    let identity = |p: &Value| {
        (
            p.get("name").and_then(Value::as_str).map(str::to_string),
            p.get("in").and_then(Value::as_str).map(str::to_string),
        )
    };

    let operation_params = resolved(operation);
    let mut merged: Vec<&Value> = resolved(path_item)
        .into_iter()
        .filter(|shared| {
            !operation_params
                .iter()
                .any(|own| identity(*own) == identity(*shared))
        })
        .collect();
    merged.extend(operation_params);
    merged
}

/// Best-effort sample value: the parameter example, then the schema's
/// example or default, else empty.
fn parameter_value(document: &Value, parameter: &Value) -> String {
    let schema = parameter.get("schema").and_then(|s| resolve(document, s));
    let sample = parameter
        .get("example")
        .or_else(|| schema.and_then(|s| s.get("example")))
        .or_else(|| schema.and_then(|s| s.get("default")));
    match sample {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Null) | None => String::new(),
        Some(other) => other.to_string(),
    }
}

fn json_body(document: &Value, operation: &Value) -> Option<RequestBody> {
    let request_body = resolve(document, operation.get("requestBody")?)?;
    let media = request_body.get("content")?.get(JSON_MEDIA_TYPE)?;

    let example = match media.get("example") {
        Some(example) => example.clone(),
        None => generate_example(media.get("schema")?, document),
    };
    serde_json::to_string_pretty(&example)
        .ok()
        .map(RequestBody::json)
}

fn push_unique(entries: &mut Vec<KeyValue>, entry: KeyValue) {
    if !entries.iter().any(|e| e.key.eq_ignore_ascii_case(&entry.key)) {
        entries.push(entry);
    }
}

/// Turns `components.securitySchemes` into variables and headers.
fn promote_security_schemes(
    document: &Value,
    variables: &mut Vec<KeyValue>,
    headers: &mut Vec<KeyValue>,
    query_keys: &mut Vec<QueryKey>,
) {
    let Some(schemes) = document
        .get("components")
        .and_then(|c| c.get("securitySchemes"))
        .and_then(Value::as_object)
    else {
        return;
    };

    for (scheme_name, scheme) in schemes {
        let Some(scheme) = resolve(document, scheme) else {
            continue;
        };
        let kind = scheme.get("type").and_then(Value::as_str).unwrap_or_default();
        let http_scheme = scheme
            .get("scheme")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_lowercase();

        match (kind, http_scheme.as_str()) {
            ("http", "bearer") => {
                push_unique(variables, KeyValue::new(BEARER_TOKEN_VARIABLE, ""));
                push_unique(
                    headers,
                    KeyValue::new(
                        "Authorization",
                        format!("Bearer {}", placeholder(BEARER_TOKEN_VARIABLE)),
                    ),
                );
            }
            ("http", "basic") => {
                push_unique(variables, KeyValue::new("username", ""));
                push_unique(variables, KeyValue::new("password", ""));
            }
            ("apiKey", _) => {
                let Some(name) = scheme.get("name").and_then(Value::as_str) else {
                    continue;
                };
                match scheme.get("in").and_then(Value::as_str) {
                    Some("header") => {
                        push_unique(variables, KeyValue::new(name, ""));
                        push_unique(headers, KeyValue::new(name, placeholder(name)));
                    }
                    Some("query") => {
                        push_unique(variables, KeyValue::new(name, ""));
                        if !query_keys.iter().any(|k| k.name == name) {
                            query_keys.push(QueryKey {
                                name: name.to_string(),
                            });
                        }
                    }
                    other => debug!(
                        "Skipping apiKey scheme '{}' located in {:?}",
                        scheme_name, other
                    ),
                }
            }
            _ => debug!(
                "Security scheme '{}' of type '{}' is not promoted",
                scheme_name, kind
            ),
        }
    }
}
