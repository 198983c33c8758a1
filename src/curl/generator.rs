//! cURL command generator.
//!
//! Converts a stored [`Request`] into a cURL command that
//! [`parse_curl`](super::parse_curl) reads back to the same request. Only
//! enabled headers and params are emitted.

use crate::models::{HttpMethod, Request};
use url::form_urlencoded;

/// Options for cURL command generation.
#[derive(Debug, Clone, Default)]
pub struct CurlOptions {
    /// Generate a compact single-line command
    pub compact: bool,
    /// Include verbose flag (-v)
    pub verbose: bool,
    /// Include insecure flag (-k) for HTTPS
    pub insecure: bool,
}

/// Generates a multi-line cURL command from a request.
///
/// # Examples
///
/// ```
/// use rest_workbench::curl::generate_curl_command;
/// use rest_workbench::models::{HttpMethod, Request, RequestBody};
///
/// let mut request = Request::new("Create", HttpMethod::POST, "https://api.example.com/users", "f1");
/// request.add_header("Content-Type", "application/json");
/// request.set_body(RequestBody::json(r#"{"name":"John"}"#));
///
/// let curl = generate_curl_command(&request);
/// assert!(curl.starts_with("curl"));
/// assert!(curl.contains("-X POST"));
/// ```
pub fn generate_curl_command(request: &Request) -> String {
    generate_curl_with_options(request, &CurlOptions::default())
}

/// Generates a compact single-line cURL command.
pub fn generate_curl_command_compact(request: &Request) -> String {
    generate_curl_with_options(
        request,
        &CurlOptions {
            compact: true,
            ..Default::default()
        },
    )
}

/// Converts a request to cURL with custom formatting options.
pub fn generate_curl_with_options(request: &Request, options: &CurlOptions) -> String {
    let mut parts = vec!["curl".to_string()];

    if options.verbose {
        parts.push("-v".to_string());
    }
    if options.insecure && request.url.starts_with("https://") {
        parts.push("-k".to_string());
    }

    // GET with a body needs an explicit flag, or the parser promotes it to POST
    if request.method != HttpMethod::GET || request.body.is_some() {
        parts.push(format!("-X {}", request.method.as_str()));
    }

    for header in request.enabled_headers() {
        parts.push(format!(
            "-H {}",
            escape_shell_arg(&format!("{}: {}", header.key, header.value))
        ));
    }

    if let Some(body) = &request.body {
        parts.push(format!("--data-raw {}", escape_shell_arg(&body.content)));
    }

    parts.push(escape_shell_arg(&full_url(request)));

    if options.compact {
        parts.join(" ")
    } else {
        format_multiline(&parts)
    }
}

/// URL with enabled params re-attached as a query string.
fn full_url(request: &Request) -> String {
    let query = form_urlencoded::Serializer::new(String::new())
        .extend_pairs(request.enabled_params().map(|p| (&p.key, &p.value)))
        .finish();
    if query.is_empty() {
        request.url.clone()
    } else {
        format!("{}?{}", request.url, query)
    }
}

/// Escapes a string for safe use in shell commands.
///
/// Uses single quotes for safety, escaping any embedded single quotes.
fn escape_shell_arg(arg: &str) -> String {
    if needs_quoting(arg) {
        // Replace ' with '\''
        format!("'{}'", arg.replace('\'', "'\\''"))
    } else {
        arg.to_string()
    }
}

/// Checks if a string needs quoting for shell safety.
fn needs_quoting(s: &str) -> bool {
    let special_chars = [
        ' ', '\t', '\n', '\r', '|', '&', ';', '<', '>', '(', ')', '$', '`', '\\', '"', '\'', '*',
        '?', '[', ']', '#', '~', '=', '%', '{', '}',
    ];

    s.is_empty() || s.chars().any(|c| special_chars.contains(&c))
}

/// Formats cURL command parts into a multi-line string with backslash continuations.
fn format_multiline(parts: &[String]) -> String {
    let single_line = parts.join(" ");
    if single_line.len() <= 80 {
        return single_line;
    }

    let mut result = parts[0].clone();
    for part in &parts[1..] {
        result.push_str(" \\\n  ");
        result.push_str(part);
    }
    result
}
