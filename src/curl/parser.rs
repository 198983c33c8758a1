//! cURL command parser.
//!
//! Turns a pasted `curl` invocation into a [`ParsedCurlCommand`]. The command
//! is split into shell words first (respecting single, double and `$'...'`
//! quoting), then the words are interpreted as cURL flags.
//!
//! Parsing rules:
//!
//! - The URL is the first positional argument that was quoted and looks like a
//!   URL, otherwise the first positional argument.
//! - The query string is moved out of the URL into `params`.
//! - `-X`/`--request` sets the method (default `GET`); unknown methods are kept.
//! - Repeated headers with the same name (case-insensitive) collapse into one
//!   entry that keeps the position of the first and the value of the last.
//! - Body flags are taken by precedence `--data-raw`, `--data-binary`,
//!   `--data`, `-d`; JSON bodies are pretty-printed.
//! - A body without an explicit method flag promotes `GET` to `POST`.

use crate::models::{BodyType, HttpMethod, KeyValue, Request, RequestBody};
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use url::form_urlencoded;

/// Errors that can occur during cURL parsing.
#[derive(Debug, Clone, PartialEq)]
pub enum CurlParseError {
    /// The input string is empty or contains only whitespace.
    EmptyInput,
    /// The command doesn't start with "curl".
    NotACurlCommand,
    /// No URL was found in the command.
    MissingUrl,
    /// A flag that needs a value was the last word of the command.
    MissingFlagValue(String),
    /// Quote mismatch in the command.
    UnbalancedQuotes,
}

impl std::fmt::Display for CurlParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CurlParseError::EmptyInput => write!(f, "Input is empty"),
            CurlParseError::NotACurlCommand => write!(f, "Command does not start with 'curl'"),
            CurlParseError::MissingUrl => write!(f, "No URL found in cURL command"),
            CurlParseError::MissingFlagValue(flag) => write!(f, "Missing value after {}", flag),
            CurlParseError::UnbalancedQuotes => write!(f, "Unbalanced quotes in command"),
        }
    }
}

impl std::error::Error for CurlParseError {}

/// Result of parsing a cURL command. Never stored directly; convert it with
/// [`ParsedCurlCommand::into_request`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParsedCurlCommand {
    /// Uppercased method. May be a method the workbench does not support.
    pub method: String,
    /// URL without its query string.
    pub url: String,
    pub headers: Vec<KeyValue>,
    pub params: Vec<KeyValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<RequestBody>,
}

impl ParsedCurlCommand {
    /// Converts the parse result into a request owned by `folder_id`.
    ///
    /// Methods outside the supported set fall back to `GET`.
    pub fn into_request(self, name: impl Into<String>, folder_id: impl Into<String>) -> Request {
        let method = HttpMethod::from_str_or_get(&self.method);
        let mut request = Request::new(name, method, self.url, folder_id);
        request.headers = self.headers;
        request.params = self.params;
        request.body = self.body;
        request
    }
}

/// A shell word and whether it began with a quote.
#[derive(Debug, Clone, PartialEq)]
struct Token {
    text: String,
    quoted: bool,
}

/// Body flags in precedence order. The first flag kind present wins.
const DATA_FLAGS: &[&str] = &[
    "--data-raw",
    "--data-binary",
    "--data",
    "-d",
    "--data-ascii",
    "--data-urlencode",
];

/// Flags whose value is irrelevant to the request but must be skipped.
const IGNORED_VALUE_FLAGS: &[&str] = &[
    "-o",
    "--output",
    "-w",
    "--write-out",
    "-m",
    "--max-time",
    "--connect-timeout",
    "-x",
    "--proxy",
    "-E",
    "--cert",
    "--cacert",
    "--key",
    "-F",
    "--form",
    "-T",
    "--upload-file",
    "-r",
    "--range",
    "-c",
    "--cookie-jar",
    "--retry",
    "--limit-rate",
    "--resolve",
    "--interface",
    "-K",
    "--config",
    "--max-redirs",
];

const KNOWN_METHODS: &[&str] = &[
    "GET", "POST", "PUT", "DELETE", "PATCH", "HEAD", "OPTIONS", "TRACE", "CONNECT",
];

/// Parses a cURL command, returning `None` when the input cannot be used.
///
/// The reason for a failure is logged at debug level; use
/// [`try_parse_curl`] to inspect it.
///
/// # Examples
///
/// ```
/// use rest_workbench::curl::parse_curl;
///
/// let parsed = parse_curl("curl 'https://api.example.com/users?page=1'").unwrap();
/// assert_eq!(parsed.method, "GET");
/// assert_eq!(parsed.url, "https://api.example.com/users");
/// assert_eq!(parsed.params[0].key, "page");
///
/// assert!(parse_curl("wget https://example.com").is_none());
/// ```
pub fn parse_curl(command: &str) -> Option<ParsedCurlCommand> {
    match try_parse_curl(command) {
        Ok(parsed) => Some(parsed),
        Err(e) => {
            debug!("cURL import failed: {}", e);
            None
        }
    }
}

/// Parses a cURL command, reporting which stage failed.
pub fn try_parse_curl(command: &str) -> Result<ParsedCurlCommand, CurlParseError> {
    let cleaned = command
        .replace("\\\r\n", " ")
        .replace("\\\n", " ");
    let trimmed = cleaned.trim();

    if trimmed.is_empty() {
        return Err(CurlParseError::EmptyInput);
    }

    let tokens = tokenize(trimmed)?;
    match tokens.first() {
        Some(first) if first.text.eq_ignore_ascii_case("curl") => {}
        _ => return Err(CurlParseError::NotACurlCommand),
    }

    parse_tokens(&tokens[1..])
}

/// Splits a command line into shell words.
fn tokenize(input: &str) -> Result<Vec<Token>, CurlParseError> {
    #[derive(Clone, Copy, PartialEq)]
    enum Quote {
        None,
        Single,
        Double,
        AnsiC,
    }

    let chars: Vec<char> = input.chars().collect();
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut quoted = false;
    let mut in_token = false;
    let mut quote = Quote::None;
    let mut i = 0;

    while i < chars.len() {
        let ch = chars[i];
        match quote {
            Quote::Single => {
                if ch == '\'' {
                    quote = Quote::None;
                } else {
                    current.push(ch);
                }
            }
            Quote::AnsiC => match ch {
                '\'' => quote = Quote::None,
                '\\' if i + 1 < chars.len() => {
                    i += 1;
                    current.push(match chars[i] {
                        'n' => '\n',
                        't' => '\t',
                        'r' => '\r',
                        other => other,
                    });
                }
                _ => current.push(ch),
            },
            Quote::Double => match ch {
                '"' => quote = Quote::None,
                '\\' if i + 1 < chars.len() && matches!(chars[i + 1], '"' | '\\' | '$' | '`') => {
                    i += 1;
                    current.push(chars[i]);
                }
                _ => current.push(ch),
            },
            Quote::None => match ch {
                '\'' => {
                    quote = Quote::Single;
                    quoted |= !in_token;
                    in_token = true;
                }
                '"' => {
                    quote = Quote::Double;
                    quoted |= !in_token;
                    in_token = true;
                }
                '$' if chars.get(i + 1) == Some(&'\'') => {
                    quote = Quote::AnsiC;
                    quoted |= !in_token;
                    in_token = true;
                    i += 1;
                }
                '\\' if i + 1 < chars.len() => {
                    i += 1;
                    current.push(chars[i]);
                    in_token = true;
                }
                c if c.is_whitespace() => {
                    if in_token {
                        tokens.push(Token {
                            text: std::mem::take(&mut current),
                            quoted,
                        });
                        quoted = false;
                        in_token = false;
                    }
                }
                c => {
                    current.push(c);
                    in_token = true;
                }
            },
        }
        i += 1;
    }

    if quote != Quote::None {
        return Err(CurlParseError::UnbalancedQuotes);
    }
    if in_token {
        tokens.push(Token {
            text: current,
            quoted,
        });
    }

    Ok(tokens)
}

fn looks_like_url(s: &str) -> bool {
    s.starts_with("http://") || s.starts_with("https://") || s.contains("://")
}

/// Splits `--flag=value` into its parts; short flags are returned whole.
fn split_long_flag(text: &str) -> (&str, Option<&str>) {
    if text.starts_with("--") {
        if let Some((flag, value)) = text.split_once('=') {
            return (flag, Some(value));
        }
    }
    (text, None)
}

/// Interprets the words after `curl`.
fn parse_tokens(tokens: &[Token]) -> Result<ParsedCurlCommand, CurlParseError> {
    let mut method: Option<String> = None;
    let mut positional: Vec<&Token> = Vec::new();
    let mut explicit_url: Option<String> = None;
    let mut headers: Vec<KeyValue> = Vec::new();
    let mut data: Vec<(&'static str, String)> = Vec::new();

    let mut i = 0;
    while i < tokens.len() {
        let token = &tokens[i];
        let text = token.text.as_str();

        if token.quoted || !text.starts_with('-') || text == "-" {
            positional.push(token);
            i += 1;
            continue;
        }

        let (flag, inline) = split_long_flag(text);

        // -XPOST and -H'Accept: x' style attached short values
        let (flag, inline) = if inline.is_none()
            && !flag.starts_with("--")
            && flag.len() > 2
            && matches!(
                flag.get(..2),
                Some("-X" | "-H" | "-d" | "-u" | "-A" | "-b" | "-e")
            )
        {
            (&flag[..2], Some(&text[2..]))
        } else {
            (flag, inline)
        };

        let take_value = |i: &mut usize| -> Result<String, CurlParseError> {
            if let Some(v) = inline {
                return Ok(v.to_string());
            }
            *i += 1;
            tokens
                .get(*i)
                .map(|t| t.text.clone())
                .ok_or_else(|| CurlParseError::MissingFlagValue(flag.to_string()))
        };

        match flag {
            "-X" | "--request" => {
                let value = take_value(&mut i)?.trim().to_uppercase();
                if !KNOWN_METHODS.contains(&value.as_str()) {
                    warn!("Unrecognized HTTP method '{}' in cURL command", value);
                }
                method = Some(value);
            }
            "-H" | "--header" => {
                let value = take_value(&mut i)?;
                push_header(&mut headers, &value);
            }
            "-A" | "--user-agent" => {
                let value = take_value(&mut i)?;
                upsert_header(&mut headers, "User-Agent", value);
            }
            "-e" | "--referer" => {
                let value = take_value(&mut i)?;
                upsert_header(&mut headers, "Referer", value);
            }
            "-b" | "--cookie" => {
                let value = take_value(&mut i)?;
                upsert_header(&mut headers, "Cookie", value);
            }
            "-u" | "--user" => {
                let credentials = take_value(&mut i)?;
                upsert_header(
                    &mut headers,
                    "Authorization",
                    format!("Basic {}", base64_encode(&credentials)),
                );
            }
            "--url" => {
                let value = take_value(&mut i)?;
                explicit_url.get_or_insert(value);
            }
            f if DATA_FLAGS.contains(&f) => {
                let value = take_value(&mut i)?;
                let kind = DATA_FLAGS.iter().find(|d| **d == f).copied().unwrap_or("-d");
                data.push((kind, value));
            }
            f if IGNORED_VALUE_FLAGS.contains(&f) => {
                take_value(&mut i)?;
                debug!("Ignoring cURL flag {}", f);
            }
            other => {
                debug!("Ignoring cURL flag {}", other);
            }
        }

        i += 1;
    }

    let raw_url = explicit_url
        .or_else(|| {
            positional
                .iter()
                .find(|t| t.quoted && looks_like_url(&t.text))
                .or_else(|| positional.iter().find(|t| !t.text.is_empty()))
                .map(|t| t.text.clone())
        })
        .ok_or(CurlParseError::MissingUrl)?;

    let (url, params) = split_query(raw_url.trim());
    if url.is_empty() {
        return Err(CurlParseError::MissingUrl);
    }

    let body = DATA_FLAGS
        .iter()
        .find_map(|kind| data.iter().find(|(k, _)| k == kind))
        .map(|(_, value)| build_body(value));

    let method = match method {
        Some(m) => m,
        None if body.is_some() => "POST".to_string(),
        None => "GET".to_string(),
    };

    Ok(ParsedCurlCommand {
        method,
        url,
        headers,
        params,
        body,
    })
}

/// Adds a `Key: Value` header, skipping malformed entries.
fn push_header(headers: &mut Vec<KeyValue>, raw: &str) {
    let Some((key, value)) = raw.split_once(':') else {
        warn!("Skipping malformed header (no colon): {}", raw);
        return;
    };
    let key = key.trim();
    if key.is_empty() {
        warn!("Skipping malformed header (empty name): {}", raw);
        return;
    }
    upsert_header(headers, key, value.trim().to_string());
}

/// Last value wins, first position is kept.
fn upsert_header(headers: &mut Vec<KeyValue>, key: &str, value: String) {
    match headers.iter_mut().find(|h| h.key.eq_ignore_ascii_case(key)) {
        Some(existing) => existing.value = value,
        None => headers.push(KeyValue::new(key, value)),
    }
}

/// Splits `scheme://host/path?query#fragment` into the bare URL and decoded params.
pub(crate) fn split_query(raw: &str) -> (String, Vec<KeyValue>) {
    let without_fragment = raw.split('#').next().unwrap_or(raw);
    match without_fragment.split_once('?') {
        Some((base, query)) => {
            let params = form_urlencoded::parse(query.as_bytes())
                .map(|(k, v)| KeyValue::new(k.into_owned(), v.into_owned()))
                .collect();
            (base.to_string(), params)
        }
        None => (without_fragment.to_string(), Vec::new()),
    }
}

fn looks_like_json(s: &str) -> bool {
    (s.starts_with('{') && s.ends_with('}')) || (s.starts_with('[') && s.ends_with(']'))
}

fn looks_like_form(s: &str) -> bool {
    !s.is_empty()
        && !s.contains(char::is_whitespace)
        && s.split('&').all(|pair| pair.contains('=') && !pair.starts_with('='))
}

/// Pretty-prints JSON bodies; anything else is kept verbatim.
fn build_body(raw: &str) -> RequestBody {
    let trimmed = raw.trim();
    if looks_like_json(trimmed) {
        if let Ok(value) = serde_json::from_str::<serde_json::Value>(trimmed) {
            if let Ok(pretty) = serde_json::to_string_pretty(&value) {
                return RequestBody::json(pretty);
            }
        }
        return RequestBody::raw(raw);
    }
    if looks_like_form(trimmed) {
        return RequestBody::new(BodyType::Form, raw);
    }
    RequestBody::raw(raw)
}

/// Base64 encodes a string (for Basic authentication).
fn base64_encode(input: &str) -> String {
    use base64::{engine::general_purpose, Engine as _};
    general_purpose::STANDARD.encode(input.as_bytes())
}
