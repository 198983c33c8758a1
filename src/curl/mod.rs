//! cURL command parsing and generation.
//!
//! Pasted cURL commands are user-authored free text, so parsing never fails
//! loudly: [`parse_curl`] returns `None` and logs which stage went wrong.
//! [`try_parse_curl`] exposes the reason for callers that want to show it.
//!
//! # Examples
//!
//! ```
//! use rest_workbench::curl::parse_curl;
//!
//! let curl = r#"curl -X POST https://api.example.com/users \
//!   -H "Content-Type: application/json" \
//!   -d '{"name":"John Doe"}'"#;
//!
//! let parsed = parse_curl(curl).unwrap();
//! assert_eq!(parsed.method, "POST");
//! assert_eq!(parsed.url, "https://api.example.com/users");
//! ```
//!
//! # Supported cURL Flags
//!
//! - `-X`, `--request` - HTTP method
//! - `-H`, `--header` - HTTP headers
//! - `--data-raw`, `--data-binary`, `--data`, `-d` - Request body (in that precedence)
//! - `-u`, `--user` - Basic authentication (converted to an Authorization header)
//! - `-A`, `--user-agent`, `-e`, `--referer`, `-b`, `--cookie` - converted to headers
//! - `--url` - explicit URL
//! - Output and transport flags (`-o`, `-w`, `-m`, `--compressed`, `-k`, `-L`, ...) are ignored

pub mod generator;
pub mod parser;

pub use generator::{
    generate_curl_command, generate_curl_command_compact, generate_curl_with_options, CurlOptions,
};
pub use parser::{parse_curl, try_parse_curl, CurlParseError, ParsedCurlCommand};
