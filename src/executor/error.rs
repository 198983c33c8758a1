//! HTTP request execution error types.

use std::fmt;

/// Errors that can occur while sending a resolved request.
///
/// A non-2xx response is not an error; it comes back as a normal
/// [`ExecutionResult`](crate::models::ExecutionResult).
#[derive(Debug)]
pub enum RequestError {
    /// Connection failures, DNS resolution errors and other network-level
    /// issues.
    NetworkError(String),

    /// Request took longer than the configured fetch timeout.
    Timeout,

    /// The URL could not be parsed. Usually a placeholder that did not
    /// resolve.
    InvalidUrl(String),

    /// Certificate validation or handshake failure.
    TlsError(String),

    /// The request could not be built from the resolved data.
    BuildError(String),

    /// Only HTTP and HTTPS are supported.
    UnsupportedProtocol(String),
}

impl fmt::Display for RequestError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RequestError::NetworkError(msg) => write!(f, "Network error: {}", msg),
            RequestError::Timeout => write!(f, "Request timed out"),
            RequestError::InvalidUrl(url) => write!(f, "Invalid URL: {}", url),
            RequestError::TlsError(msg) => write!(f, "TLS/SSL error: {}", msg),
            RequestError::BuildError(msg) => write!(f, "Request build error: {}", msg),
            RequestError::UnsupportedProtocol(protocol) => {
                write!(f, "Unsupported protocol: {}", protocol)
            }
        }
    }
}

impl std::error::Error for RequestError {}

impl From<reqwest::Error> for RequestError {
    fn from(err: reqwest::Error) -> Self {
        let message = err.to_string();
        if err.is_timeout() {
            RequestError::Timeout
        } else if err.is_builder() {
            RequestError::BuildError(message)
        } else if message.contains("certificate")
            || message.contains("TLS")
            || message.contains("SSL")
        {
            RequestError::TlsError(message)
        } else {
            RequestError::NetworkError(message)
        }
    }
}

impl From<url::ParseError> for RequestError {
    fn from(err: url::ParseError) -> Self {
        RequestError::InvalidUrl(err.to_string())
    }
}
