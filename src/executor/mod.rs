//! HTTP request executor.
//!
//! A thin `reqwest` passthrough: it sends a [`ResolvedRequest`] as-is and
//! records status, headers, body and duration. Non-2xx responses are
//! returned like any other response.

pub mod error;

pub use error::RequestError;

use crate::config::WorkbenchConfig;
use crate::models::{ExecutionResult, HttpMethod};
use crate::variables::ResolvedRequest;
use chrono::Utc;
use log::{debug, warn};
use std::time::Instant;

fn to_reqwest_method(method: HttpMethod) -> reqwest::Method {
    match method {
        HttpMethod::GET => reqwest::Method::GET,
        HttpMethod::POST => reqwest::Method::POST,
        HttpMethod::PUT => reqwest::Method::PUT,
        HttpMethod::DELETE => reqwest::Method::DELETE,
        HttpMethod::PATCH => reqwest::Method::PATCH,
    }
}

/// Builds an HTTP client honoring the timeout, user agent, redirect and TLS
/// settings.
pub fn build_client(config: &WorkbenchConfig) -> Result<reqwest::Client, RequestError> {
    let redirect = if config.follow_redirects {
        reqwest::redirect::Policy::default()
    } else {
        reqwest::redirect::Policy::none()
    };
    reqwest::Client::builder()
        .timeout(config.fetch_timeout())
        .user_agent(config.user_agent.as_str())
        .redirect(redirect)
        .danger_accept_invalid_certs(!config.validate_ssl)
        .build()
        .map_err(|e| RequestError::BuildError(e.to_string()))
}

/// Sends `request` and collects the response.
///
/// # Errors
///
/// Fails when the URL is not a valid http(s) URL, or when the request could
/// not be completed at all (connection, TLS, timeout).
pub async fn execute_request(
    request: &ResolvedRequest,
    config: &WorkbenchConfig,
) -> Result<ExecutionResult, RequestError> {
    let url = url::Url::parse(&request.url)?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(RequestError::UnsupportedProtocol(url.scheme().to_string()));
    }

    let client = build_client(config)?;
    let mut builder = client.request(to_reqwest_method(request.method), url);
    for (name, value) in &request.headers {
        builder = builder.header(name.as_str(), value.as_str());
    }
    if let Some(body) = &request.body {
        builder = builder.body(body.content.clone());
    }

    debug!("Sending {} {}", request.method, request.url);
    let start_time = Instant::now();
    let response = builder.send().await.map_err(|e| {
        warn!("{} {} failed: {}", request.method, request.url, e);
        RequestError::from(e)
    })?;

    let status = response.status();
    let headers = response
        .headers()
        .iter()
        .filter_map(|(name, value)| {
            value
                .to_str()
                .ok()
                .map(|v| (name.as_str().to_string(), v.to_string()))
        })
        .collect();
    let bytes = response.bytes().await?;
    let duration_ms = start_time.elapsed().as_millis() as u64;

    debug!(
        "{} {} -> {} in {} ms ({} bytes)",
        request.method,
        request.url,
        status.as_u16(),
        duration_ms,
        bytes.len()
    );

    Ok(ExecutionResult {
        status: status.as_u16(),
        status_text: status.canonical_reason().unwrap_or("Unknown").to_string(),
        headers,
        body: String::from_utf8_lossy(&bytes).into_owned(),
        duration_ms,
        received_at: Utc::now(),
    })
}
