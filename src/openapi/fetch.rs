//! Remote retrieval of OpenAPI documents.

use super::parser::{parse_openapi_document, ParsedOpenApi};
use super::OpenApiError;
use crate::config::WorkbenchConfig;
use log::{info, warn};
use serde_json::Value;

/// Downloads and decodes an OpenAPI document.
///
/// The call is made once with the configured timeout; failures are not
/// retried.
pub async fn fetch_spec(url: &str, config: &WorkbenchConfig) -> Result<Value, OpenApiError> {
    info!("Fetching OpenAPI spec from {}", url);

    let client = reqwest::Client::builder()
        .timeout(config.fetch_timeout())
        .user_agent(config.user_agent.clone())
        .build()
        .map_err(|e| OpenApiError::Network(e.to_string()))?;

    let response = client
        .get(url)
        .header(reqwest::header::ACCEPT, "application/json")
        .send()
        .await?;

    let status = response.status();
    if !status.is_success() {
        let status_text = status.canonical_reason().unwrap_or("Unknown").to_string();
        warn!("OpenAPI fetch from {} returned {}", url, status);
        return Err(OpenApiError::Fetch {
            status: status.as_u16(),
            status_text,
        });
    }

    let text = response.text().await?;
    serde_json::from_str(&text).map_err(|e| OpenApiError::Parse(e.to_string()))
}

/// Imports an OpenAPI document given inline or by URL.
///
/// A non-blank `url` is fetched and any inline `spec` is then ignored.
/// Without either the call fails with [`OpenApiError::MissingSource`].
pub async fn parse_openapi(
    url: Option<&str>,
    spec: Option<Value>,
    config: &WorkbenchConfig,
) -> Result<ParsedOpenApi, OpenApiError> {
    let document = match (url.map(str::trim).filter(|u| !u.is_empty()), spec) {
        (Some(url), _) => fetch_spec(url, config).await?,
        (None, Some(spec)) => spec,
        (None, None) => return Err(OpenApiError::MissingSource),
    };
    parse_openapi_document(&document)
}
