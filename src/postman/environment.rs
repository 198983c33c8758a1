//! Postman environment parsing.

use super::{scalar_to_string, PostmanError};
use crate::environment::{Environment, EnvironmentVariable};
use log::debug;
use serde::Serialize;
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParsedPostmanEnvironment {
    pub name: String,
    /// Every variable is global; Postman environments carry no scope.
    pub variables: Vec<EnvironmentVariable>,
}

impl ParsedPostmanEnvironment {
    /// Converts the parse result into a fresh environment record.
    pub fn into_environment(self) -> Environment {
        Environment::with_variables(self.name, self.variables)
    }
}

/// Parses a Postman environment from its JSON text.
pub fn parse_environment_str(json: &str) -> Result<ParsedPostmanEnvironment, PostmanError> {
    let value: Value = serde_json::from_str(json)?;
    parse_environment(&value)
}

/// Parses a Postman environment export.
///
/// Entries default to enabled when `enabled` is omitted. Non-string values
/// are stringified.
pub fn parse_environment(json: &Value) -> Result<ParsedPostmanEnvironment, PostmanError> {
    let name = json
        .get("name")
        .and_then(Value::as_str)
        .ok_or_else(|| PostmanError::InvalidEnvironment("missing 'name'".to_string()))?;
    let values = json
        .get("values")
        .and_then(Value::as_array)
        .ok_or_else(|| PostmanError::InvalidEnvironment("missing 'values' array".to_string()))?;

    let variables: Vec<EnvironmentVariable> = values
        .iter()
        .filter_map(|entry| {
            let key = entry.get("key").and_then(Value::as_str)?;
            let enabled = entry.get("enabled").and_then(Value::as_bool) != Some(false);
            let mut variable =
                EnvironmentVariable::global(key, scalar_to_string(entry.get("value")));
            variable.enabled = enabled;
            Some(variable)
        })
        .collect();

    debug!(
        "Parsed Postman environment '{}' with {} variables",
        name,
        variables.len()
    );
    Ok(ParsedPostmanEnvironment {
        name: name.to_string(),
        variables,
    })
}
