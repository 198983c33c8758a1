//! Configuration loading.
//!
//! Settings are read from a JSON object under the `"workbench"` key and laid
//! over the defaults. There is no process-wide config: the loaded value is
//! handed to [`Workbench`](crate::workbench::Workbench), which owns it.

pub mod schema;

pub use schema::WorkbenchConfig;

use log::warn;
use serde_json::Value;
use std::fmt;
use std::path::Path;

/// Key under which workbench settings live in a settings document.
pub const SETTINGS_KEY: &str = "workbench";

/// Errors raised while loading configuration.
#[derive(Debug)]
pub enum ConfigError {
    /// The settings file could not be read.
    Io(std::io::Error),

    /// The settings file is not valid JSON.
    Json(String),

    /// A setting is out of range.
    Invalid(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Io(err) => write!(f, "Failed to read settings: {}", err),
            ConfigError::Json(msg) => write!(f, "Failed to parse settings: {}", msg),
            ConfigError::Invalid(msg) => write!(f, "Invalid configuration: {}", msg),
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<std::io::Error> for ConfigError {
    fn from(err: std::io::Error) -> Self {
        ConfigError::Io(err)
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(err: serde_json::Error) -> Self {
        ConfigError::Json(err.to_string())
    }
}

/// Loads configuration from a settings document.
///
/// Settings that fail to deserialize are ignored with a warning and the
/// defaults are used. Settings that deserialize but are out of range are an
/// error.
///
/// # Example
///
/// ```
/// use rest_workbench::config::load_config;
/// use serde_json::json;
///
/// let config = load_config(Some(json!({
///     "workbench": { "scriptTimeoutMs": 250 }
/// })))
/// .unwrap();
///
/// assert_eq!(config.script_timeout_ms, 250);
/// assert_eq!(config.fetch_timeout_ms, 30000);
/// ```
pub fn load_config(settings_json: Option<Value>) -> Result<WorkbenchConfig, ConfigError> {
    let mut config = WorkbenchConfig::default();

    if let Some(user_settings) = settings_json.as_ref().and_then(|s| s.get(SETTINGS_KEY)) {
        match serde_json::from_value::<WorkbenchConfig>(user_settings.clone()) {
            Ok(user_config) => config = user_config,
            Err(e) => warn!(
                "Failed to parse {} settings: {}. Using defaults.",
                SETTINGS_KEY, e
            ),
        }
    }

    config.validate().map_err(ConfigError::Invalid)?;
    Ok(config)
}

/// Reads a JSON settings file and loads configuration from it.
pub fn load_config_file(path: impl AsRef<Path>) -> Result<WorkbenchConfig, ConfigError> {
    let content = std::fs::read_to_string(path.as_ref())?;
    let settings: Value = serde_json::from_str(&content)?;
    load_config(Some(settings))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Write;

    #[test]
    fn test_load_config_with_defaults() {
        let config = load_config(None).unwrap();
        assert_eq!(config, WorkbenchConfig::default());
    }

    #[test]
    fn test_load_config_partial_settings() {
        let config = load_config(Some(json!({
            "workbench": {"fetchTimeoutMs": 45000, "scriptStepBudget": 500}
        })))
        .unwrap();
        assert_eq!(config.fetch_timeout_ms, 45000);
        assert_eq!(config.script_step_budget, 500);
        assert_eq!(config.script_timeout_ms, 1000);
    }

    #[test]
    fn test_load_config_wrong_types_fall_back() {
        let config = load_config(Some(json!({
            "workbench": {"fetchTimeoutMs": "soon"}
        })))
        .unwrap();
        assert_eq!(config.fetch_timeout_ms, 30000);
    }

    #[test]
    fn test_load_config_validation_error() {
        let result = load_config(Some(json!({"workbench": {"scriptTimeoutMs": 0}})));
        match result {
            Err(ConfigError::Invalid(msg)) => assert!(msg.contains("scriptTimeoutMs")),
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn test_other_keys_ignored() {
        let config = load_config(Some(json!({"rest-client": {"timeout": 1}}))).unwrap();
        assert_eq!(config, WorkbenchConfig::default());
    }

    #[test]
    fn test_load_config_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"workbench": {{"maxScriptLogLines": 10}}}}"#).unwrap();

        let config = load_config_file(file.path()).unwrap();
        assert_eq!(config.max_script_log_lines, 10);
    }

    #[test]
    fn test_load_config_file_errors() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            load_config_file(dir.path().join("missing.json")),
            Err(ConfigError::Io(_))
        ));

        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "not json").unwrap();
        assert!(matches!(
            load_config_file(file.path()),
            Err(ConfigError::Json(_))
        ));
    }
}
