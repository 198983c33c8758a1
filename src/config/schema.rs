//! Configuration schema for the workbench.
//!
//! Every field has a serde default, so a settings object only needs the keys
//! the user actually wants to change.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Runtime limits and network settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkbenchConfig {
    /// Timeout for outbound HTTP calls (OpenAPI fetch and request execution),
    /// in milliseconds. Defaults to 30000.
    ///
    /// Must be greater than 0.
    #[serde(default = "default_fetch_timeout_ms")]
    pub fetch_timeout_ms: u64,

    /// Wall-clock limit for a single post-response script, in milliseconds.
    /// Defaults to 1000.
    ///
    /// Must be greater than 0.
    #[serde(default = "default_script_timeout_ms")]
    pub script_timeout_ms: u64,

    /// Maximum number of interpreter steps a script may take. Defaults to 100000.
    ///
    /// Must be greater than 0.
    #[serde(default = "default_script_step_budget")]
    pub script_step_budget: u64,

    /// Lines a script may append to its log before further output is dropped.
    /// Defaults to 1000.
    #[serde(default = "default_max_script_log_lines")]
    pub max_script_log_lines: usize,

    /// `User-Agent` sent on outbound calls.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Whether the executor follows 3xx redirects. Defaults to true.
    #[serde(default = "default_follow_redirects")]
    pub follow_redirects: bool,

    /// Whether TLS certificates are validated. Defaults to true.
    #[serde(default = "default_validate_ssl")]
    pub validate_ssl: bool,
}

impl Default for WorkbenchConfig {
    fn default() -> Self {
        Self {
            fetch_timeout_ms: default_fetch_timeout_ms(),
            script_timeout_ms: default_script_timeout_ms(),
            script_step_budget: default_script_step_budget(),
            max_script_log_lines: default_max_script_log_lines(),
            user_agent: default_user_agent(),
            follow_redirects: default_follow_redirects(),
            validate_ssl: default_validate_ssl(),
        }
    }
}

impl WorkbenchConfig {
    /// Validates the configuration and returns a message naming the first
    /// invalid setting.
    pub fn validate(&self) -> Result<(), String> {
        if self.fetch_timeout_ms == 0 {
            return Err("fetchTimeoutMs must be greater than 0".to_string());
        }
        if self.script_timeout_ms == 0 {
            return Err("scriptTimeoutMs must be greater than 0".to_string());
        }
        if self.script_step_budget == 0 {
            return Err("scriptStepBudget must be greater than 0".to_string());
        }
        if self.user_agent.trim().is_empty() {
            return Err("userAgent must not be empty".to_string());
        }
        Ok(())
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_millis(self.fetch_timeout_ms)
    }

    pub fn script_timeout(&self) -> Duration {
        Duration::from_millis(self.script_timeout_ms)
    }
}

// Default value functions for serde

fn default_fetch_timeout_ms() -> u64 {
    30000
}

fn default_script_timeout_ms() -> u64 {
    1000
}

fn default_script_step_budget() -> u64 {
    100_000
}

fn default_max_script_log_lines() -> usize {
    1000
}

fn default_user_agent() -> String {
    format!("rest-workbench/{}", env!("CARGO_PKG_VERSION"))
}

fn default_follow_redirects() -> bool {
    true
}

fn default_validate_ssl() -> bool {
    true
}
