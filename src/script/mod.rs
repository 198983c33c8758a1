//! Post-response script runner.
//!
//! Scripts are written in a small JavaScript subset and run against a fixed
//! API surface:
//!
//! - `pm.response`: `body`, `status`, `code`, `statusText`, `responseTime`,
//!   `headers` (with `get(name)`), `json()`, `text()`
//! - `pm.environment`: `get(key)`, `set(key, value)`, `unset(key)`
//! - `console`: `log`, `info`, `warn`, `error`
//!
//! Nothing else exists in the script's global scope. Each run is bounded by
//! a step budget and a wall-clock deadline, and every failure ends up in the
//! returned [`ScriptOutcome`] instead of being propagated.
//!
//! # Example
//!
//! ```
//! use rest_workbench::environment::Environment;
//! use rest_workbench::models::ExecutionResult;
//! use rest_workbench::script::{run_post_response_script, ScriptLimits};
//!
//! let response = ExecutionResult::new(200, "OK").with_body(r#"{"token":"abc"}"#);
//! let env = Environment::new("dev");
//! let outcome = run_post_response_script(
//!     "pm.environment.set('token', pm.response.json().token);",
//!     &response,
//!     Some(&env),
//!     &ScriptLimits::default(),
//! );
//!
//! assert!(outcome.error.is_none());
//! assert_eq!(outcome.updated_environment.unwrap().get("token"), Some("abc"));
//! ```

mod ast;
mod builtins;
mod host;
mod interpreter;
mod lexer;
mod parser;
mod value;

use crate::config::WorkbenchConfig;
use crate::environment::Environment;
use crate::models::ExecutionResult;
use host::Host;
use interpreter::Interpreter;
use log::{debug, warn};
use serde::Serialize;
use std::fmt;
use std::thread;
use std::time::{Duration, Instant};

/// Deeply nested scripts recurse in the evaluator; run them on a roomy stack.
const SCRIPT_STACK_SIZE: usize = 32 * 1024 * 1024;

/// Why a script stopped.
#[derive(Debug, Clone, PartialEq)]
pub enum ScriptError {
    /// The script could not be parsed.
    Syntax { message: String, line: usize },
    /// An identifier that is not defined in the sandbox was used.
    Reference(String),
    /// An operation was applied to a value of the wrong type.
    Type(String),
    /// The script threw a value that was never caught.
    Thrown(String),
    /// The script ran more steps than allowed.
    StepBudgetExceeded(u64),
    /// The script ran past its deadline (milliseconds).
    Timeout(u64),
}

impl fmt::Display for ScriptError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScriptError::Syntax { message, line } => {
                write!(f, "SyntaxError: {} (line {})", message, line)
            }
            ScriptError::Reference(msg) => write!(f, "ReferenceError: {}", msg),
            ScriptError::Type(msg) => write!(f, "TypeError: {}", msg),
            ScriptError::Thrown(msg) => write!(f, "{}", msg),
            ScriptError::StepBudgetExceeded(budget) => {
                write!(f, "Script exceeded the step budget of {} steps", budget)
            }
            ScriptError::Timeout(ms) => write!(f, "Script timed out after {} ms", ms),
        }
    }
}

impl std::error::Error for ScriptError {}

/// Resource limits for one script run.
#[derive(Debug, Clone, PartialEq)]
pub struct ScriptLimits {
    pub step_budget: u64,
    pub timeout: Duration,
    pub max_log_lines: usize,
}

impl Default for ScriptLimits {
    fn default() -> Self {
        WorkbenchConfig::default().into()
    }
}

impl From<&WorkbenchConfig> for ScriptLimits {
    fn from(config: &WorkbenchConfig) -> Self {
        Self {
            step_budget: config.script_step_budget,
            timeout: config.script_timeout(),
            max_log_lines: config.max_script_log_lines,
        }
    }
}

impl From<WorkbenchConfig> for ScriptLimits {
    fn from(config: WorkbenchConfig) -> Self {
        Self::from(&config)
    }
}

/// Result of running a post-response script.
///
/// `updated_environment` is the working copy after the script ran, even when
/// it failed part way. Writing it back is up to the caller.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScriptOutcome {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_environment: Option<Environment>,
    pub logs: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ScriptOutcome {
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

/// Parses a script without running it.
pub fn check_syntax(script: &str) -> Result<(), ScriptError> {
    parser::parse_program(script).map(|_| ())
}

/// Runs `script` against `response` and a working copy of `environment`.
///
/// Never fails: errors are reported through [`ScriptOutcome::error`] and as a
/// final `ERROR: ` line in the logs.
pub fn run_post_response_script(
    script: &str,
    response: &ExecutionResult,
    environment: Option<&Environment>,
    limits: &ScriptLimits,
) -> ScriptOutcome {
    if script.trim().is_empty() {
        return ScriptOutcome {
            updated_environment: environment.cloned(),
            logs: Vec::new(),
            error: None,
        };
    }

    let started = Instant::now();
    let spawned = thread::scope(|scope| {
        thread::Builder::new()
            .name("post-response-script".to_string())
            .stack_size(SCRIPT_STACK_SIZE)
            .spawn_scoped(scope, || execute(script, response, environment, limits))
            .map(|handle| handle.join())
    });
    let report = match spawned {
        Ok(Ok(report)) => report,
        Ok(Err(_)) => {
            warn!("Post-response script thread panicked");
            RunReport {
                result: Err(ScriptError::Thrown("Script runner crashed".to_string())),
                environment: environment.cloned(),
                logs: Vec::new(),
                steps: 0,
            }
        }
        Err(e) => {
            warn!("Could not spawn script thread, running inline: {}", e);
            execute(script, response, environment, limits)
        }
    };

    let RunReport {
        result,
        environment: updated_environment,
        mut logs,
        steps,
    } = report;
    let error = result.err().map(|e| e.to_string());
    if let Some(error) = &error {
        logs.push(format!("ERROR: {}", error));
    }
    debug!(
        "Post-response script finished in {:?} after {} steps{}",
        started.elapsed(),
        steps,
        error
            .as_deref()
            .map(|e| format!(" with error: {}", e))
            .unwrap_or_default()
    );

    ScriptOutcome {
        updated_environment,
        logs,
        error,
    }
}

struct RunReport {
    result: Result<(), ScriptError>,
    environment: Option<Environment>,
    logs: Vec<String>,
    steps: u64,
}

fn execute(
    script: &str,
    response: &ExecutionResult,
    environment: Option<&Environment>,
    limits: &ScriptLimits,
) -> RunReport {
    let host = Host::new(response, environment, limits.max_log_lines);
    let (result, host, steps) = match parser::parse_program(script) {
        Ok(program) => {
            let mut interpreter = Interpreter::new(host, limits);
            let result = interpreter.run(&program);
            let steps = interpreter.steps();
            (result, interpreter.into_host(), steps)
        }
        Err(e) => (Err(e), host, 0),
    };

    if host.dropped_lines() > 0 {
        debug!(
            "Dropped {} script log lines over the limit of {}",
            host.dropped_lines(),
            limits.max_log_lines
        );
    }
    let (environment, logs) = host.finish();
    RunReport {
        result,
        environment,
        logs,
        steps,
    }
}
