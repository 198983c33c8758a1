//! The `pm` and `console` bindings handed to scripts.
//!
//! The host owns the working copy of the environment and the log buffer.
//! Scripts only reach it through [`HostFn`] values stored in the global
//! objects, so there is no path from a script to anything else in the
//! process.

use super::interpreter::{type_error, Exec};
use super::value::{HostFn, Object, Value, Walk};
use crate::environment::Environment;
use crate::models::ExecutionResult;

pub struct Host {
    environment: Option<Environment>,
    logs: Vec<String>,
    max_log_lines: usize,
    dropped_lines: usize,
    body: serde_json::Value,
    body_nodes: usize,
    text: String,
    headers: Vec<(String, String)>,
    status: u16,
    status_text: String,
    duration_ms: u64,
}

impl Host {
    pub fn new(
        response: &ExecutionResult,
        environment: Option<&Environment>,
        max_log_lines: usize,
    ) -> Self {
        let body = response.parsed_body();
        Self {
            environment: environment.cloned(),
            logs: Vec::new(),
            max_log_lines,
            dropped_lines: 0,
            body_nodes: json_nodes(&body),
            body,
            text: response.body.clone(),
            headers: response.headers.clone(),
            status: response.status,
            status_text: response.status_text.clone(),
            duration_ms: response.duration_ms,
        }
    }

    /// The only names defined in a script's global scope.
    pub fn globals(&self) -> Vec<(&'static str, Value)> {
        vec![("pm", self.pm()), ("console", console())]
    }

    fn pm(&self) -> Value {
        let mut headers = Object::default();
        for (name, value) in &self.headers {
            if headers.get(name).is_none() {
                headers.set(name.clone(), Value::Str(value.clone()));
            }
        }
        headers.set("get", Value::Host(HostFn::HeadersGet));

        let mut response = Object::default();
        response.set("body", Value::from_json(&self.body));
        response.set("status", Value::Number(f64::from(self.status)));
        response.set("code", Value::Number(f64::from(self.status)));
        response.set("statusText", Value::Str(self.status_text.clone()));
        response.set("responseTime", Value::Number(self.duration_ms as f64));
        response.set("headers", Value::object(headers));
        response.set("json", Value::Host(HostFn::ResponseJson));
        response.set("text", Value::Host(HostFn::ResponseText));

        let mut environment = Object::default();
        environment.set("get", Value::Host(HostFn::EnvironmentGet));
        environment.set("set", Value::Host(HostFn::EnvironmentSet));
        environment.set("unset", Value::Host(HostFn::EnvironmentUnset));

        let mut pm = Object::default();
        pm.set("response", Value::object(response));
        pm.set("environment", Value::object(environment));
        Value::object(pm)
    }

    /// Appends a log line unless the cap has been reached.
    pub fn log(&mut self, line: String) {
        if self.logs.len() < self.max_log_lines {
            self.logs.push(line);
        } else {
            self.dropped_lines += 1;
        }
    }

    /// Runs a host function. Conversions of the arguments and any copied
    /// response data are recorded in `walk` so the caller can charge them.
    pub fn call(&mut self, function: HostFn, args: &[Value], walk: &mut Walk) -> Exec<Value> {
        let arg = |index: usize| args.get(index).cloned().unwrap_or(Value::Undefined);
        match function {
            HostFn::ConsoleLog | HostFn::ConsoleInfo => {
                let line = join_args(args, walk)?;
                self.log(line);
            }
            HostFn::ConsoleWarn => {
                let line = join_args(args, walk)?;
                self.log(format!("WARN: {}", line));
            }
            HostFn::ConsoleError => {
                let line = join_args(args, walk)?;
                self.log(format!("ERROR: {}", line));
            }
            HostFn::EnvironmentGet => {
                let key = arg(0).display(walk)?;
                return Ok(self
                    .environment
                    .as_ref()
                    .and_then(|env| env.get(&key))
                    .map_or(Value::Undefined, |value| Value::Str(value.to_string())));
            }
            HostFn::EnvironmentSet => {
                let key = arg(0).display(walk)?;
                let value = arg(1).log_string(walk)?;
                match self.environment.as_mut() {
                    Some(env) => {
                        env.set(key.clone(), value.clone());
                        self.log(format!("Environment variable \"{}\" = \"{}\"", key, value));
                    }
                    None => self.log(format!(
                        "WARN: No active environment, cannot set \"{}\"",
                        key
                    )),
                }
            }
            HostFn::EnvironmentUnset => {
                let key = arg(0).display(walk)?;
                match self.environment.as_mut() {
                    Some(env) => {
                        env.unset(&key);
                        self.log(format!("Environment variable \"{}\" removed", key));
                    }
                    None => self.log(format!(
                        "WARN: No active environment, cannot unset \"{}\"",
                        key
                    )),
                }
            }
            HostFn::ResponseJson => {
                walk.record(self.body_nodes, 0);
                return Ok(Value::from_json(&self.body));
            }
            HostFn::ResponseText => {
                walk.record(0, self.text.len());
                return Ok(Value::Str(self.text.clone()));
            }
            HostFn::HeadersGet => {
                let name = match arg(0) {
                    Value::Str(name) => name,
                    other => {
                        return Err(type_error(format!(
                            "header name must be a string, got {}",
                            other.type_of()
                        )))
                    }
                };
                return Ok(self
                    .headers
                    .iter()
                    .find(|(k, _)| k.eq_ignore_ascii_case(&name))
                    .map_or(Value::Undefined, |(_, v)| Value::Str(v.clone())));
            }
        }
        Ok(Value::Undefined)
    }

    pub fn dropped_lines(&self) -> usize {
        self.dropped_lines
    }

    /// Hands back the working environment and the collected logs.
    pub fn finish(self) -> (Option<Environment>, Vec<String>) {
        (self.environment, self.logs)
    }
}

fn console() -> Value {
    let mut console = Object::default();
    console.set("log", Value::Host(HostFn::ConsoleLog));
    console.set("info", Value::Host(HostFn::ConsoleInfo));
    console.set("warn", Value::Host(HostFn::ConsoleWarn));
    console.set("error", Value::Host(HostFn::ConsoleError));
    Value::object(console)
}

fn join_args(args: &[Value], walk: &mut Walk) -> Exec<String> {
    let mut parts = Vec::with_capacity(args.len());
    for value in args {
        parts.push(value.log_string(walk)?);
    }
    Ok(parts.join(" "))
}

fn json_nodes(value: &serde_json::Value) -> usize {
    1 + match value {
        serde_json::Value::Array(items) => items.iter().map(json_nodes).sum(),
        serde_json::Value::Object(map) => map.values().map(json_nodes).sum(),
        _ => 0,
    }
}
