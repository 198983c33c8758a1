//! REST Workbench command line
//!
//! Runs the importers and the script runner on local files and prints the
//! normalized result as JSON on stdout. Diagnostics go to stderr; set
//! `RUST_LOG=debug` for more detail. Inputs named `-` are read from stdin.

use clap::{Parser, Subcommand};
use rest_workbench::config::{load_config, load_config_file};
use rest_workbench::environment::Environment;
use rest_workbench::models::ExecutionResult;
use rest_workbench::storage::InMemoryStore;
use rest_workbench::Workbench;
use serde::Serialize;
use serde_json::Value;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

#[derive(Parser, Debug)]
#[command(name = "workbench", version)]
#[command(about = "Import cURL, Postman and OpenAPI artifacts and run post-response scripts")]
struct Cli {
    /// Settings file with a `rest-workbench` section
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Parse a cURL command
    Curl {
        #[arg(value_name = "FILE")]
        input: PathBuf,
    },
    /// Parse a Postman collection export
    Postman {
        #[arg(value_name = "FILE")]
        input: PathBuf,
    },
    /// Parse a Postman environment export
    PostmanEnv {
        #[arg(value_name = "FILE")]
        input: PathBuf,
    },
    /// Import an OpenAPI document from a file or an http(s) URL
    Openapi {
        #[arg(value_name = "FILE|URL")]
        source: String,
    },
    /// Run a post-response script against a stored response body
    Script {
        #[arg(value_name = "FILE")]
        script: PathBuf,
        /// Response body the script sees
        #[arg(long, value_name = "FILE")]
        response: PathBuf,
        /// Response status code
        #[arg(long, default_value_t = 200)]
        status: u16,
        /// Environment JSON the script reads and updates
        #[arg(long, value_name = "FILE")]
        env: Option<PathBuf>,
    },
}

type CliResult = Result<(), String>;

fn read_input(path: &Path) -> Result<String, String> {
    if path == Path::new("-") {
        let mut buffer = String::new();
        std::io::stdin()
            .read_to_string(&mut buffer)
            .map_err(|e| format!("Failed to read stdin: {}", e))?;
        return Ok(buffer);
    }
    std::fs::read_to_string(path)
        .map_err(|e| format!("Failed to read {}: {}", path.display(), e))
}

fn read_json(path: &Path) -> Result<Value, String> {
    let content = read_input(path)?;
    serde_json::from_str(&content)
        .map_err(|e| format!("{} is not valid JSON: {}", path.display(), e))
}

fn print_json<T: Serialize>(value: &T) -> CliResult {
    let json = serde_json::to_string_pretty(value).map_err(|e| e.to_string())?;
    println!("{}", json);
    Ok(())
}

async fn run(cli: Cli) -> CliResult {
    let config = match &cli.config {
        Some(path) => load_config_file(path).map_err(|e| e.to_string())?,
        None => load_config(None).map_err(|e| e.to_string())?,
    };
    let workbench = Workbench::new(InMemoryStore::new(), config);

    match cli.command {
        Command::Curl { input } => {
            let input = read_input(&input)?;
            let request = workbench
                .import_curl(&input, "")
                .map_err(|e| format!("Could not parse cURL command: {}", e))?;
            print_json(&request)
        }
        Command::Postman { input } => {
            let collection = workbench
                .import_postman_collection(&read_json(&input)?)
                .map_err(|e| e.to_string())?;
            print_json(&collection)
        }
        Command::PostmanEnv { input } => {
            let environment = workbench
                .import_postman_environment(&read_json(&input)?)
                .map_err(|e| e.to_string())?;
            print_json(&environment.into_environment())
        }
        Command::Openapi { source } => {
            let parsed = if source.starts_with("http://") || source.starts_with("https://") {
                workbench.import_openapi(Some(&source), None).await
            } else {
                let document = read_json(Path::new(&source))?;
                workbench.import_openapi(None, Some(document)).await
            };
            print_json(&parsed.map_err(|e| e.to_string())?)
        }
        Command::Script {
            script,
            response,
            status,
            env,
        } => {
            let environment: Option<Environment> = match env {
                Some(path) => Some(
                    serde_json::from_value(read_json(&path)?).map_err(|e| {
                        format!("{} is not an environment: {}", path.display(), e)
                    })?,
                ),
                None => None,
            };
            let script = read_input(&script)?;

            let status_text = reqwest::StatusCode::from_u16(status)
                .ok()
                .and_then(|s| s.canonical_reason())
                .unwrap_or("Unknown");
            let response =
                ExecutionResult::new(status, status_text).with_body(read_input(&response)?);

            let outcome =
                workbench.run_post_response_script(&script, &response, environment.as_ref());
            print_json(&outcome)?;
            match outcome.error {
                Some(error) => Err(error),
                None => Ok(()),
            }
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"))
        .target(env_logger::Target::Stderr)
        .init();

    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            eprintln!("[workbench] {}", message);
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_script_options() {
        let cli = Cli::try_parse_from([
            "workbench",
            "script",
            "after.js",
            "--response",
            "body.json",
            "--env",
            "dev.json",
            "--config",
            "settings.json",
        ])
        .unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("settings.json")));
        match cli.command {
            Command::Script {
                script,
                response,
                status,
                env,
            } => {
                assert_eq!(script, PathBuf::from("after.js"));
                assert_eq!(response, PathBuf::from("body.json"));
                assert_eq!(status, 200);
                assert_eq!(env, Some(PathBuf::from("dev.json")));
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_subcommand_names() {
        let cli = Cli::try_parse_from(["workbench", "postman-env", "-"]).unwrap();
        assert!(matches!(cli.command, Command::PostmanEnv { input } if input == Path::new("-")));

        let cli = Cli::try_parse_from(["workbench", "openapi", "https://x.io/spec.json"]).unwrap();
        assert!(matches!(cli.command, Command::Openapi { source } if source.starts_with("https")));
    }

    #[test]
    fn test_invalid_arguments_are_rejected() {
        assert!(Cli::try_parse_from(["workbench"]).is_err());
        assert!(Cli::try_parse_from(["workbench", "script", "after.js"]).is_err());
        assert!(Cli::try_parse_from([
            "workbench",
            "script",
            "after.js",
            "--response",
            "body.json",
            "--status",
            "abc"
        ])
        .is_err());
        assert!(Cli::try_parse_from(["workbench", "curl", "a", "b"]).is_err());
    }
}
