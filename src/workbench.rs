//! The workbench service object.
//!
//! One [`Workbench`] is built at startup with a store and configuration and
//! handed to whatever drives it (the CLI, a server, tests). It holds no
//! global state; everything it needs is owned or borrowed from here.

use crate::config::WorkbenchConfig;
use crate::curl::{try_parse_curl, CurlParseError};
use crate::environment::Environment;
use crate::executor::{self, RequestError};
use crate::models::{ExecutionResult, Request};
use crate::openapi::{self, OpenApiError, ParsedOpenApi};
use crate::postman::{self, ParsedPostmanCollection, ParsedPostmanEnvironment, PostmanError};
use crate::script::{self, ScriptLimits, ScriptOutcome};
use crate::storage::{StoreError, WorkspaceStore};
use crate::variables::{self, ResolvedRequest};
use log::{debug, info};
use serde::Serialize;
use serde_json::Value;

/// Everything that happened while sending one stored request.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestRun {
    pub request: ResolvedRequest,
    pub response: ExecutionResult,
    /// Present when the request has a non-empty post-response script.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub script: Option<ScriptOutcome>,
}

pub struct Workbench<S: WorkspaceStore> {
    store: S,
    config: WorkbenchConfig,
    script_limits: ScriptLimits,
}

impl<S: WorkspaceStore> Workbench<S> {
    pub fn new(store: S, config: WorkbenchConfig) -> Self {
        let script_limits = ScriptLimits::from(&config);
        Self {
            store,
            config,
            script_limits,
        }
    }

    pub fn config(&self) -> &WorkbenchConfig {
        &self.config
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Looks up an environment by id.
    pub fn environment(&self, id: &str) -> Option<Environment> {
        self.store.get_environment(id)
    }

    /// Resolves `key` for the request with id `request_id`.
    ///
    /// Returns `None` when there is no environment, the request's ownership
    /// chain is broken, or no enabled variable matches.
    pub fn resolve_variable(
        &self,
        key: &str,
        request_id: &str,
        environment: Option<&Environment>,
    ) -> Option<String> {
        variables::resolve_variable(&self.store, key, request_id, environment)
    }

    /// Replaces every resolvable `{{name}}` in `text`; the rest stay as is.
    pub fn substitute_variables(
        &self,
        text: &str,
        request_id: &str,
        environment: Option<&Environment>,
    ) -> String {
        variables::substitute_variables(&self.store, text, request_id, environment)
    }

    /// Produces the fully substituted request the executor sends.
    pub fn resolve_request(
        &self,
        request: &Request,
        environment: Option<&Environment>,
    ) -> ResolvedRequest {
        variables::resolve_request(&self.store, request, environment)
    }

    /// Runs a post-response script with the configured limits.
    ///
    /// The returned environment is not written back; see
    /// [`apply_script_result`](Self::apply_script_result).
    pub fn run_post_response_script(
        &self,
        script: &str,
        response: &ExecutionResult,
        environment: Option<&Environment>,
    ) -> ScriptOutcome {
        script::run_post_response_script(script, response, environment, &self.script_limits)
    }

    /// Writes the environment a script produced back to the store.
    ///
    /// Returns `Ok(false)` when the outcome carries no environment.
    pub fn apply_script_result(&self, outcome: &ScriptOutcome) -> Result<bool, StoreError> {
        let Some(environment) = &outcome.updated_environment else {
            return Ok(false);
        };
        self.store
            .update_environment(&environment.id, environment.variables.clone())?;
        debug!(
            "Applied script result to environment '{}' ({} variables)",
            environment.name,
            environment.variables.len()
        );
        Ok(true)
    }

    /// Parses a cURL command into a new request owned by `folder_id`.
    ///
    /// The request is named after its method and URL.
    pub fn import_curl(&self, command: &str, folder_id: &str) -> Result<Request, CurlParseError> {
        let parsed = try_parse_curl(command)?;
        let name = format!("{} {}", parsed.method, parsed.url);
        Ok(parsed.into_request(name, folder_id))
    }

    pub fn import_postman_collection(
        &self,
        json: &Value,
    ) -> Result<ParsedPostmanCollection, PostmanError> {
        let collection = postman::parse_collection(json)?;
        info!(
            "Imported Postman collection '{}': {} folders, {} requests",
            collection.name,
            collection.folders.len(),
            collection.request_count()
        );
        Ok(collection)
    }

    pub fn import_postman_environment(
        &self,
        json: &Value,
    ) -> Result<ParsedPostmanEnvironment, PostmanError> {
        postman::parse_environment(json)
    }

    /// Imports an OpenAPI document, fetching it from `url` when one is given
    /// and using the inline `spec` otherwise.
    pub async fn import_openapi(
        &self,
        url: Option<&str>,
        spec: Option<Value>,
    ) -> Result<ParsedOpenApi, OpenApiError> {
        let parsed = openapi::parse_openapi(url, spec, &self.config).await?;
        info!(
            "Imported OpenAPI '{}': {} requests",
            parsed.title,
            parsed.requests.len()
        );
        Ok(parsed)
    }

    /// Sends an already resolved request.
    pub async fn execute(&self, request: &ResolvedRequest) -> Result<ExecutionResult, RequestError> {
        executor::execute_request(request, &self.config).await
    }

    /// Resolves, sends and post-processes a stored request.
    ///
    /// The script outcome is returned but not applied.
    pub async fn send_request(
        &self,
        request: &Request,
        environment: Option<&Environment>,
    ) -> Result<RequestRun, RequestError> {
        let resolved = self.resolve_request(request, environment);
        let response = self.execute(&resolved).await?;
        let script = request
            .script
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .map(|s| self.run_post_response_script(s, &response, environment));
        Ok(RequestRun {
            request: resolved,
            response,
            script,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::environment::EnvironmentVariable;
    use crate::models::{Collection, Folder, HttpMethod, Workspace};
    use crate::storage::InMemoryStore;
    use serde_json::json;

    struct Fixture {
        workbench: Workbench<InMemoryStore>,
        folder: Folder,
        request: Request,
        environment: Environment,
    }

    fn fixture() -> Fixture {
        let store = InMemoryStore::new();
        let workspace = Workspace::new("Team");
        let collection = Collection::new("API", &workspace.id);
        let folder = Folder::new("Users", &collection.id);
        let mut request = Request::new(
            "Get user",
            HttpMethod::GET,
            "{{baseUrl}}/users/{{userId}}",
            &folder.id,
        );
        request.add_header("Authorization", "Bearer {{token}}");
        let environment = Environment::with_variables(
            "dev",
            vec![
                EnvironmentVariable::global("baseUrl", "https://api.example.com"),
                EnvironmentVariable::collection("userId", "42", &collection.id),
            ],
        );

        store.insert_workspace(workspace).unwrap();
        store.insert_collection(collection).unwrap();
        store.insert_folder(folder.clone()).unwrap();
        store.insert_request(request.clone()).unwrap();
        store.insert_environment(environment.clone()).unwrap();

        Fixture {
            workbench: Workbench::new(store, WorkbenchConfig::default()),
            folder,
            request,
            environment,
        }
    }

    #[test]
    fn test_resolution_through_workbench() {
        let f = fixture();
        assert_eq!(
            f.workbench
                .resolve_variable("userId", &f.request.id, Some(&f.environment))
                .as_deref(),
            Some("42")
        );
        assert_eq!(
            f.workbench
                .substitute_variables("{{baseUrl}}/{{missing}}", &f.request.id, Some(&f.environment)),
            "https://api.example.com/{{missing}}"
        );

        let resolved = f.workbench.resolve_request(&f.request, Some(&f.environment));
        assert_eq!(resolved.url, "https://api.example.com/users/42");
        assert_eq!(resolved.header("authorization"), Some("Bearer {{token}}"));
    }

    #[test]
    fn test_script_result_round_trip() {
        let f = fixture();
        let response = ExecutionResult::new(200, "OK").with_body(r#"{"token":"t-1"}"#);
        let outcome = f.workbench.run_post_response_script(
            "pm.environment.set('token', pm.response.json().token);",
            &response,
            Some(&f.environment),
        );
        assert!(outcome.is_success());

        // nothing is persisted until applied
        let stored = f.workbench.environment(&f.environment.id).unwrap();
        assert_eq!(stored.get("token"), None);

        assert!(f.workbench.apply_script_result(&outcome).unwrap());
        let stored = f.workbench.environment(&f.environment.id).unwrap();
        assert_eq!(stored.get("token"), Some("t-1"));

        let resolved = f.workbench.resolve_request(&f.request, Some(&stored));
        assert_eq!(resolved.header("Authorization"), Some("Bearer t-1"));
    }

    #[test]
    fn test_apply_without_environment() {
        let f = fixture();
        let outcome = f.workbench.run_post_response_script(
            "console.log('hi')",
            &ExecutionResult::new(200, "OK"),
            None,
        );
        assert_eq!(f.workbench.apply_script_result(&outcome), Ok(false));
    }

    #[test]
    fn test_apply_to_unknown_environment_fails() {
        let f = fixture();
        let outcome = f.workbench.run_post_response_script(
            "pm.environment.set('a', 1)",
            &ExecutionResult::new(200, "OK"),
            Some(&Environment::new("detached")),
        );
        assert!(matches!(
            f.workbench.apply_script_result(&outcome),
            Err(StoreError::NotFound { .. })
        ));
    }

    #[test]
    fn test_script_limits_follow_config() {
        let config = WorkbenchConfig {
            script_step_budget: 50,
            ..WorkbenchConfig::default()
        };
        let workbench = Workbench::new(InMemoryStore::new(), config);
        let outcome = workbench.run_post_response_script(
            "while (true) {}",
            &ExecutionResult::new(200, "OK"),
            None,
        );
        assert_eq!(
            outcome.error.as_deref(),
            Some("Script exceeded the step budget of 50 steps")
        );
    }

    #[test]
    fn test_import_curl() {
        let f = fixture();
        let request = f
            .workbench
            .import_curl(
                "curl -X POST https://api.example.com/users -d '{\"name\":\"a\"}'",
                &f.folder.id,
            )
            .unwrap();
        assert_eq!(request.method, HttpMethod::POST);
        assert_eq!(request.name, "POST https://api.example.com/users");
        assert_eq!(request.folder_id, f.folder.id);

        assert_eq!(
            f.workbench.import_curl("wget https://x", &f.folder.id),
            Err(CurlParseError::NotACurlCommand)
        );
    }

    #[test]
    fn test_import_postman() {
        let f = fixture();
        let collection = f
            .workbench
            .import_postman_collection(&json!({
                "info": {"name": "Demo"},
                "item": [{"name": "Ping", "request": {"method": "GET", "url": "https://x/ping"}}]
            }))
            .unwrap();
        assert_eq!(collection.request_count(), 1);

        let err = f
            .workbench
            .import_postman_environment(&json!({"values": []}))
            .unwrap_err();
        assert!(matches!(err, PostmanError::InvalidEnvironment(_)));
    }

    #[tokio::test]
    async fn test_import_openapi_inline() {
        let f = fixture();
        let parsed = f
            .workbench
            .import_openapi(
                None,
                Some(json!({
                    "info": {"title": "Pets"},
                    "servers": [{"url": "https://pets.example.com"}],
                    "paths": {"/pets": {"get": {"summary": "List pets"}}}
                })),
            )
            .await
            .unwrap();
        assert_eq!(parsed.title, "Pets");
        assert_eq!(parsed.requests[0].url, "{{baseUrl}}/pets");
    }
}
