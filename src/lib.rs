//! REST Workbench core
//!
//! The request model and the text-heavy parts of a REST API client: importing
//! requests from cURL commands, Postman exports and OpenAPI documents,
//! resolving `{{variable}}` placeholders against scoped environments, and
//! running small sandboxed post-response scripts.
//!
//! # Architecture
//!
//! - **models**: Requests, key/value entries, bodies, the workspace hierarchy
//!   and execution results
//! - **environment**: Environments and their scoped variables
//! - **variables**: Placeholder substitution and scope-aware resolution
//! - **storage**: The [`WorkspaceStore`](storage::WorkspaceStore) collaborator
//!   and an in-memory implementation
//! - **curl**: cURL command parsing and generation
//! - **postman**: Postman collection and environment import
//! - **openapi**: OpenAPI 3 import, with optional fetching by URL
//! - **script**: The post-response script interpreter
//! - **executor**: Sends resolved requests with `reqwest`
//! - **config**: User settings
//! - **workbench**: The [`Workbench`] service object tying it together
//!
//! # Request flow
//!
//! 1. An importer turns a cURL string, Postman JSON or OpenAPI document into
//!    [`Request`](models::Request) records, which the caller stores
//! 2. At send time the stored request and the active environment are resolved
//!    into a [`ResolvedRequest`](variables::ResolvedRequest)
//! 3. The executor sends it and returns an
//!    [`ExecutionResult`](models::ExecutionResult)
//! 4. The request's post-response script runs against the result and may
//!    produce an updated environment
//! 5. The caller writes that environment back with
//!    [`Workbench::apply_script_result`]
//!
//! # Example
//!
//! ```
//! use rest_workbench::config::WorkbenchConfig;
//! use rest_workbench::environment::{Environment, EnvironmentVariable};
//! use rest_workbench::models::{Collection, Folder, Workspace};
//! use rest_workbench::storage::InMemoryStore;
//! use rest_workbench::Workbench;
//!
//! let store = InMemoryStore::new();
//! let workspace = Workspace::new("Team");
//! let collection = Collection::new("API", &workspace.id);
//! let folder = Folder::new("Users", &collection.id);
//! store.insert_workspace(workspace).unwrap();
//! store.insert_collection(collection).unwrap();
//! store.insert_folder(folder.clone()).unwrap();
//!
//! let workbench = Workbench::new(store, WorkbenchConfig::default());
//! let request = workbench
//!     .import_curl("curl '{{baseUrl}}/users?page=2' -H 'Accept: application/json'", &folder.id)
//!     .unwrap();
//!
//! let env = Environment::with_variables(
//!     "dev",
//!     vec![EnvironmentVariable::global("baseUrl", "https://api.example.com")],
//! );
//! let resolved = workbench.resolve_request(&request, Some(&env));
//! assert_eq!(resolved.url, "https://api.example.com/users?page=2");
//! ```

pub mod config;
pub mod curl;
pub mod environment;
pub mod executor;
pub mod models;
pub mod openapi;
pub mod postman;
pub mod script;
pub mod storage;
pub mod variables;
pub mod workbench;

pub use config::{load_config, ConfigError, WorkbenchConfig};
pub use environment::{Environment, EnvironmentVariable, VariableScope};
pub use models::{ExecutionResult, HttpMethod, KeyValue, Request, RequestBody};
pub use script::{run_post_response_script, ScriptError, ScriptLimits, ScriptOutcome};
pub use storage::{InMemoryStore, StoreError, WorkspaceStore};
pub use variables::ResolvedRequest;
pub use workbench::{RequestRun, Workbench};
