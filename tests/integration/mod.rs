//! Shared setup for the integration suites.

pub mod import_test;
pub mod request_chaining_test;
pub mod substitution_properties_test;

use rest_workbench::config::WorkbenchConfig;
use rest_workbench::environment::Environment;
use rest_workbench::models::{Collection, Folder, Request, Workspace};
use rest_workbench::storage::InMemoryStore;
use rest_workbench::Workbench;
use std::sync::Once;

static INIT: Once = Once::new();

/// Initialize test logging (run once)
pub fn init_test_env() {
    INIT.call_once(|| {
        let _ = env_logger::builder().is_test(true).try_init();
    });
}

/// A workbench over an in-memory store holding one workspace, collection,
/// folder and an empty "dev" environment.
pub struct Fixture {
    pub workbench: Workbench<InMemoryStore>,
    pub workspace: Workspace,
    pub collection: Collection,
    pub folder: Folder,
    pub environment: Environment,
}

impl Fixture {
    pub fn new() -> Self {
        Self::with_config(WorkbenchConfig::default())
    }

    pub fn with_config(config: WorkbenchConfig) -> Self {
        init_test_env();
        let store = InMemoryStore::new();
        let workspace = Workspace::new("Team");
        let collection = Collection::new("API", &workspace.id);
        let folder = Folder::new("Requests", &collection.id);
        let environment = Environment::new("dev");

        store.insert_workspace(workspace.clone()).unwrap();
        store.insert_collection(collection.clone()).unwrap();
        store.insert_folder(folder.clone()).unwrap();
        store.insert_environment(environment.clone()).unwrap();

        Self {
            workbench: Workbench::new(store, config),
            workspace,
            collection,
            folder,
            environment,
        }
    }

    /// Stores a replacement for the fixture environment and returns it.
    pub fn save_environment(&mut self, environment: Environment) -> Environment {
        self.workbench
            .store()
            .insert_environment(environment.clone())
            .unwrap();
        self.environment = environment.clone();
        environment
    }

    pub fn add_request(&self, request: Request) -> Request {
        self.workbench
            .store()
            .insert_request(request.clone())
            .unwrap();
        request
    }

    /// Reads the fixture environment back from the store.
    pub fn stored_environment(&self) -> Environment {
        self.workbench.environment(&self.environment.id).unwrap()
    }
}
