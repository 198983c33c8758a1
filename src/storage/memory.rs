//! In-memory [`WorkspaceStore`] backed by one map per entity kind.

use super::{StoreError, WorkspaceStore};
use crate::environment::{Environment, EnvironmentVariable};
use crate::models::{Collection, Folder, Request, Workspace};
use std::collections::{HashMap, HashSet};
use std::sync::RwLock;

/// Thread-safe in-memory store.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    workspaces: RwLock<HashMap<String, Workspace>>,
    collections: RwLock<HashMap<String, Collection>>,
    folders: RwLock<HashMap<String, Folder>>,
    requests: RwLock<HashMap<String, Request>>,
    environments: RwLock<HashMap<String, Environment>>,
}

fn read<T: Clone>(map: &RwLock<HashMap<String, T>>, id: &str) -> Option<T> {
    map.read().ok().and_then(|m| m.get(id).cloned())
}

fn write<T>(map: &RwLock<HashMap<String, T>>, id: String, value: T) -> Result<(), StoreError> {
    map.write()
        .map_err(|_| StoreError::Unavailable("Failed to acquire write lock".to_string()))?
        .insert(id, value);
    Ok(())
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_workspace(&self, workspace: Workspace) -> Result<(), StoreError> {
        write(&self.workspaces, workspace.id.clone(), workspace)
    }

    pub fn insert_collection(&self, collection: Collection) -> Result<(), StoreError> {
        write(&self.collections, collection.id.clone(), collection)
    }

    pub fn insert_folder(&self, folder: Folder) -> Result<(), StoreError> {
        write(&self.folders, folder.id.clone(), folder)
    }

    pub fn insert_request(&self, request: Request) -> Result<(), StoreError> {
        write(&self.requests, request.id.clone(), request)
    }

    pub fn insert_environment(&self, environment: Environment) -> Result<(), StoreError> {
        write(&self.environments, environment.id.clone(), environment)
    }

    /// Requests owned directly by `folder_id`, sorted by name.
    pub fn requests_in_folder(&self, folder_id: &str) -> Vec<Request> {
        let mut requests: Vec<Request> = self
            .requests
            .read()
            .map(|m| {
                m.values()
                    .filter(|r| r.folder_id == folder_id)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        requests.sort_by(|a, b| a.name.cmp(&b.name));
        requests
    }

    /// Deletes a folder, its nested folders and every request they own.
    ///
    /// Returns the number of requests removed.
    pub fn delete_folder(&self, folder_id: &str) -> Result<usize, StoreError> {
        let mut folders = self
            .folders
            .write()
            .map_err(|_| StoreError::Unavailable("Failed to acquire write lock".to_string()))?;
        if !folders.contains_key(folder_id) {
            return Err(StoreError::NotFound {
                kind: "folder",
                id: folder_id.to_string(),
            });
        }

        // a parent_id cycle must not revisit folders already collected
        let mut doomed = vec![folder_id.to_string()];
        let mut seen: HashSet<String> = doomed.iter().cloned().collect();
        let mut i = 0;
        while i < doomed.len() {
            let parent = doomed[i].clone();
            for folder in folders.values() {
                if folder.parent_id.as_deref() == Some(parent.as_str())
                    && seen.insert(folder.id.clone())
                {
                    doomed.push(folder.id.clone());
                }
            }
            i += 1;
        }
        for id in &doomed {
            folders.remove(id);
        }

        let mut requests = self
            .requests
            .write()
            .map_err(|_| StoreError::Unavailable("Failed to acquire write lock".to_string()))?;
        let before = requests.len();
        requests.retain(|_, r| !seen.contains(&r.folder_id));
        Ok(before - requests.len())
    }
}

impl WorkspaceStore for InMemoryStore {
    fn get_request(&self, id: &str) -> Option<Request> {
        read(&self.requests, id)
    }

    fn get_folder(&self, id: &str) -> Option<Folder> {
        read(&self.folders, id)
    }

    fn get_collection(&self, id: &str) -> Option<Collection> {
        read(&self.collections, id)
    }

    fn get_workspace(&self, id: &str) -> Option<Workspace> {
        read(&self.workspaces, id)
    }

    fn get_environment(&self, id: &str) -> Option<Environment> {
        read(&self.environments, id)
    }

    fn update_environment(
        &self,
        id: &str,
        variables: Vec<EnvironmentVariable>,
    ) -> Result<(), StoreError> {
        let mut environments = self
            .environments
            .write()
            .map_err(|_| StoreError::Unavailable("Failed to acquire write lock".to_string()))?;
        let environment = environments.get_mut(id).ok_or_else(|| StoreError::NotFound {
            kind: "environment",
            id: id.to_string(),
        })?;
        environment.variables = variables;
        Ok(())
    }
}
