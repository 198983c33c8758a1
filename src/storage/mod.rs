//! Storage collaborator.
//!
//! The core never owns persistence. It reads requests, folders, collections
//! and environments through [`WorkspaceStore`] and writes environments back
//! only when the caller applies a script result. [`InMemoryStore`] is the
//! reference implementation used by the binary and by tests.

pub mod memory;

pub use memory::InMemoryStore;

use crate::environment::{Environment, EnvironmentVariable};
use crate::models::{Collection, Folder, Request, Workspace};

/// Errors returned by store mutations.
#[derive(Debug, Clone, PartialEq)]
pub enum StoreError {
    /// No entity of the given kind has this id.
    NotFound { kind: &'static str, id: String },

    /// The backing store could not be accessed.
    Unavailable(String),
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreError::NotFound { kind, id } => write!(f, "{} '{}' not found", kind, id),
            StoreError::Unavailable(msg) => write!(f, "Store unavailable: {}", msg),
        }
    }
}

impl std::error::Error for StoreError {}

/// Read and write access to the entities the core needs.
///
/// Lookups return owned clones; a missing entity is `None`, never an error.
pub trait WorkspaceStore {
    fn get_request(&self, id: &str) -> Option<Request>;

    fn get_folder(&self, id: &str) -> Option<Folder>;

    fn get_collection(&self, id: &str) -> Option<Collection>;

    fn get_workspace(&self, id: &str) -> Option<Workspace>;

    fn get_environment(&self, id: &str) -> Option<Environment>;

    /// Replaces the variables of an existing environment.
    fn update_environment(
        &self,
        id: &str,
        variables: Vec<EnvironmentVariable>,
    ) -> Result<(), StoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_error_display() {
        let err = StoreError::NotFound {
            kind: "environment",
            id: "env-1".to_string(),
        };
        assert_eq!(err.to_string(), "environment 'env-1' not found");
        assert_eq!(
            StoreError::Unavailable("poisoned lock".to_string()).to_string(),
            "Store unavailable: poisoned lock"
        );
    }
}
