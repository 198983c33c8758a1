//! Environment data models.
//!
//! An environment is a named bag of variables. Each variable carries a scope
//! so the same key can hold different values for different collections or
//! workspaces while a single environment is active.

use crate::models::KeyValue;
use serde::{Deserialize, Serialize};

/// Where a variable applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VariableScope {
    /// Applies everywhere.
    Global,
    /// Applies to requests inside the workspace named by `scope_id`.
    Workspace,
    /// Applies to requests inside the collection named by `scope_id`.
    Collection,
}

impl Default for VariableScope {
    fn default() -> Self {
        VariableScope::Global
    }
}

impl std::fmt::Display for VariableScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            VariableScope::Global => "global",
            VariableScope::Workspace => "workspace",
            VariableScope::Collection => "collection",
        };
        write!(f, "{}", name)
    }
}

/// A single environment variable.
///
/// `scope_id` is required whenever `scope` is not [`VariableScope::Global`].
/// The `(key, scope, scope_id)` triple is unique by convention only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnvironmentVariable {
    pub key: String,
    pub value: String,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default)]
    pub scope: VariableScope,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope_id: Option<String>,
}

fn default_enabled() -> bool {
    true
}

impl EnvironmentVariable {
    /// Creates an enabled global variable.
    pub fn global(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
            enabled: true,
            scope: VariableScope::Global,
            scope_id: None,
        }
    }

    /// Creates an enabled variable scoped to a workspace.
    pub fn workspace(
        key: impl Into<String>,
        value: impl Into<String>,
        workspace_id: impl Into<String>,
    ) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
            enabled: true,
            scope: VariableScope::Workspace,
            scope_id: Some(workspace_id.into()),
        }
    }

    /// Creates an enabled variable scoped to a collection.
    pub fn collection(
        key: impl Into<String>,
        value: impl Into<String>,
        collection_id: impl Into<String>,
    ) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
            enabled: true,
            scope: VariableScope::Collection,
            scope_id: Some(collection_id.into()),
        }
    }

    /// Builder-style toggle.
    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    /// Whether this variable is an enabled candidate for `key` in `scope`.
    ///
    /// Global variables ignore `scope_id`.
    pub fn matches(&self, key: &str, scope: VariableScope, scope_id: Option<&str>) -> bool {
        if !self.enabled || self.key != key || self.scope != scope {
            return false;
        }
        match scope {
            VariableScope::Global => true,
            _ => self.scope_id.as_deref() == scope_id,
        }
    }
}

/// A named environment holding scoped variables and default headers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Environment {
    pub id: String,

    /// Environment name (e.g., "dev", "staging", "production")
    pub name: String,

    #[serde(default)]
    pub variables: Vec<EnvironmentVariable>,

    /// Headers sent with every request while this environment is active.
    #[serde(default)]
    pub headers: Vec<KeyValue>,
}

impl Environment {
    /// Creates an empty environment with a random id.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            name: name.into(),
            variables: Vec::new(),
            headers: Vec::new(),
        }
    }

    /// Creates an environment with the given variables.
    pub fn with_variables(name: impl Into<String>, variables: Vec<EnvironmentVariable>) -> Self {
        Self {
            variables,
            ..Self::new(name)
        }
    }

    /// Flat lookup: the first enabled variable with this key, regardless of scope.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.variables
            .iter()
            .find(|v| v.enabled && v.key == key)
            .map(|v| v.value.as_str())
    }

    /// Upserts a variable by key.
    ///
    /// The first existing variable with the key keeps its scope, scope id and
    /// enabled flag and has its value replaced. A new key is added as an
    /// enabled global variable.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.variables.iter_mut().find(|v| v.key == key) {
            Some(existing) => existing.value = value,
            None => self.variables.push(EnvironmentVariable::global(key, value)),
        }
    }

    /// Removes every variable with this key. Returns how many were removed.
    pub fn unset(&mut self, key: &str) -> usize {
        let before = self.variables.len();
        self.variables.retain(|v| v.key != key);
        before - self.variables.len()
    }

    /// Checks if any variable (enabled or not) uses this key.
    pub fn contains(&self, key: &str) -> bool {
        self.variables.iter().any(|v| v.key == key)
    }

    /// Returns the number of variables
    pub fn len(&self) -> usize {
        self.variables.len()
    }

    /// Checks if the environment has no variables
    pub fn is_empty(&self) -> bool {
        self.variables.is_empty()
    }
}
