//! Ownership hierarchy: workspaces own collections, collections own folders,
//! folders own requests and optionally nested folders.

use serde::{Deserialize, Serialize};

/// Top-level grouping and the anchor for workspace-scoped variables.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Workspace {
    pub id: String,
    pub name: String,
}

impl Workspace {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            name: name.into(),
        }
    }
}

/// A set of folders; the anchor for collection-scoped variables.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Collection {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub workspace_id: String,
}

impl Collection {
    pub fn new(name: impl Into<String>, workspace_id: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            name: name.into(),
            description: None,
            workspace_id: workspace_id.into(),
        }
    }
}

/// A folder inside a collection.
///
/// `parent_id` is set for nested folders; top-level folders hang directly off
/// the collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Folder {
    pub id: String,
    pub name: String,
    pub collection_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
}

impl Folder {
    pub fn new(name: impl Into<String>, collection_id: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            name: name.into(),
            collection_id: collection_id.into(),
            parent_id: None,
        }
    }

    /// Creates a folder nested under `parent`, in the same collection.
    pub fn nested(name: impl Into<String>, parent: &Folder) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            name: name.into(),
            collection_id: parent.collection_id.clone(),
            parent_id: Some(parent.id.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nested_folder_shares_collection() {
        let parent = Folder::new("Users", "c1");
        let child = Folder::nested("Admin", &parent);

        assert_eq!(child.collection_id, "c1");
        assert_eq!(child.parent_id.as_deref(), Some(parent.id.as_str()));
        assert_ne!(child.id, parent.id);
    }

    #[test]
    fn test_collection_serializes_camel_case() {
        let collection = Collection::new("API", "ws-1");
        let json = serde_json::to_value(&collection).unwrap();
        assert_eq!(json["workspaceId"], "ws-1");
        assert!(json.get("description").is_none());
    }
}
