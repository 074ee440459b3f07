//! Bundle request and response types

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Logical operation carried by a bundle entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    Create,
    Read,
    Update,
    Delete,
    /// Anything else; staging skips it
    #[serde(other)]
    Unsupported,
}

impl Operation {
    /// True for operations that write a new physical version
    pub fn writes_new_version(self) -> bool {
        matches!(self, Operation::Create | Operation::Update)
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Operation::Create => "create",
            Operation::Read => "read",
            Operation::Update => "update",
            Operation::Delete => "delete",
            Operation::Unsupported => "unsupported",
        };
        f.write_str(name)
    }
}

/// One logical operation of a bundle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchRequest {
    pub operation: Operation,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    pub resource_type: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource: Option<Value>,
}

impl BatchRequest {
    pub fn create(resource_type: impl Into<String>, resource: Value) -> Self {
        Self {
            operation: Operation::Create,
            id: None,
            resource_type: resource_type.into(),
            resource: Some(resource),
        }
    }

    pub fn read(resource_type: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            operation: Operation::Read,
            id: Some(id.into()),
            resource_type: resource_type.into(),
            resource: None,
        }
    }

    pub fn update(resource_type: impl Into<String>, id: impl Into<String>, resource: Value) -> Self {
        Self {
            operation: Operation::Update,
            id: Some(id.into()),
            resource_type: resource_type.into(),
            resource: Some(resource),
        }
    }

    pub fn delete(resource_type: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            operation: Operation::Delete,
            id: Some(id.into()),
            resource_type: resource_type.into(),
            resource: None,
        }
    }

    /// Target id: the explicit id, or `resource.id` for updates
    pub fn target_id(&self) -> Option<&str> {
        self.id.as_deref().or_else(|| {
            if self.operation == Operation::Update {
                self.resource
                    .as_ref()
                    .and_then(|r| r.get("id"))
                    .and_then(Value::as_str)
            } else {
                None
            }
        })
    }
}

/// Outcome row of one logical operation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BundleEntryResponse {
    pub id: String,

    /// Absent only for reads whose version was never resolved
    #[serde(default)]
    pub vid: Option<u64>,

    pub resource_type: String,

    pub operation: Operation,

    /// RFC 3339 timestamp, empty when unknown
    #[serde(default)]
    pub last_modified: String,

    #[serde(default = "empty_resource")]
    pub resource: Value,
}

/// In-flight lock recorded for rollback and finalization
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LockEntry {
    pub id: String,
    pub vid: u64,
    pub resource_type: String,
    pub operation: Operation,

    /// `Some(true)` for the prior version an update supersedes,
    /// `Some(false)` for the version the update writes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_original_update_item: Option<bool>,
}

/// Lock ledger entry to drop after its staged version has been deleted
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LockRemoval {
    pub id: String,
    pub vid: u64,
    pub resource_type: String,
}

/// Why a bundle did not commit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BundleErrorKind {
    /// Another transaction holds a valid lease on a referenced resource
    Conflict,
    /// Staging failed and was rolled back
    System,
}

/// Final result of a bundle transaction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BundleResponse {
    pub success: bool,
    pub message: String,
    pub entries: Vec<BundleEntryResponse>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<BundleErrorKind>,
}

impl BundleResponse {
    pub fn committed(entries: Vec<BundleEntryResponse>) -> Self {
        Self {
            success: true,
            message: "Successfully committed requests to DB".to_string(),
            entries,
            error_kind: None,
        }
    }

    pub fn failed(kind: BundleErrorKind, message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            entries: Vec::new(),
            error_kind: Some(kind),
        }
    }
}

pub(crate) fn empty_resource() -> Value {
    Value::Object(serde_json::Map::new())
}
