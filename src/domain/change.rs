//! Change-feed records consumed by the projector

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Kind of mutation reported by the store's change feed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ChangeEventType {
    #[serde(alias = "insert")]
    Insert,
    #[serde(alias = "modify")]
    Modify,
    #[serde(alias = "remove")]
    Remove,
}

/// One before/after image pair from the change feed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeRecord {
    pub event_type: ChangeEventType,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub old_image: Option<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_image: Option<Value>,

    /// Identifier of the emitting table, e.g. `arn:...:table/resource-db-acme/stream/...`
    #[serde(default)]
    pub source_identifier: String,
}

impl ChangeRecord {
    /// The image that decides the projection: old on remove, new otherwise
    pub fn deciding_image(&self) -> Option<&Value> {
        match self.event_type {
            ChangeEventType::Remove => self.old_image.as_ref(),
            ChangeEventType::Insert | ChangeEventType::Modify => self.new_image.as_ref(),
        }
    }
}
