//! Stored item representation
//!
//! A [`StoredItem`] is one version of one logical resource as it sits in the
//! document store: the resource body plus the engine's bookkeeping attributes.

use super::errors::{StorageError, VellumError};
use super::result::Result;
use super::status::DocumentStatus;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Attribute names reserved for bookkeeping
pub const DOCUMENT_STATUS_FIELD: &str = "documentStatus";
pub const LOCK_END_TS_FIELD: &str = "lockEndTs";
pub const EXTERNAL_ID_FIELD: &str = "externalId";
pub const VID_FIELD: &str = "vid";
pub const REFERENCES_FIELD: &str = "_references";

/// Composite primary key of a stored version
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ItemKey {
    pub id: String,
    pub vid: u64,
}

impl ItemKey {
    pub fn new(id: impl Into<String>, vid: u64) -> Self {
        Self { id: id.into(), vid }
    }
}

impl fmt::Display for ItemKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.id, self.vid)
    }
}

/// One version of one logical resource
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredItem {
    pub id: String,

    pub vid: u64,

    #[serde(rename = "resourceType")]
    pub resource_type: String,

    #[serde(rename = "documentStatus")]
    pub document_status: DocumentStatus,

    /// Lease expiry in epoch milliseconds
    #[serde(rename = "lockEndTs")]
    pub lock_end_ts: i64,

    #[serde(rename = "externalId")]
    pub external_id: String,

    #[serde(rename = "_references", default, skip_serializing_if = "Vec::is_empty")]
    pub references: Vec<String>,

    /// Remaining resource attributes, `meta` included
    #[serde(flatten)]
    pub body: Map<String, Value>,
}

impl StoredItem {
    /// Primary key of this version
    pub fn key(&self) -> ItemKey {
        ItemKey::new(self.id.clone(), self.vid)
    }

    /// `meta.lastUpdated`, if the resource carries one
    pub fn last_updated(&self) -> Option<&str> {
        self.body
            .get("meta")
            .and_then(|meta| meta.get("lastUpdated"))
            .and_then(Value::as_str)
    }

    /// `meta.versionId`, if the resource carries one
    pub fn version_id(&self) -> Option<&str> {
        self.body
            .get("meta")
            .and_then(|meta| meta.get("versionId"))
            .and_then(Value::as_str)
    }

    /// True while the status holds an unexpired lease
    pub fn holds_valid_lease(&self, now_ms: i64) -> bool {
        self.document_status.is_leased() && self.lock_end_ts >= now_ms
    }

    /// True once a leased status has passed its expiry and may be reclaimed
    pub fn is_stale(&self, now_ms: i64) -> bool {
        self.document_status.is_leased() && now_ms > self.lock_end_ts
    }

    /// Serializes the item into its flat JSON form
    pub fn to_json(&self) -> Result<Value> {
        serde_json::to_value(self).map_err(VellumError::from)
    }

    /// Parses a flat JSON image, as found in storage rows and change records
    pub fn from_json(value: Value) -> Result<Self> {
        serde_json::from_value(value)
            .map_err(|e| StorageError::DeserializationFailed(e.to_string()).into())
    }
}
