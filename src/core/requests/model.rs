//! Typed storage requests
//!
//! Every storage operation the engine issues is described by one of these values
//! before it reaches a [`DocumentStore`](crate::adapters::storage::DocumentStore).
//! Conditions are evaluated by [`Condition::is_satisfied_by`], so all backends
//! share one predicate.

use crate::domain::{DocumentStatus, ItemKey, StorageError, StoredItem};
use serde::Serialize;

/// Write precondition
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Condition {
    /// No item may exist under the written key
    ItemAbsent,

    /// `resourceType = resource_type AND (documentStatus = expected OR
    /// (lockEndTs < current_ts AND documentStatus IN (LOCKED, PENDING, PENDING_DELETE)))`
    ///
    /// The second disjunct is the stale-lock takeover rule.
    StatusTransition {
        resource_type: String,
        expected: DocumentStatus,
        current_ts: i64,
    },

    /// `resourceType = resource_type AND documentStatus IN allowed`, with no
    /// stale-lease takeover. Guards writes that only the lease holder may make.
    StatusIn {
        resource_type: String,
        allowed: Vec<DocumentStatus>,
    },
}

impl Condition {
    /// Evaluates the condition against the item currently stored under the key
    pub fn is_satisfied_by(&self, existing: Option<&StoredItem>) -> bool {
        match self {
            Condition::ItemAbsent => existing.is_none(),
            Condition::StatusTransition {
                resource_type,
                expected,
                current_ts,
            } => match existing {
                None => false,
                Some(item) => {
                    item.resource_type == *resource_type
                        && (item.document_status == *expected
                            || (item.lock_end_ts < *current_ts
                                && item.document_status.is_leased()))
                }
            },
            Condition::StatusIn {
                resource_type,
                allowed,
            } => existing.map_or(false, |item| {
                item.resource_type == *resource_type && allowed.contains(&item.document_status)
            }),
        }
    }
}

/// Put of a whole item
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PutRequest {
    pub table: String,
    pub item: StoredItem,
    pub condition: Option<Condition>,
}

/// Status and lease update of an existing item
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusUpdateRequest {
    pub table: String,
    pub key: ItemKey,
    pub new_status: DocumentStatus,
    pub lock_end_ts: i64,
    /// `None` applies the update unconditionally, but the item must exist
    pub condition: Option<Condition>,
}

impl StatusUpdateRequest {
    /// Applies the new status and lease to `item`
    pub fn apply_to(&self, item: &mut StoredItem) {
        item.document_status = self.new_status;
        item.lock_end_ts = self.lock_end_ts;
    }
}

/// Point delete
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeleteRequest {
    pub table: String,
    pub key: ItemKey,
    /// `None` deletes whatever is stored, including nothing
    pub condition: Option<Condition>,
}

/// Point get
///
/// `vid` stays `None` when a read's version was never resolved; such a get
/// finds nothing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GetRequest {
    pub table: String,
    pub id: String,
    pub vid: Option<u64>,
}

/// Versions of one id, newest first
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VersionQuery {
    pub table: String,
    pub id: String,
    pub resource_type: Option<String>,
    pub limit: usize,
    /// Resource attributes to keep; bookkeeping attributes are always returned
    pub projection: Option<Vec<String>>,
}

impl VersionQuery {
    /// True when `item` passes the resource type filter
    pub fn matches(&self, item: &StoredItem) -> bool {
        self.resource_type
            .as_deref()
            .map_or(true, |rt| item.resource_type == rt)
    }

    /// Drops resource attributes outside the projection
    pub fn project(&self, mut item: StoredItem) -> StoredItem {
        if let Some(fields) = &self.projection {
            item.body.retain(|k, _| fields.iter().any(|f| f == k));
        }
        item
    }
}

/// Member of an all-or-nothing write set
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "request")]
pub enum WriteRequest {
    Put(PutRequest),
    Update(StatusUpdateRequest),
    Delete(DeleteRequest),
}

impl WriteRequest {
    pub fn table(&self) -> &str {
        match self {
            WriteRequest::Put(r) => &r.table,
            WriteRequest::Update(r) => &r.table,
            WriteRequest::Delete(r) => &r.table,
        }
    }

    pub fn key(&self) -> ItemKey {
        match self {
            WriteRequest::Put(r) => r.item.key(),
            WriteRequest::Update(r) => r.key.clone(),
            WriteRequest::Delete(r) => r.key.clone(),
        }
    }

    /// Checks this write against the item currently stored under its key
    pub fn check(&self, existing: Option<&StoredItem>) -> Result<(), StorageError> {
        let condition = match self {
            WriteRequest::Put(r) => r.condition.as_ref(),
            WriteRequest::Update(r) => {
                if r.condition.is_none() && existing.is_none() {
                    return Err(StorageError::ItemNotFound(format!(
                        "{} in {}",
                        r.key, r.table
                    )));
                }
                r.condition.as_ref()
            }
            WriteRequest::Delete(r) => r.condition.as_ref(),
        };
        match condition {
            Some(condition) if !condition.is_satisfied_by(existing) => {
                Err(StorageError::PreconditionFailed(format!(
                    "Condition {:?} failed for {} in {}",
                    condition,
                    self.key(),
                    self.table()
                )))
            }
            _ => Ok(()),
        }
    }

    /// Item to store after this write, `None` when the key ends up empty.
    ///
    /// Call only after [`check`](Self::check) has passed.
    pub fn resulting_item(&self, existing: Option<&StoredItem>) -> Option<StoredItem> {
        match self {
            WriteRequest::Put(r) => Some(r.item.clone()),
            WriteRequest::Update(r) => existing.cloned().map(|mut item| {
                r.apply_to(&mut item);
                item
            }),
            WriteRequest::Delete(_) => None,
        }
    }
}

impl From<PutRequest> for WriteRequest {
    fn from(r: PutRequest) -> Self {
        WriteRequest::Put(r)
    }
}

impl From<StatusUpdateRequest> for WriteRequest {
    fn from(r: StatusUpdateRequest) -> Self {
        WriteRequest::Update(r)
    }
}

impl From<DeleteRequest> for WriteRequest {
    fn from(r: DeleteRequest) -> Self {
        WriteRequest::Delete(r)
    }
}
