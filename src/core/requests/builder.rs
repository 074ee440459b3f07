//! Request builder
//!
//! Pure constructors for every storage operation of the document-status state
//! machine. Each request is tenant-scoped: the default tenant uses the base
//! table, any other tenant uses `{base}-{tenant}`.

use super::model::{
    Condition, DeleteRequest, GetRequest, PutRequest, StatusUpdateRequest, VersionQuery,
};
use crate::core::{clock, codec};
use crate::domain::{DocumentStatus, ItemKey, Result, StoredItem, TenantId};
use serde_json::Value;

/// Lease granted by a locking transition, in milliseconds
pub const LOCK_DURATION_MS: i64 = 35_000;

/// Builds tenant-scoped storage requests
#[derive(Debug, Clone)]
pub struct RequestBuilder {
    base_table: String,
    lease_ms: i64,
}

impl RequestBuilder {
    pub fn new(base_table: impl Into<String>) -> Self {
        Self {
            base_table: base_table.into(),
            lease_ms: LOCK_DURATION_MS,
        }
    }

    /// Overrides the lease granted by locking transitions
    pub fn with_lease_ms(mut self, lease_ms: i64) -> Self {
        self.lease_ms = lease_ms;
        self
    }

    pub fn base_table(&self) -> &str {
        &self.base_table
    }

    pub fn lease_ms(&self) -> i64 {
        self.lease_ms
    }

    /// Table for a tenant
    pub fn table_name(&self, tenant: Option<&TenantId>) -> String {
        match tenant {
            Some(tenant) => format!("{}-{}", self.base_table, tenant),
            None => self.base_table.clone(),
        }
    }

    /// Conditional status change of `(id, vid)`.
    ///
    /// With `old_status`, the update only applies when the item has that status or
    /// holds a stale lease. Without it, the update is unconditional. A locking
    /// target status extends the lease to now + lease; any other target sets it
    /// to now.
    pub fn build_status_transition(
        &self,
        old_status: Option<DocumentStatus>,
        new_status: DocumentStatus,
        id: &str,
        vid: u64,
        resource_type: &str,
        tenant: Option<&TenantId>,
    ) -> StatusUpdateRequest {
        let now = clock::now_millis();
        StatusUpdateRequest {
            table: self.table_name(tenant),
            key: ItemKey::new(id, vid),
            new_status,
            lock_end_ts: self.lock_end_ts(new_status, now),
            condition: old_status.map(|expected| Condition::StatusTransition {
                resource_type: resource_type.to_string(),
                expected,
                current_ts: now,
            }),
        }
    }

    /// Status change of `(id, vid)` that applies only while the item is in one
    /// of `allowed`. Expired leases are not taken over, so a version that has
    /// reached a terminal status stays there.
    pub fn build_guarded_transition(
        &self,
        allowed: &[DocumentStatus],
        new_status: DocumentStatus,
        id: &str,
        vid: u64,
        resource_type: &str,
        tenant: Option<&TenantId>,
    ) -> StatusUpdateRequest {
        StatusUpdateRequest {
            table: self.table_name(tenant),
            key: ItemKey::new(id, vid),
            new_status,
            lock_end_ts: self.lock_end_ts(new_status, clock::now_millis()),
            condition: Some(Condition::StatusIn {
                resource_type: resource_type.to_string(),
                allowed: allowed.to_vec(),
            }),
        }
    }

    fn lock_end_ts(&self, new_status: DocumentStatus, now: i64) -> i64 {
        if new_status.is_leased() {
            now + self.lease_ms
        } else {
            now
        }
    }

    /// Put of a version written straight to `AVAILABLE`, guarded against an
    /// existing item under the same key. Create path only.
    pub fn build_commit_put(
        &self,
        resource: &Value,
        id: &str,
        vid: u64,
        tenant: Option<&TenantId>,
    ) -> Result<PutRequest> {
        let item = codec::encode(resource, id, vid, DocumentStatus::Available)?;
        Ok(PutRequest {
            table: self.table_name(tenant),
            item,
            condition: Some(Condition::ItemAbsent),
        })
    }

    /// Put of a new version of an already encoded item. The key must be free.
    pub fn build_version_put(&self, item: StoredItem, tenant: Option<&TenantId>) -> PutRequest {
        PutRequest {
            table: self.table_name(tenant),
            item,
            condition: Some(Condition::ItemAbsent),
        }
    }

    pub fn build_get(&self, id: &str, vid: Option<u64>, tenant: Option<&TenantId>) -> GetRequest {
        GetRequest {
            table: self.table_name(tenant),
            id: id.to_string(),
            vid,
        }
    }

    pub fn build_delete(&self, id: &str, vid: u64, tenant: Option<&TenantId>) -> DeleteRequest {
        DeleteRequest {
            table: self.table_name(tenant),
            key: ItemKey::new(id, vid),
            condition: None,
        }
    }

    /// Delete of a staged version; only applies while it is still `PENDING`
    pub fn build_staged_delete(
        &self,
        id: &str,
        vid: u64,
        resource_type: &str,
        tenant: Option<&TenantId>,
    ) -> DeleteRequest {
        DeleteRequest {
            condition: Some(Condition::StatusIn {
                resource_type: resource_type.to_string(),
                allowed: vec![DocumentStatus::Pending],
            }),
            ..self.build_delete(id, vid, tenant)
        }
    }

    pub fn build_version_query(
        &self,
        id: &str,
        resource_type: Option<&str>,
        limit: usize,
        tenant: Option<&TenantId>,
        projection: Option<Vec<String>>,
    ) -> VersionQuery {
        VersionQuery {
            table: self.table_name(tenant),
            id: id.to_string(),
            resource_type: resource_type.map(str::to_string),
            limit,
            projection,
        }
    }
}
