//! Document store trait
//!
//! The contract every key-value backend must satisfy: point operations guarded by
//! a [`Condition`](crate::core::requests::Condition), a version query ordered by
//! `vid` descending, and an all-or-nothing write set.

use crate::core::requests::{
    DeleteRequest, GetRequest, PutRequest, StatusUpdateRequest, VersionQuery, WriteRequest,
};
use crate::domain::{Result, StoredItem};
use async_trait::async_trait;

/// Conditional-write key-value store holding [`StoredItem`]s
///
/// A failed condition must surface as
/// [`StorageError::PreconditionFailed`](crate::domain::StorageError::PreconditionFailed)
/// so callers can tell contention apart from other failures.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Short backend name for logging
    fn backend_name(&self) -> &'static str;

    /// Test the connection to the backend
    async fn test_connection(&self) -> Result<()> {
        Ok(())
    }

    /// Point get; `None` when absent or when the request has no vid
    async fn get_item(&self, request: &GetRequest) -> Result<Option<StoredItem>>;

    /// Put, replacing any existing item unless the condition forbids it
    async fn put_item(&self, request: &PutRequest) -> Result<()>;

    /// Status and lease update of an existing item
    ///
    /// # Errors
    ///
    /// `PreconditionFailed` when the condition does not hold, `ItemNotFound` when an
    /// unconditional update targets a missing item.
    async fn update_item(&self, request: &StatusUpdateRequest) -> Result<()>;

    /// Point delete; deleting a missing item succeeds
    async fn delete_item(&self, request: &DeleteRequest) -> Result<()>;

    /// Versions of one id ordered by `vid` descending, filtered and limited
    async fn query_versions(&self, query: &VersionQuery) -> Result<Vec<StoredItem>>;

    /// Applies all writes or none of them
    ///
    /// # Errors
    ///
    /// `PreconditionFailed` when any member's condition does not hold.
    async fn transact_write(&self, requests: &[WriteRequest]) -> Result<()>;

    /// Batched point gets; results are positionally aligned with `requests`
    async fn batch_get(&self, requests: &[GetRequest]) -> Result<Vec<Option<StoredItem>>> {
        let mut results = Vec::with_capacity(requests.len());
        for request in requests {
            results.push(self.get_item(request).await?);
        }
        Ok(results)
    }
}
