//! Current-version resolution
//!
//! The readable version of an id is the newest one that is not `PENDING`. A
//! `DELETED` readable version means the resource no longer exists.

use crate::adapters::storage::DocumentStore;
use crate::core::requests::RequestBuilder;
use crate::domain::{DocumentStatus, Result, StoredItem, TenantId};

/// Versions fetched per lookup: the newest may be an uncommitted `PENDING` one
pub const VERSION_LOOKUP_LIMIT: usize = 2;

/// Resolves the readable version of `resource_type/id`, `None` when the id is
/// unknown or deleted
pub async fn current_version(
    store: &dyn DocumentStore,
    builder: &RequestBuilder,
    resource_type: &str,
    id: &str,
    tenant: Option<&TenantId>,
) -> Result<Option<StoredItem>> {
    let query =
        builder.build_version_query(id, Some(resource_type), VERSION_LOOKUP_LIMIT, tenant, None);
    let versions = store.query_versions(&query).await?;

    Ok(versions
        .into_iter()
        .find(|item| item.document_status != DocumentStatus::Pending)
        .filter(|item| item.document_status != DocumentStatus::Deleted))
}
