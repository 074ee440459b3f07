//! Projection planning
//!
//! Decides, per change record, what the search index must do. The deciding
//! image is the new image, or the old one for a remove.

use crate::domain::item::{DOCUMENT_STATUS_FIELD, VID_FIELD};
use crate::domain::{ChangeEventType, ChangeRecord, DocumentStatus, Result, TenantId, VellumError};
use serde_json::Value;
use std::fmt;

/// Binary resources are never searchable
pub const BINARY_RESOURCE: &str = "binary";

/// Field carrying the tenant on tenant-scoped index documents
pub const TENANT_ID_FIELD: &str = "tenantId";

/// Projector phases, executed in declaration order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ProjectionPhase {
    UpsertAvailable,
    UpsertDeleted,
    Delete,
}

impl ProjectionPhase {
    pub const ORDERED: [ProjectionPhase; 3] = [
        ProjectionPhase::UpsertAvailable,
        ProjectionPhase::UpsertDeleted,
        ProjectionPhase::Delete,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ProjectionPhase::UpsertAvailable => "upsert-AVAILABLE",
            ProjectionPhase::UpsertDeleted => "upsert-DELETED",
            ProjectionPhase::Delete => "delete",
        }
    }
}

impl fmt::Display for ProjectionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One index operation derived from a change record
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectionAction {
    pub phase: ProjectionPhase,
    pub index: String,
    pub composite_id: String,
    /// Document to upsert; `None` for deletes
    pub document: Option<Value>,
}

/// Index document key: `{id}_{vid}`
pub fn composite_id(id: &str, vid: u64) -> String {
    format!("{id}_{vid}")
}

/// Lower-cased resource type, suffixed with the tenant when there is one
pub fn index_name(resource_type: &str, tenant: Option<&TenantId>) -> String {
    let base = resource_type.to_lowercase();
    match tenant {
        Some(tenant) => format!("{base}-{}", tenant.as_str().to_lowercase()),
        None => base,
    }
}

/// Recovers the tenant from a change-feed source identifier
///
/// The table name is the segment after `table/`, or the whole identifier.
/// The base table is the default tenant, `{base}-{tenant}` names a tenant, and
/// any other name is read as its last hyphen-delimited segment.
pub fn resolve_tenant(source_identifier: &str, base_table: &str) -> Option<TenantId> {
    let table = match source_identifier.split_once("table/") {
        Some((_, rest)) => rest.split('/').next().unwrap_or(rest),
        None => source_identifier,
    };

    if table.is_empty() || table == base_table {
        return None;
    }

    let candidate = table
        .strip_prefix(base_table)
        .and_then(|rest| rest.strip_prefix('-'))
        .unwrap_or_else(|| table.rsplit('-').next().unwrap_or(table));

    match TenantId::new(candidate) {
        Ok(tenant) => Some(tenant),
        Err(e) => {
            tracing::debug!(source = %source_identifier, error = %e, "No tenant in source identifier");
            None
        }
    }
}

/// Plans the index operation for one record
///
/// `Ok(None)` means the record is deliberately not projected: a binary
/// resource, or a status outside the visible corpus.
///
/// # Errors
///
/// `Validation` when the deciding image lacks an id, vid, resource type or a
/// known status.
pub fn plan_action(record: &ChangeRecord, tenant: Option<&TenantId>) -> Result<Option<ProjectionAction>> {
    let image = record
        .deciding_image()
        .ok_or_else(|| malformed(format!("{:?} record has no image", record.event_type)))?;

    let resource_type = image
        .get("resourceType")
        .and_then(Value::as_str)
        .filter(|rt| !rt.is_empty())
        .ok_or_else(|| malformed("image has no resourceType".to_string()))?;

    if resource_type.eq_ignore_ascii_case(BINARY_RESOURCE) {
        return Ok(None);
    }

    let id = image
        .get("id")
        .and_then(Value::as_str)
        .ok_or_else(|| malformed("image has no id".to_string()))?;
    let vid = image_vid(image).ok_or_else(|| malformed(format!("image {id} has no vid")))?;

    let index = index_name(resource_type, tenant);
    let composite_id = composite_id(id, vid);

    if record.event_type == ChangeEventType::Remove {
        return Ok(Some(ProjectionAction {
            phase: ProjectionPhase::Delete,
            index,
            composite_id,
            document: None,
        }));
    }

    let status: DocumentStatus = image
        .get(DOCUMENT_STATUS_FIELD)
        .and_then(Value::as_str)
        .ok_or_else(|| malformed(format!("image {id} has no {DOCUMENT_STATUS_FIELD}")))?
        .parse()
        .map_err(malformed)?;

    let phase = match status {
        DocumentStatus::Available => ProjectionPhase::UpsertAvailable,
        DocumentStatus::Deleted => ProjectionPhase::UpsertDeleted,
        DocumentStatus::Pending | DocumentStatus::Locked | DocumentStatus::PendingDelete => {
            return Ok(None)
        }
    };

    let mut document = image.clone();
    if let (Some(tenant), Value::Object(doc)) = (tenant, &mut document) {
        doc.insert(
            TENANT_ID_FIELD.to_string(),
            Value::String(tenant.as_str().to_string()),
        );
    }

    Ok(Some(ProjectionAction {
        phase,
        index,
        composite_id,
        document: Some(document),
    }))
}

fn image_vid(image: &Value) -> Option<u64> {
    match image.get(VID_FIELD)? {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

fn malformed(message: String) -> VellumError {
    VellumError::Validation(format!("Malformed change record: {message}"))
}
