//! Bundle staging
//!
//! Turns the logical operations of a bundle into the storage requests that stage
//! them, plus the provisional responses and the locks later consumed by rollback.
//! Pure: nothing here touches a store.

use crate::core::codec;
use crate::core::clock;
use crate::core::requests::{GetRequest, PutRequest, RequestBuilder, StatusUpdateRequest, WriteRequest};
use crate::domain::bundle::empty_resource;
use crate::domain::{
    BatchRequest, BundleEntryResponse, DocumentStatus, LockEntry, Operation, Result, StoredItem,
    TenantId, VellumError,
};
use serde::Serialize;
use std::collections::HashMap;

/// Requests and bookkeeping produced for one bundle
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StagingPlan {
    pub create_requests: Vec<PutRequest>,
    pub read_requests: Vec<GetRequest>,
    pub update_requests: Vec<PutRequest>,
    pub delete_requests: Vec<StatusUpdateRequest>,
    pub new_locks: Vec<LockEntry>,
    pub new_staging_responses: Vec<BundleEntryResponse>,
}

impl StagingPlan {
    /// The write set, executed as one all-or-nothing call: deletes, creates, updates
    pub fn write_requests(&self) -> Vec<WriteRequest> {
        self.delete_requests
            .iter()
            .cloned()
            .map(WriteRequest::from)
            .chain(self.create_requests.iter().cloned().map(WriteRequest::from))
            .chain(self.update_requests.iter().cloned().map(WriteRequest::from))
            .collect()
    }
}

/// Stages `requests` given the currently visible version of every referenced id.
///
/// * create: vid 1, generated id when none is given, `PENDING` put, lock entry
/// * update: vid = current + 1 (missing counts as 0), `PENDING` put, lock entry
///   flagged `isOriginalUpdateItem = false`
///
/// Both puts require the key to be free, so a collision fails the write set
/// instead of overwriting a stored version.
/// * delete: `LOCKED -> PENDING_DELETE` on the current vid; a missing current
///   vid is a not-found error
/// * read: point get of the current vid, which stays unresolved when unknown
///
/// Unsupported operations are skipped.
pub fn generate_staging_requests(
    builder: &RequestBuilder,
    requests: &[BatchRequest],
    id_to_version_id: &HashMap<String, u64>,
    tenant: Option<&TenantId>,
) -> Result<StagingPlan> {
    let mut plan = StagingPlan::default();

    for request in requests {
        match request.operation {
            Operation::Create => {
                let id = request
                    .id
                    .clone()
                    .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
                let item = encode_pending(request, &id, 1)?;
                plan.stage_new_version(builder, request, item, tenant);
            }
            Operation::Update => {
                let id = request.target_id().ok_or_else(|| {
                    VellumError::Validation(format!(
                        "Update of {} has no id",
                        request.resource_type
                    ))
                })?;
                let vid = id_to_version_id.get(id).copied().unwrap_or(0) + 1;
                let item = encode_pending(request, id, vid)?;
                plan.stage_new_version(builder, request, item, tenant);
            }
            Operation::Delete => {
                let id = required_id(request)?;
                let vid = id_to_version_id.get(id).copied().ok_or_else(|| {
                    VellumError::ResourceNotFound {
                        resource_type: request.resource_type.clone(),
                        id: id.to_string(),
                    }
                })?;
                plan.delete_requests.push(builder.build_status_transition(
                    Some(DocumentStatus::Locked),
                    DocumentStatus::PendingDelete,
                    id,
                    vid,
                    &request.resource_type,
                    tenant,
                ));
                plan.new_staging_responses.push(BundleEntryResponse {
                    id: id.to_string(),
                    vid: Some(vid),
                    resource_type: request.resource_type.clone(),
                    operation: Operation::Delete,
                    last_modified: clock::now_rfc3339(),
                    resource: empty_resource(),
                });
            }
            Operation::Read => {
                let id = required_id(request)?;
                let vid = id_to_version_id.get(id).copied();
                plan.read_requests.push(builder.build_get(id, vid, tenant));
                plan.new_staging_responses.push(BundleEntryResponse {
                    id: id.to_string(),
                    vid,
                    resource_type: request.resource_type.clone(),
                    operation: Operation::Read,
                    last_modified: String::new(),
                    resource: empty_resource(),
                });
            }
            Operation::Unsupported => {
                tracing::debug!(
                    resource_type = %request.resource_type,
                    "Skipping unsupported bundle operation"
                );
            }
        }
    }

    Ok(plan)
}

impl StagingPlan {
    fn stage_new_version(
        &mut self,
        builder: &RequestBuilder,
        request: &BatchRequest,
        item: StoredItem,
        tenant: Option<&TenantId>,
    ) {
        let operation = request.operation;
        self.new_staging_responses.push(BundleEntryResponse {
            id: item.id.clone(),
            vid: Some(item.vid),
            resource_type: request.resource_type.clone(),
            operation,
            last_modified: item.last_updated().unwrap_or_default().to_string(),
            resource: empty_resource(),
        });
        self.new_locks.push(LockEntry {
            id: item.id.clone(),
            vid: item.vid,
            resource_type: request.resource_type.clone(),
            operation,
            is_original_update_item: (operation == Operation::Update).then_some(false),
        });

        let put = builder.build_version_put(item, tenant);
        if operation == Operation::Create {
            self.create_requests.push(put);
        } else {
            self.update_requests.push(put);
        }
    }
}

fn required_id(request: &BatchRequest) -> Result<&str> {
    request.id.as_deref().ok_or_else(|| {
        VellumError::Validation(format!(
            "{} of {} has no id",
            request.operation, request.resource_type
        ))
    })
}

fn encode_pending(request: &BatchRequest, id: &str, vid: u64) -> Result<StoredItem> {
    let resource = request.resource.as_ref().ok_or_else(|| {
        VellumError::InvalidResource(format!(
            "{} of {}/{} has no resource",
            request.operation, request.resource_type, id
        ))
    })?;
    let item = codec::encode(resource, id, vid, DocumentStatus::Pending)?;
    if item.resource_type != request.resource_type {
        return Err(VellumError::InvalidResource(format!(
            "Resource type {} does not match request type {}",
            item.resource_type, request.resource_type
        )));
    }
    Ok(item)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::requests::Condition;
    use serde_json::json;

    fn builder() -> RequestBuilder {
        RequestBuilder::new("resource-db")
    }

    fn patient(id: Option<&str>) -> serde_json::Value {
        match id {
            Some(id) => json!({"resourceType": "Patient", "id": id}),
            None => json!({"resourceType": "Patient"}),
        }
    }

    #[test]
    fn test_creates_are_vid_one_and_pending() {
        let requests = vec![
            BatchRequest::create("Patient", patient(None)),
            BatchRequest {
                id: Some("chosen".to_string()),
                ..BatchRequest::create("Patient", patient(None))
            },
        ];
        let plan =
            generate_staging_requests(&builder(), &requests, &HashMap::new(), None).unwrap();

        assert_eq!(plan.create_requests.len(), 2);
        assert_eq!(plan.new_locks.len(), 2);
        for put in &plan.create_requests {
            assert_eq!(put.item.vid, 1);
            assert_eq!(put.item.document_status, DocumentStatus::Pending);
            assert_eq!(put.condition, Some(Condition::ItemAbsent));
        }
        assert!(plan.new_locks.iter().all(|l| l.is_original_update_item.is_none()));
        assert_eq!(plan.create_requests[1].item.id, "chosen");
        assert_ne!(plan.create_requests[0].item.id, "chosen");
        assert!(!plan.new_staging_responses[0].last_modified.is_empty());
    }

    #[test]
    fn test_update_increments_current_version() {
        let requests = vec![BatchRequest::update("Patient", "c1", patient(Some("c1")))];
        let versions = HashMap::from([("c1".to_string(), 4)]);
        let plan = generate_staging_requests(&builder(), &requests, &versions, None).unwrap();

        assert_eq!(plan.update_requests[0].item.vid, 5);
        assert_eq!(plan.update_requests[0].condition, Some(Condition::ItemAbsent));
        assert_eq!(plan.new_locks[0].is_original_update_item, Some(false));
        assert_eq!(plan.new_staging_responses[0].vid, Some(5));
    }

    #[test]
    fn test_update_without_known_version_starts_at_one() {
        let requests = vec![BatchRequest::update("Patient", "new", patient(None))];
        let plan =
            generate_staging_requests(&builder(), &requests, &HashMap::new(), None).unwrap();
        assert_eq!(plan.update_requests[0].item.vid, 1);
    }

    #[test]
    fn test_update_takes_id_from_resource() {
        let request = BatchRequest {
            id: None,
            ..BatchRequest::update("Patient", "unused", patient(Some("r1")))
        };
        let versions = HashMap::from([("r1".to_string(), 1)]);
        let plan = generate_staging_requests(&builder(), &[request], &versions, None).unwrap();
        assert_eq!(plan.update_requests[0].item.id, "r1");
        assert_eq!(plan.update_requests[0].item.vid, 2);
    }

    #[test]
    fn test_update_without_any_id_is_rejected() {
        let request = BatchRequest {
            id: None,
            ..BatchRequest::update("Patient", "unused", patient(None))
        };
        let result = generate_staging_requests(&builder(), &[request], &HashMap::new(), None);
        assert!(matches!(result, Err(VellumError::Validation(_))));
    }

    #[test]
    fn test_delete_stages_locked_to_pending_delete() {
        let requests = vec![BatchRequest::delete("Patient", "d1")];
        let versions = HashMap::from([("d1".to_string(), 3)]);
        let plan = generate_staging_requests(&builder(), &requests, &versions, None).unwrap();

        let delete = &plan.delete_requests[0];
        assert_eq!(delete.key.vid, 3);
        assert_eq!(delete.new_status, DocumentStatus::PendingDelete);
        assert!(matches!(
            delete.condition,
            Some(Condition::StatusTransition {
                expected: DocumentStatus::Locked,
                ..
            })
        ));
        assert!(plan.new_locks.is_empty());
        assert_eq!(plan.new_staging_responses[0].resource, json!({}));
        assert!(!plan.new_staging_responses[0].last_modified.is_empty());
    }

    #[test]
    fn test_delete_of_unknown_version_is_not_found() {
        let requests = vec![BatchRequest::delete("Patient", "ghost")];
        let result = generate_staging_requests(&builder(), &requests, &HashMap::new(), None);
        assert!(matches!(result, Err(VellumError::ResourceNotFound { .. })));
    }

    #[test]
    fn test_read_never_invents_a_version() {
        let requests = vec![BatchRequest::read("Patient", "unknown")];
        let plan =
            generate_staging_requests(&builder(), &requests, &HashMap::new(), None).unwrap();

        assert_eq!(plan.read_requests[0].vid, None);
        assert_eq!(plan.new_staging_responses[0].vid, None);
        assert_eq!(plan.new_staging_responses[0].last_modified, "");
    }

    #[test]
    fn test_unsupported_operations_are_ignored() {
        let request: BatchRequest = serde_json::from_value(
            json!({"operation": "patch", "id": "x", "resourceType": "Patient"}),
        )
        .unwrap();
        let plan =
            generate_staging_requests(&builder(), &[request], &HashMap::new(), None).unwrap();
        assert!(plan.new_staging_responses.is_empty());
        assert!(plan.write_requests().is_empty());
        assert!(plan.read_requests.is_empty());
    }

    #[test]
    fn test_create_type_mismatch_is_rejected() {
        let requests = vec![BatchRequest::create(
            "Observation",
            json!({"resourceType": "Patient"}),
        )];
        let result = generate_staging_requests(&builder(), &requests, &HashMap::new(), None);
        assert!(matches!(result, Err(VellumError::InvalidResource(_))));
    }

    #[test]
    fn test_write_requests_order() {
        let requests = vec![
            BatchRequest::update("Patient", "u1", patient(None)),
            BatchRequest::create("Patient", patient(None)),
            BatchRequest::delete("Patient", "d1"),
        ];
        let versions = HashMap::from([("u1".to_string(), 1), ("d1".to_string(), 1)]);
        let plan = generate_staging_requests(&builder(), &requests, &versions, None).unwrap();
        let writes = plan.write_requests();
        assert!(matches!(writes[0], WriteRequest::Update(_)));
        assert!(matches!(writes[1], WriteRequest::Put(ref p) if p.item.vid == 1));
        assert!(matches!(writes[2], WriteRequest::Put(ref p) if p.item.id == "u1"));
    }
}
