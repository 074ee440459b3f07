//! Rollback planning
//!
//! Only creates and updates write a new physical version, so undoing a bundle is a
//! targeted delete of exactly those versions. Reads and deletes need nothing.
//! Each delete only applies while the version is still `PENDING`, which leaves
//! committed versions alone when the staging write never landed.

use crate::core::requests::{DeleteRequest, RequestBuilder};
use crate::domain::{BundleEntryResponse, LockRemoval, TenantId};

/// Compensating deletes and the lock entries they release
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RollbackPlan {
    pub transaction_requests: Vec<DeleteRequest>,
    pub items_to_remove_from_lock: Vec<LockRemoval>,
}

pub fn generate_rollback_requests(
    builder: &RequestBuilder,
    staging_responses: &[BundleEntryResponse],
    tenant: Option<&TenantId>,
) -> RollbackPlan {
    let mut plan = RollbackPlan::default();

    for response in staging_responses {
        if !response.operation.writes_new_version() {
            continue;
        }
        let Some(vid) = response.vid else {
            continue;
        };

        plan.transaction_requests.push(builder.build_staged_delete(
            &response.id,
            vid,
            &response.resource_type,
            tenant,
        ));
        plan.items_to_remove_from_lock.push(LockRemoval {
            id: response.id.clone(),
            vid,
            resource_type: response.resource_type.clone(),
        });
    }

    plan
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ItemKey, Operation};
    use serde_json::json;

    fn response(id: &str, vid: u64, operation: Operation) -> BundleEntryResponse {
        BundleEntryResponse {
            id: id.to_string(),
            vid: Some(vid),
            resource_type: "Patient".to_string(),
            operation,
            last_modified: String::new(),
            resource: json!({}),
        }
    }

    #[test]
    fn test_only_creates_and_updates_are_compensated_in_order() {
        let responses = vec![
            response("r1", 1, Operation::Read),
            response("u1", 3, Operation::Update),
            response("d1", 2, Operation::Delete),
            response("c1", 1, Operation::Create),
        ];
        let tenant = TenantId::new("acme").unwrap();
        let plan = generate_rollback_requests(
            &RequestBuilder::new("resource-db"),
            &responses,
            Some(&tenant),
        );

        let keys: Vec<ItemKey> = plan
            .transaction_requests
            .iter()
            .map(|r| r.key.clone())
            .collect();
        assert_eq!(keys, vec![ItemKey::new("u1", 3), ItemKey::new("c1", 1)]);
        assert!(plan
            .transaction_requests
            .iter()
            .all(|r| r.table == "resource-db-acme"));
        assert!(plan
            .transaction_requests
            .iter()
            .all(|r| r.condition.is_some()));
        assert_eq!(plan.items_to_remove_from_lock.len(), 2);
        assert_eq!(plan.items_to_remove_from_lock[0].id, "u1");
        assert_eq!(plan.items_to_remove_from_lock[1].id, "c1");
    }

    #[test]
    fn test_reads_and_deletes_only_yield_empty_plan() {
        let responses = vec![
            response("r1", 1, Operation::Read),
            response("d1", 2, Operation::Delete),
        ];
        let plan =
            generate_rollback_requests(&RequestBuilder::new("resource-db"), &responses, None);
        assert_eq!(plan, RollbackPlan::default());
    }
}
