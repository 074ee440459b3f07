//! Change projection into the in-memory search index

use serde_json::{json, Value};
use std::sync::Arc;
use vellum::adapters::memory::{IndexOperation, MemorySearchIndex};
use vellum::core::projector::{ProjectionReport, Projector};
use vellum::domain::{ChangeEventType, ChangeRecord};

const BASE_TABLE: &str = "resource-db";
const SOURCE: &str = "arn:aws:dynamodb:us-east-1:123456789012:table/resource-db/stream/2024-01-01";

fn image(id: &str, vid: u64, status: &str) -> Value {
    json!({
        "id": id,
        "vid": vid,
        "resourceType": "Patient",
        "documentStatus": status,
        "name": [{"family": id}]
    })
}

fn record(event_type: ChangeEventType, old_image: Option<Value>, new_image: Option<Value>) -> ChangeRecord {
    ChangeRecord {
        event_type,
        old_image,
        new_image,
        source_identifier: SOURCE.to_string(),
    }
}

fn document_ops(operations: &[IndexOperation]) -> Vec<IndexOperation> {
    operations
        .iter()
        .filter(|op| !matches!(op, IndexOperation::CreateIndex(_)))
        .cloned()
        .collect()
}

fn upsert(id: &str) -> IndexOperation {
    IndexOperation::Upsert {
        index: "patient".to_string(),
        id: id.to_string(),
    }
}

fn delete(id: &str) -> IndexOperation {
    IndexOperation::Delete {
        index: "patient".to_string(),
        id: id.to_string(),
    }
}

#[tokio::test]
async fn test_remove_issues_single_delete() {
    let index = Arc::new(MemorySearchIndex::new());
    let projector = Projector::new(index.clone(), BASE_TABLE);

    let removed = record(
        ChangeEventType::Remove,
        Some(json!({"id": "p1", "vid": 3, "resourceType": "Patient"})),
        None,
    );
    let report = projector.project_batch(&[removed]).await;

    assert_eq!(document_ops(&index.operations().await), vec![delete("p1_3")]);
    assert_eq!(
        report,
        ProjectionReport {
            deleted: 1,
            ..ProjectionReport::default()
        }
    );
}

#[tokio::test]
async fn test_locked_version_emits_nothing() {
    let index = Arc::new(MemorySearchIndex::new());
    let projector = Projector::new(index.clone(), BASE_TABLE);

    let locked = record(
        ChangeEventType::Modify,
        Some(image("p1", 1, "AVAILABLE")),
        Some(image("p1", 1, "LOCKED")),
    );
    let report = projector.project_batch(&[locked]).await;

    assert!(index.operations().await.is_empty());
    assert_eq!(report.skipped, 1);
    assert_eq!(report.applied(), 0);
}

#[tokio::test]
async fn test_phases_run_available_then_deleted_then_removes() {
    let index = Arc::new(MemorySearchIndex::new());
    let projector = Projector::new(index.clone(), BASE_TABLE);

    let records = vec![
        record(ChangeEventType::Remove, Some(image("r1", 1, "PENDING")), None),
        record(ChangeEventType::Modify, None, Some(image("d1", 2, "DELETED"))),
        record(ChangeEventType::Insert, None, Some(image("a1", 1, "AVAILABLE"))),
        record(ChangeEventType::Remove, Some(image("r2", 4, "AVAILABLE")), None),
        record(ChangeEventType::Insert, None, Some(image("a2", 1, "AVAILABLE"))),
    ];
    let report = projector.project_batch(&records).await;

    let ops = document_ops(&index.operations().await);
    assert_eq!(ops.len(), 5);

    let phase_of = |op: &IndexOperation| match op {
        IndexOperation::Upsert { id, .. } if id.starts_with('a') => 0,
        IndexOperation::Upsert { .. } => 1,
        _ => 2,
    };
    let phases: Vec<u8> = ops.iter().map(phase_of).collect();
    let mut sorted = phases.clone();
    sorted.sort_unstable();
    assert_eq!(phases, sorted, "phases interleaved: {ops:?}");

    assert_eq!(report.upserted_available, 2);
    assert_eq!(report.upserted_deleted, 1);
    assert_eq!(report.deleted, 2);
}

#[tokio::test]
async fn test_create_then_delete_in_one_batch_ends_deleted() {
    let index = Arc::new(MemorySearchIndex::new());
    let projector = Projector::new(index.clone(), BASE_TABLE);

    // The deleted image arrives first, the available one second
    let records = vec![
        record(ChangeEventType::Modify, None, Some(image("p1", 1, "DELETED"))),
        record(ChangeEventType::Insert, None, Some(image("p1", 1, "AVAILABLE"))),
    ];
    projector.project_batch(&records).await;

    let doc = index.document("patient", "p1_1").await.unwrap();
    assert_eq!(doc["documentStatus"], "DELETED");
    assert_eq!(
        document_ops(&index.operations().await),
        vec![upsert("p1_1"), upsert("p1_1")]
    );
}

#[tokio::test]
async fn test_failures_are_isolated() {
    let index = Arc::new(MemorySearchIndex::new().with_failing_document("p2_1"));
    let projector = Projector::new(index.clone(), BASE_TABLE);

    let records = vec![
        record(ChangeEventType::Insert, None, Some(image("p1", 1, "AVAILABLE"))),
        record(ChangeEventType::Insert, None, Some(image("p2", 1, "AVAILABLE"))),
        record(ChangeEventType::Remove, Some(image("p3", 1, "AVAILABLE")), None),
    ];
    let report = projector.project_batch(&records).await;

    assert_eq!(report.failed, 1);
    assert_eq!(report.upserted_available, 1);
    assert_eq!(report.deleted, 1);
    assert!(index.document("patient", "p1_1").await.is_some());
    assert!(index.document("patient", "p2_1").await.is_none());
}

#[tokio::test]
async fn test_malformed_and_binary_records_are_skipped() {
    let index = Arc::new(MemorySearchIndex::new());
    let projector = Projector::new(index.clone(), BASE_TABLE);

    let binary = json!({"id": "b1", "vid": 1, "resourceType": "Binary", "documentStatus": "AVAILABLE"});
    let records = vec![
        record(ChangeEventType::Insert, None, Some(binary)),
        record(ChangeEventType::Insert, None, Some(json!({"resourceType": "Patient"}))),
        record(ChangeEventType::Modify, None, None),
        record(ChangeEventType::Insert, None, Some(image("p1", 1, "AVAILABLE"))),
    ];
    let report = projector.project_batch(&records).await;

    assert_eq!(report.skipped, 3);
    assert_eq!(report.upserted_available, 1);
    assert_eq!(index.index_names().await, vec!["patient".to_string()]);
}

#[tokio::test]
async fn test_multi_tenant_documents() {
    let index = Arc::new(MemorySearchIndex::new());
    let projector = Projector::new(index.clone(), BASE_TABLE).with_multi_tenancy(true);

    let mut tenant_record = record(ChangeEventType::Insert, None, Some(image("p1", 1, "AVAILABLE")));
    tenant_record.source_identifier =
        "arn:aws:dynamodb:us-east-1:123456789012:table/resource-db-acme/stream/2024".to_string();
    let default_record = record(ChangeEventType::Insert, None, Some(image("p2", 1, "AVAILABLE")));

    projector.project_batch(&[tenant_record, default_record]).await;

    assert_eq!(
        index.index_names().await,
        vec!["patient".to_string(), "patient-acme".to_string()]
    );
    let tenant_doc = index.document("patient-acme", "p1_1").await.unwrap();
    assert_eq!(tenant_doc["tenantId"], "acme");
    let default_doc = index.document("patient", "p2_1").await.unwrap();
    assert!(default_doc.get("tenantId").is_none());
}

#[tokio::test]
async fn test_index_created_once_per_batch() {
    let index = Arc::new(MemorySearchIndex::new());
    let projector = Projector::new(index.clone(), BASE_TABLE);

    let records = vec![
        record(ChangeEventType::Insert, None, Some(image("p1", 1, "AVAILABLE"))),
        record(ChangeEventType::Insert, None, Some(image("p2", 1, "AVAILABLE"))),
    ];
    projector.project_batch(&records).await;
    projector.project_batch(&records).await;

    let creations = index
        .operations()
        .await
        .into_iter()
        .filter(|op| matches!(op, IndexOperation::CreateIndex(_)))
        .count();
    assert_eq!(creations, 1);
}
