//! REST search adapter against a mock cluster

use mockito::{Matcher, Server};
use serde_json::json;
use std::sync::Arc;
use vellum::adapters::search::{HttpSearchIndex, SearchIndex};
use vellum::config::{secret_string, SearchConfig};
use vellum::core::projector::Projector;
use vellum::domain::{ChangeEventType, ChangeRecord, SearchIndexError, VellumError};

fn config(endpoint: String) -> SearchConfig {
    SearchConfig {
        endpoint,
        username: None,
        password: None,
        timeout_seconds: 5,
        tls_verify: true,
    }
}

fn index_for(server: &Server) -> HttpSearchIndex {
    HttpSearchIndex::new(&config(server.url())).unwrap()
}

#[tokio::test]
async fn test_index_exists_maps_status() {
    let mut server = Server::new_async().await;
    let present = server
        .mock("HEAD", "/patient")
        .with_status(200)
        .create_async()
        .await;
    let missing = server
        .mock("HEAD", "/observation")
        .with_status(404)
        .create_async()
        .await;

    let index = index_for(&server);
    assert!(index.index_exists("patient").await.unwrap());
    assert!(!index.index_exists("observation").await.unwrap());

    present.assert_async().await;
    missing.assert_async().await;
}

#[tokio::test]
async fn test_ensure_index_creates_with_mappings() {
    let mut server = Server::new_async().await;
    server
        .mock("HEAD", "/patient")
        .with_status(404)
        .create_async()
        .await;
    let create = server
        .mock("PUT", "/patient")
        .match_body(Matcher::PartialJson(json!({
            "mappings": {"properties": {"documentStatus": {"type": "keyword"}}}
        })))
        .with_status(200)
        .with_body(r#"{"acknowledged":true}"#)
        .create_async()
        .await;

    index_for(&server).ensure_index("patient").await.unwrap();
    create.assert_async().await;
}

#[tokio::test]
async fn test_concurrent_index_creation_is_tolerated() {
    let mut server = Server::new_async().await;
    server
        .mock("PUT", "/patient")
        .with_status(400)
        .with_body(r#"{"error":{"type":"resource_already_exists_exception"}}"#)
        .create_async()
        .await;
    server
        .mock("PUT", "/observation")
        .with_status(400)
        .with_body(r#"{"error":{"type":"mapper_parsing_exception"}}"#)
        .create_async()
        .await;

    let index = index_for(&server);
    index.create_index("patient").await.unwrap();
    let err = index.create_index("observation").await.unwrap_err();
    assert!(matches!(
        err,
        VellumError::SearchIndex(SearchIndexError::IndexCreationFailed(_))
    ));
}

#[tokio::test]
async fn test_upsert_sends_partial_document() {
    let mut server = Server::new_async().await;
    let upsert = server
        .mock("POST", "/patient/_update/p1_2")
        .match_body(Matcher::Json(json!({
            "doc": {"id": "p1", "vid": 2, "resourceType": "Patient"},
            "doc_as_upsert": true
        })))
        .with_status(200)
        .create_async()
        .await;

    index_for(&server)
        .upsert_document(
            "patient",
            "p1_2",
            &json!({"id": "p1", "vid": 2, "resourceType": "Patient"}),
        )
        .await
        .unwrap();
    upsert.assert_async().await;
}

#[tokio::test]
async fn test_upsert_error_status_is_reported() {
    let mut server = Server::new_async().await;
    server
        .mock("POST", "/patient/_update/p1_1")
        .with_status(500)
        .with_body("shard failure")
        .create_async()
        .await;

    let err = index_for(&server)
        .upsert_document("patient", "p1_1", &json!({"id": "p1"}))
        .await
        .unwrap_err();
    match err {
        VellumError::SearchIndex(SearchIndexError::UpsertFailed(message)) => {
            assert!(message.contains("500"));
            assert!(message.contains("shard failure"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_delete_of_missing_document_succeeds() {
    let mut server = Server::new_async().await;
    let delete = server
        .mock("DELETE", "/patient/_doc/p1_1")
        .with_status(404)
        .create_async()
        .await;

    index_for(&server)
        .delete_document("patient", "p1_1")
        .await
        .unwrap();
    delete.assert_async().await;
}

#[tokio::test]
async fn test_basic_auth_header() {
    let mut server = Server::new_async().await;
    let head = server
        .mock("HEAD", "/patient")
        .match_header("authorization", "Basic dXNlcjpwYXNz")
        .with_status(200)
        .create_async()
        .await;

    let mut config = config(server.url());
    config.username = Some("user".to_string());
    config.password = Some(secret_string("pass".to_string()));

    let index = HttpSearchIndex::new(&config).unwrap();
    assert!(index.index_exists("patient").await.unwrap());
    head.assert_async().await;
}

#[test]
fn test_invalid_endpoint_is_configuration_error() {
    let err = HttpSearchIndex::new(&config("not a url".to_string()))
        .err()
        .unwrap();
    assert!(matches!(err, VellumError::Configuration(_)));
}

#[tokio::test]
async fn test_projector_over_rest_index() {
    let mut server = Server::new_async().await;
    let head = server
        .mock("HEAD", "/patient")
        .with_status(404)
        .expect(1)
        .create_async()
        .await;
    let create = server
        .mock("PUT", "/patient")
        .with_status(200)
        .expect(1)
        .create_async()
        .await;
    let upsert = server
        .mock("POST", "/patient/_update/p1_1")
        .match_body(Matcher::PartialJson(json!({
            "doc": {"documentStatus": "AVAILABLE"},
            "doc_as_upsert": true
        })))
        .with_status(201)
        .create_async()
        .await;
    let delete = server
        .mock("DELETE", "/patient/_doc/p2_4")
        .with_status(200)
        .create_async()
        .await;

    let source = "arn:aws:dynamodb:us-east-1:123456789012:table/resource-db/stream/1";
    let records = vec![
        ChangeRecord {
            event_type: ChangeEventType::Insert,
            old_image: None,
            new_image: Some(json!({
                "id": "p1", "vid": 1, "resourceType": "Patient", "documentStatus": "AVAILABLE"
            })),
            source_identifier: source.to_string(),
        },
        ChangeRecord {
            event_type: ChangeEventType::Remove,
            old_image: Some(json!({"id": "p2", "vid": 4, "resourceType": "Patient"})),
            new_image: None,
            source_identifier: source.to_string(),
        },
    ];

    let projector = Projector::new(Arc::new(index_for(&server)), "resource-db");
    let report = projector.project_batch(&records).await;

    assert_eq!(report.upserted_available, 1);
    assert_eq!(report.deleted, 1);
    assert_eq!(report.failed, 0);

    head.assert_async().await;
    create.assert_async().await;
    upsert.assert_async().await;
    delete.assert_async().await;
}
