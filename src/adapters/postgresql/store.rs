//! PostgreSQL document store
//!
//! Items live in `resource_items`, keyed by `(table_name, id, vid)`. Write sets run
//! in one SQL transaction: each member row is locked with `SELECT ... FOR UPDATE`,
//! checked with the shared condition predicate, then written. A key that was
//! empty when checked is written with a plain `INSERT`, so a concurrent insert
//! of the same key fails the write set instead of being overwritten.

use super::client::PostgreSQLClient;
use crate::adapters::storage::DocumentStore;
use crate::core::requests::{
    DeleteRequest, GetRequest, PutRequest, StatusUpdateRequest, VersionQuery, WriteRequest,
};
use crate::domain::{ItemKey, Result, StorageError, StoredItem, VellumError};
use async_trait::async_trait;
use deadpool_postgres::Transaction;
use serde_json::Value;
use tokio_postgres::error::SqlState;
use tokio_postgres::Row;

const SELECT_FOR_UPDATE: &str =
    "SELECT item FROM resource_items WHERE table_name = $1 AND id = $2 AND vid = $3 FOR UPDATE";

const INSERT_ITEM: &str = r#"
    INSERT INTO resource_items
        (table_name, id, vid, resource_type, document_status, lock_end_ts, item, updated_at)
    VALUES ($1, $2, $3, $4, $5, $6, $7, NOW())
"#;

const UPDATE_ITEM: &str = r#"
    UPDATE resource_items SET
        resource_type = $4,
        document_status = $5,
        lock_end_ts = $6,
        item = $7,
        updated_at = NOW()
    WHERE table_name = $1 AND id = $2 AND vid = $3
"#;

const DELETE_ITEM: &str =
    "DELETE FROM resource_items WHERE table_name = $1 AND id = $2 AND vid = $3";

/// Statement that stores an item, given whether its row existed when locked
fn store_statement(row_exists: bool) -> &'static str {
    if row_exists {
        UPDATE_ITEM
    } else {
        INSERT_ITEM
    }
}

/// [`DocumentStore`] over PostgreSQL
pub struct PostgresDocumentStore {
    client: PostgreSQLClient,
}

impl PostgresDocumentStore {
    pub fn new(client: PostgreSQLClient) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &PostgreSQLClient {
        &self.client
    }

    async fn apply_write(tx: &Transaction<'_>, request: &WriteRequest) -> Result<()> {
        let key = request.key();
        let vid = to_db_vid(&key)?;
        let row = tx
            .query_opt(SELECT_FOR_UPDATE, &[&request.table(), &key.id, &vid])
            .await
            .map_err(|e| StorageError::QueryFailed(e.to_string()))?;
        let existing = row.as_ref().map(row_to_item).transpose()?;

        request.check(existing.as_ref())?;

        match request.resulting_item(existing.as_ref()) {
            Some(item) => {
                let document = item.to_json()?;
                let status = item.document_status.as_str();
                tx.execute(
                    store_statement(existing.is_some()),
                    &[
                        &request.table(),
                        &item.id,
                        &vid,
                        &item.resource_type,
                        &status,
                        &item.lock_end_ts,
                        &document,
                    ],
                )
                .await
                .map_err(|e| map_write_error(e, &key))?;
            }
            None => {
                tx.execute(DELETE_ITEM, &[&request.table(), &key.id, &vid])
                    .await
                    .map_err(|e| map_write_error(e, &key))?;
            }
        }
        Ok(())
    }
}

fn to_db_vid(key: &ItemKey) -> Result<i64> {
    i64::try_from(key.vid)
        .map_err(|_| VellumError::Validation(format!("Version {} is out of range", key.vid)))
}

fn row_to_item(row: &Row) -> Result<StoredItem> {
    let document: Value = row
        .try_get("item")
        .map_err(|e| StorageError::DeserializationFailed(e.to_string()))?;
    StoredItem::from_json(document)
}

fn map_write_error(err: tokio_postgres::Error, key: &ItemKey) -> VellumError {
    // An insert racing another insert of the same key surfaces as a unique violation
    if err.code() == Some(&SqlState::UNIQUE_VIOLATION) {
        StorageError::PreconditionFailed(format!("{key} was written concurrently")).into()
    } else {
        StorageError::WriteFailed(format!("{key}: {err}")).into()
    }
}

#[async_trait]
impl DocumentStore for PostgresDocumentStore {
    fn backend_name(&self) -> &'static str {
        "postgresql"
    }

    async fn test_connection(&self) -> Result<()> {
        self.client.test_connection().await
    }

    async fn get_item(&self, request: &GetRequest) -> Result<Option<StoredItem>> {
        let Some(vid) = request.vid else {
            return Ok(None);
        };
        let vid = to_db_vid(&ItemKey::new(request.id.clone(), vid))?;
        let conn = self.client.get_connection().await?;
        let row = conn
            .query_opt(
                "SELECT item FROM resource_items WHERE table_name = $1 AND id = $2 AND vid = $3",
                &[&request.table, &request.id, &vid],
            )
            .await
            .map_err(|e| StorageError::QueryFailed(e.to_string()))?;
        row.as_ref().map(row_to_item).transpose()
    }

    async fn put_item(&self, request: &PutRequest) -> Result<()> {
        self.transact_write(&[request.clone().into()]).await
    }

    async fn update_item(&self, request: &StatusUpdateRequest) -> Result<()> {
        self.transact_write(&[request.clone().into()]).await
    }

    async fn delete_item(&self, request: &DeleteRequest) -> Result<()> {
        self.transact_write(&[request.clone().into()]).await
    }

    async fn query_versions(&self, query: &VersionQuery) -> Result<Vec<StoredItem>> {
        let limit = i64::try_from(query.limit).unwrap_or(i64::MAX);
        let conn = self.client.get_connection().await?;
        let rows = conn
            .query(
                "SELECT item FROM resource_items \
                 WHERE table_name = $1 AND id = $2 \
                   AND ($3::TEXT IS NULL OR resource_type = $3) \
                 ORDER BY vid DESC LIMIT $4",
                &[&query.table, &query.id, &query.resource_type, &limit],
            )
            .await
            .map_err(|e| StorageError::QueryFailed(e.to_string()))?;

        rows.iter()
            .map(|row| row_to_item(row).map(|item| query.project(item)))
            .collect()
    }

    async fn transact_write(&self, requests: &[WriteRequest]) -> Result<()> {
        let mut conn = self.client.get_connection().await?;
        let tx = conn
            .transaction()
            .await
            .map_err(|e| StorageError::TransactionFailed(e.to_string()))?;

        for request in requests {
            // Dropping the transaction on error rolls it back
            Self::apply_write(&tx, request).await?;
        }

        tx.commit()
            .await
            .map_err(|e| StorageError::TransactionFailed(e.to_string()))?;
        tracing::trace!(writes = requests.len(), "Committed write set");
        Ok(())
    }

    async fn batch_get(&self, requests: &[GetRequest]) -> Result<Vec<Option<StoredItem>>> {
        let conn = self.client.get_connection().await?;
        let mut results = Vec::with_capacity(requests.len());
        for request in requests {
            let Some(vid) = request.vid else {
                results.push(None);
                continue;
            };
            let vid = to_db_vid(&ItemKey::new(request.id.clone(), vid))?;
            let row = conn
                .query_opt(
                    "SELECT item FROM resource_items WHERE table_name = $1 AND id = $2 AND vid = $3",
                    &[&request.table, &request.id, &vid],
                )
                .await
                .map_err(|e| StorageError::QueryFailed(e.to_string()))?;
            results.push(row.as_ref().map(row_to_item).transpose()?);
        }
        Ok(results)
    }
}
