//! In-memory document store
//!
//! Tables of `(id, vid) -> StoredItem` behind one async lock. Every write,
//! including a whole write set, runs under the write lock, which makes
//! `transact_write` atomic.

use crate::adapters::storage::DocumentStore;
use crate::core::requests::{
    DeleteRequest, GetRequest, PutRequest, StatusUpdateRequest, VersionQuery, WriteRequest,
};
use crate::domain::{ItemKey, Result, StorageError, StoredItem};
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap, HashSet};
use tokio::sync::RwLock;

type Table = BTreeMap<(String, u64), StoredItem>;

/// Process-local [`DocumentStore`]
#[derive(Debug, Default)]
pub struct MemoryDocumentStore {
    tables: RwLock<HashMap<String, Table>>,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts an item as-is, bypassing conditions
    pub async fn seed(&self, table: &str, item: StoredItem) {
        let mut tables = self.tables.write().await;
        tables
            .entry(table.to_string())
            .or_default()
            .insert((item.id.clone(), item.vid), item);
    }

    /// All items of a table ordered by `(id, vid)`
    pub async fn snapshot(&self, table: &str) -> Vec<StoredItem> {
        let tables = self.tables.read().await;
        tables
            .get(table)
            .map(|t| t.values().cloned().collect())
            .unwrap_or_default()
    }

    /// Item under one key, if any
    pub async fn item(&self, table: &str, key: &ItemKey) -> Option<StoredItem> {
        let tables = self.tables.read().await;
        tables
            .get(table)
            .and_then(|t| t.get(&(key.id.clone(), key.vid)))
            .cloned()
    }

    fn apply(tables: &mut HashMap<String, Table>, request: &WriteRequest) {
        let key = request.key();
        let table = tables.entry(request.table().to_string()).or_default();
        let map_key = (key.id, key.vid);
        match request.resulting_item(table.get(&map_key)) {
            Some(item) => {
                table.insert(map_key, item);
            }
            None => {
                table.remove(&map_key);
            }
        }
    }

    fn lookup<'a>(
        tables: &'a HashMap<String, Table>,
        table: &str,
        key: &ItemKey,
    ) -> Option<&'a StoredItem> {
        tables
            .get(table)
            .and_then(|t| t.get(&(key.id.clone(), key.vid)))
    }

    async fn write_one(&self, request: WriteRequest) -> Result<()> {
        let mut tables = self.tables.write().await;
        request.check(Self::lookup(&tables, request.table(), &request.key()))?;
        Self::apply(&mut tables, &request);
        Ok(())
    }
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    fn backend_name(&self) -> &'static str {
        "memory"
    }

    async fn get_item(&self, request: &GetRequest) -> Result<Option<StoredItem>> {
        let Some(vid) = request.vid else {
            return Ok(None);
        };
        let tables = self.tables.read().await;
        Ok(Self::lookup(&tables, &request.table, &ItemKey::new(request.id.clone(), vid)).cloned())
    }

    async fn put_item(&self, request: &PutRequest) -> Result<()> {
        self.write_one(request.clone().into()).await
    }

    async fn update_item(&self, request: &StatusUpdateRequest) -> Result<()> {
        self.write_one(request.clone().into()).await
    }

    async fn delete_item(&self, request: &DeleteRequest) -> Result<()> {
        self.write_one(request.clone().into()).await
    }

    async fn query_versions(&self, query: &VersionQuery) -> Result<Vec<StoredItem>> {
        let tables = self.tables.read().await;
        let Some(table) = tables.get(&query.table) else {
            return Ok(Vec::new());
        };

        let items = table
            .range((query.id.clone(), 0)..=(query.id.clone(), u64::MAX))
            .rev()
            .map(|(_, item)| item)
            .filter(|item| query.matches(item))
            .take(query.limit)
            .map(|item| query.project(item.clone()))
            .collect();
        Ok(items)
    }

    async fn transact_write(&self, requests: &[WriteRequest]) -> Result<()> {
        let mut seen = HashSet::new();
        for request in requests {
            if !seen.insert((request.table().to_string(), request.key())) {
                return Err(StorageError::TransactionFailed(format!(
                    "Write set touches {} in {} more than once",
                    request.key(),
                    request.table()
                ))
                .into());
            }
        }

        let mut tables = self.tables.write().await;
        for request in requests {
            request.check(Self::lookup(&tables, request.table(), &request.key()))?;
        }
        for request in requests {
            Self::apply(&mut tables, request);
        }

        tracing::trace!(writes = requests.len(), "Applied write set");
        Ok(())
    }
}
