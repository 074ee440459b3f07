//! In-memory search index

use crate::adapters::search::SearchIndex;
use crate::domain::{Result, SearchIndexError};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use tokio::sync::{Mutex, RwLock};

/// Operation recorded by [`MemorySearchIndex`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IndexOperation {
    CreateIndex(String),
    Upsert { index: String, id: String },
    Delete { index: String, id: String },
}

/// Process-local [`SearchIndex`] with an operation log
#[derive(Debug, Default)]
pub struct MemorySearchIndex {
    indexes: RwLock<HashMap<String, HashMap<String, Value>>>,
    operations: Mutex<Vec<IndexOperation>>,
    failing_ids: HashSet<String>,
}

impl MemorySearchIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every upsert or delete of `id` fail
    pub fn with_failing_document(mut self, id: impl Into<String>) -> Self {
        self.failing_ids.insert(id.into());
        self
    }

    pub async fn document(&self, index: &str, id: &str) -> Option<Value> {
        let indexes = self.indexes.read().await;
        indexes.get(index).and_then(|docs| docs.get(id)).cloned()
    }

    pub async fn index_names(&self) -> Vec<String> {
        let indexes = self.indexes.read().await;
        let mut names: Vec<String> = indexes.keys().cloned().collect();
        names.sort();
        names
    }

    /// Successful operations in the order they were applied
    pub async fn operations(&self) -> Vec<IndexOperation> {
        self.operations.lock().await.clone()
    }

    async fn record(&self, operation: IndexOperation) {
        self.operations.lock().await.push(operation);
    }
}

#[async_trait]
impl SearchIndex for MemorySearchIndex {
    async fn index_exists(&self, index: &str) -> Result<bool> {
        Ok(self.indexes.read().await.contains_key(index))
    }

    async fn create_index(&self, index: &str) -> Result<()> {
        self.indexes
            .write()
            .await
            .entry(index.to_string())
            .or_default();
        self.record(IndexOperation::CreateIndex(index.to_string()))
            .await;
        Ok(())
    }

    async fn upsert_document(&self, index: &str, id: &str, document: &Value) -> Result<()> {
        if self.failing_ids.contains(id) {
            return Err(SearchIndexError::UpsertFailed(format!("{index}/{id}")).into());
        }
        {
            let mut indexes = self.indexes.write().await;
            let docs = indexes.entry(index.to_string()).or_default();
            match docs.get_mut(id) {
                Some(existing) => merge(existing, document),
                None => {
                    docs.insert(id.to_string(), document.clone());
                }
            }
        }
        self.record(IndexOperation::Upsert {
            index: index.to_string(),
            id: id.to_string(),
        })
        .await;
        Ok(())
    }

    async fn delete_document(&self, index: &str, id: &str) -> Result<()> {
        if self.failing_ids.contains(id) {
            return Err(SearchIndexError::DeleteFailed(format!("{index}/{id}")).into());
        }
        if let Some(docs) = self.indexes.write().await.get_mut(index) {
            docs.remove(id);
        }
        self.record(IndexOperation::Delete {
            index: index.to_string(),
            id: id.to_string(),
        })
        .await;
        Ok(())
    }
}

/// Partial-document merge: objects merge recursively, everything else is replaced
fn merge(target: &mut Value, patch: &Value) {
    match (target, patch) {
        (Value::Object(target), Value::Object(patch)) => {
            for (key, value) in patch {
                match target.get_mut(key) {
                    Some(existing) => merge(existing, value),
                    None => {
                        target.insert(key.clone(), value.clone());
                    }
                }
            }
        }
        (target, patch) => *target = patch.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_upsert_inserts_then_merges() {
        let index = MemorySearchIndex::new();
        index
            .upsert_document("patient", "p1_1", &json!({"a": 1, "nested": {"x": 1}}))
            .await
            .unwrap();
        index
            .upsert_document("patient", "p1_1", &json!({"b": 2, "nested": {"y": 2}}))
            .await
            .unwrap();

        let doc = index.document("patient", "p1_1").await.unwrap();
        assert_eq!(doc, json!({"a": 1, "b": 2, "nested": {"x": 1, "y": 2}}));
    }

    #[tokio::test]
    async fn test_ensure_index_creates_once() {
        let index = MemorySearchIndex::new();
        index.ensure_index("patient").await.unwrap();
        index.ensure_index("patient").await.unwrap();
        assert_eq!(
            index.operations().await,
            vec![IndexOperation::CreateIndex("patient".to_string())]
        );
    }

    #[tokio::test]
    async fn test_failing_document() {
        let index = MemorySearchIndex::new().with_failing_document("bad_1");
        assert!(index
            .upsert_document("patient", "bad_1", &json!({}))
            .await
            .is_err());
        assert!(index.delete_document("patient", "bad_1").await.is_err());
        assert!(index.operations().await.is_empty());
    }

    #[tokio::test]
    async fn test_delete_missing_document_succeeds() {
        let index = MemorySearchIndex::new();
        index.delete_document("patient", "nothing_1").await.unwrap();
        assert!(index.document("patient", "nothing_1").await.is_none());
    }
}
