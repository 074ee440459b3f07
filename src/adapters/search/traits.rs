//! Search index trait

use crate::domain::Result;
use async_trait::async_trait;
use serde_json::{json, Value};

/// Secondary index the projector mirrors committed versions into
#[async_trait]
pub trait SearchIndex: Send + Sync {
    async fn index_exists(&self, index: &str) -> Result<bool>;

    /// Creates the index with [`index_mappings`]
    async fn create_index(&self, index: &str) -> Result<()>;

    /// Merges `document` into the stored one, inserting it when absent
    async fn upsert_document(&self, index: &str, id: &str, document: &Value) -> Result<()>;

    /// Removes a document; removing a missing document succeeds
    async fn delete_document(&self, index: &str, id: &str) -> Result<()>;

    async fn ensure_index(&self, index: &str) -> Result<()> {
        if !self.index_exists(index).await? {
            self.create_index(index).await?;
            tracing::info!(index = %index, "Created search index");
        }
        Ok(())
    }
}

/// Index body: keyword mappings for the fields used in exact-match filters
pub fn index_mappings() -> Value {
    let keyword = json!({"type": "keyword", "index": true});
    json!({
        "mappings": {
            "properties": {
                "id": keyword,
                "resourceType": keyword,
                "_references": keyword,
                "documentStatus": keyword,
            }
        }
    })
}
