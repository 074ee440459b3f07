//! Document store factory
//!
//! Creates the configured [`DocumentStore`] backend.

use crate::adapters::memory::MemoryDocumentStore;
use crate::adapters::postgresql::{PostgreSQLClient, PostgresDocumentStore};
use crate::adapters::storage::traits::DocumentStore;
use crate::config::schema::{StorageBackend, StorageConfig};
use crate::domain::{Result, VellumError};
use std::sync::Arc;

/// Create a document store based on the configuration
///
/// The PostgreSQL backend applies its schema before it is returned.
///
/// # Errors
///
/// Returns an error if the backend's configuration is missing or the backend
/// cannot be reached.
pub async fn create_document_store(config: &StorageConfig) -> Result<Arc<dyn DocumentStore>> {
    match config.backend {
        StorageBackend::Memory => {
            tracing::info!("Creating in-memory document store");
            Ok(Arc::new(MemoryDocumentStore::new()) as Arc<dyn DocumentStore>)
        }
        StorageBackend::PostgreSQL => {
            let pg_config = config.postgresql.as_ref().ok_or_else(|| {
                VellumError::Configuration(
                    "storage.postgresql configuration is required when storage.backend = 'postgresql'"
                        .to_string(),
                )
            })?;

            tracing::info!("Creating PostgreSQL document store");
            let client = PostgreSQLClient::new(pg_config.clone()).await?;
            tracing::debug!(
                connection = %client.connection_string_safe(),
                "PostgreSQL pool created"
            );
            client.ensure_schema().await?;

            Ok(Arc::new(PostgresDocumentStore::new(client)) as Arc<dyn DocumentStore>)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_create_memory_store() {
        let config = StorageConfig::default();
        let store = create_document_store(&config).await.unwrap();
        assert_eq!(store.backend_name(), "memory");
    }

    #[tokio::test]
    async fn test_postgresql_without_section_is_configuration_error() {
        let config = StorageConfig {
            backend: StorageBackend::PostgreSQL,
            ..StorageConfig::default()
        };
        let result = create_document_store(&config).await;
        assert!(matches!(result, Err(VellumError::Configuration(_))));
    }
}
