//! PostgreSQL client implementation
//!
//! Connection pooling and schema setup for the PostgreSQL document store.

use crate::config::schema::PostgreSQLConfig;
use crate::domain::{Result, StorageError, VellumError};
use deadpool_postgres::{Manager, ManagerConfig, Object, Pool, RecyclingMethod, Runtime};
use secrecy::ExposeSecret;
use std::time::Duration;
use tokio_postgres::NoTls;

/// PostgreSQL client for Vellum
///
/// Wraps a connection pool. Every checked-out connection gets the configured
/// statement timeout.
pub struct PostgreSQLClient {
    pool: Pool,
    config: PostgreSQLConfig,
}

impl PostgreSQLClient {
    /// Create a new PostgreSQL client
    ///
    /// # Errors
    ///
    /// Returns an error if the connection string is invalid or the pool cannot be built.
    pub async fn new(config: PostgreSQLConfig) -> Result<Self> {
        let pg_config: tokio_postgres::Config = config
            .connection_string
            .expose_secret()
            .as_ref()
            .parse()
            .map_err(|e| {
                VellumError::Configuration(format!("Invalid PostgreSQL connection string: {e}"))
            })?;

        let manager = Manager::from_config(
            pg_config,
            NoTls,
            ManagerConfig {
                recycling_method: RecyclingMethod::Fast,
            },
        );

        let timeout = Duration::from_secs(config.connection_timeout_seconds);
        let pool = Pool::builder(manager)
            .max_size(config.max_connections)
            .runtime(Runtime::Tokio1)
            .wait_timeout(Some(timeout))
            .create_timeout(Some(timeout))
            .recycle_timeout(Some(timeout))
            .build()
            .map_err(|e| {
                StorageError::ConnectionFailed(format!("Failed to create connection pool: {e}"))
            })?;

        Ok(Self { pool, config })
    }

    /// Test the connection to PostgreSQL
    pub async fn test_connection(&self) -> Result<()> {
        let client = self.get_connection().await?;
        client
            .query_one("SELECT 1", &[])
            .await
            .map_err(|e| StorageError::ConnectionFailed(format!("Connection test failed: {e}")))?;

        tracing::info!("PostgreSQL connection test successful");
        Ok(())
    }

    /// Create the `resource_items` table and its indexes if they don't exist
    pub async fn ensure_schema(&self) -> Result<()> {
        let client = self.get_connection().await?;
        let migration_sql = include_str!("../../../migrations/001_resource_items.sql");
        client
            .batch_execute(migration_sql)
            .await
            .map_err(|e| StorageError::QueryFailed(format!("Failed to execute migration: {e}")))?;

        tracing::info!("PostgreSQL schema initialized successfully");
        Ok(())
    }

    /// Get a connection from the pool with the statement timeout applied
    pub async fn get_connection(&self) -> Result<Object> {
        let client = self.pool.get().await.map_err(|e| {
            StorageError::ConnectionFailed(format!("Failed to get connection from pool: {e}"))
        })?;

        let timeout_query = format!(
            "SET statement_timeout = {}",
            self.config.statement_timeout_seconds * 1000
        );
        client.batch_execute(&timeout_query).await.map_err(|e| {
            StorageError::QueryFailed(format!("Failed to set statement timeout: {e}"))
        })?;

        Ok(client)
    }

    /// Connection string with credentials redacted
    pub fn connection_string_safe(&self) -> String {
        redact_connection_string(self.config.connection_string.expose_secret().as_ref())
    }
}

pub(crate) fn redact_connection_string(connection_string: &str) -> String {
    connection_string
        .rsplit_once('@')
        .map(|(_, host)| format!("postgresql://***@{host}"))
        .unwrap_or_else(|| "postgresql://***".to_string())
}
