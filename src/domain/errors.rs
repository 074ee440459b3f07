//! Domain error types
//!
//! This module defines the error hierarchy for Vellum.
//! Backend-specific failures are mapped into [`StorageError`] and [`SearchIndexError`]
//! so that no third-party error type leaks through the public API.

use thiserror::Error;

/// Main Vellum error type
///
/// This is the primary error type used throughout the library.
#[derive(Debug, Error)]
pub enum VellumError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Document store errors
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Search index errors
    #[error("Search index error: {0}")]
    SearchIndex(#[from] SearchIndexError),

    /// No user-readable version exists for the resource
    #[error("Resource {resource_type}/{id} is not known")]
    ResourceNotFound { resource_type: String, id: String },

    /// The requested version does not exist
    #[error("Version \"{vid}\" is not known for resource {resource_type}/{id}")]
    ResourceVersionNotFound {
        resource_type: String,
        id: String,
        vid: u64,
    },

    /// The resource payload or its identifier was rejected
    #[error("Invalid resource: {0}")]
    InvalidResource(String),

    /// Fewer get results came back than read entries were staged
    #[error("Failed to fulfill all READ requests: expected {expected}, received {received}")]
    ReadRequestsNotFulfilled { expected: usize, received: usize },

    /// Bundle is larger than the store's conditional-write set allows
    #[error("Bundle has {actual} entries, maximum is {max}")]
    TooManyEntries { max: usize, actual: usize },

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(String),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(String),

    /// Generic errors with context
    #[error("{0}")]
    Other(String),
}

impl VellumError {
    /// True when the error is a conditional-write precondition failure.
    ///
    /// Such failures mean another transaction holds a valid lease or the item
    /// is not in the expected state. They are recoverable by rollback and retry.
    pub fn is_precondition_failed(&self) -> bool {
        matches!(self, VellumError::Storage(StorageError::PreconditionFailed(_)))
    }

    /// True for the typed not-found signals.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            VellumError::ResourceNotFound { .. } | VellumError::ResourceVersionNotFound { .. }
        )
    }
}

/// Document store errors
///
/// Errors raised by [`DocumentStore`](crate::adapters::storage::DocumentStore) implementations.
#[derive(Debug, Error)]
pub enum StorageError {
    /// A write condition did not hold; nothing was applied
    #[error("Precondition failed: {0}")]
    PreconditionFailed(String),

    /// The addressed item does not exist
    #[error("Item not found: {0}")]
    ItemNotFound(String),

    /// Failed to connect to the backend
    #[error("Failed to connect to storage backend: {0}")]
    ConnectionFailed(String),

    /// Read or query failed
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Single-item write failed
    #[error("Write failed: {0}")]
    WriteFailed(String),

    /// Multi-item transactional write failed for a reason other than a condition
    #[error("Transaction failed: {0}")]
    TransactionFailed(String),

    /// Stored payload could not be decoded
    #[error("Failed to deserialize item: {0}")]
    DeserializationFailed(String),
}

/// Search index errors
#[derive(Debug, Error)]
pub enum SearchIndexError {
    /// Failed to reach the search cluster
    #[error("Failed to connect to search index: {0}")]
    ConnectionFailed(String),

    /// Index creation failed
    #[error("Failed to create index: {0}")]
    IndexCreationFailed(String),

    /// Document upsert failed
    #[error("Failed to upsert document: {0}")]
    UpsertFailed(String),

    /// Document delete failed
    #[error("Failed to delete document: {0}")]
    DeleteFailed(String),

    /// Unexpected HTTP response
    #[error("Unexpected response: {status} - {message}")]
    InvalidResponse { status: u16, message: String },
}

// Conversion from std::io::Error
impl From<std::io::Error> for VellumError {
    fn from(err: std::io::Error) -> Self {
        VellumError::Io(err.to_string())
    }
}

// Conversion from serde_json::Error
impl From<serde_json::Error> for VellumError {
    fn from(err: serde_json::Error) -> Self {
        VellumError::Serialization(err.to_string())
    }
}

// Conversion from toml parse errors
impl From<toml::de::Error> for VellumError {
    fn from(err: toml::de::Error) -> Self {
        VellumError::Configuration(format!("TOML parse error: {err}"))
    }
}
