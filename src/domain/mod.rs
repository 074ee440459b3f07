//! Domain models and types for Vellum.
//!
//! # Overview
//!
//! The domain layer provides:
//! - **Validated identifiers** ([`ResourceId`], [`TenantId`])
//! - **The document-status state machine** ([`DocumentStatus`])
//! - **Storage and bundle models** ([`StoredItem`], [`BatchRequest`], [`BundleEntryResponse`], [`LockEntry`])
//! - **Change-feed records** ([`ChangeRecord`])
//! - **Error types** ([`VellumError`], [`StorageError`], [`SearchIndexError`])
//! - **Result type alias** ([`Result`])
//!
//! # Error Handling
//!
//! All fallible operations return [`Result<T, VellumError>`]:
//!
//! ```rust
//! use vellum::domain::{ResourceId, Result, VellumError};
//!
//! fn parse(id: &str) -> Result<ResourceId> {
//!     ResourceId::new(id).map_err(VellumError::Validation)
//! }
//! # assert!(parse("ok-id").is_ok());
//! ```

pub mod bundle;
pub mod change;
pub mod errors;
pub mod ids;
pub mod item;
pub mod result;
pub mod status;

// Re-export commonly used types for convenience
pub use bundle::{
    BatchRequest, BundleEntryResponse, BundleErrorKind, BundleResponse, LockEntry, LockRemoval,
    Operation,
};
pub use change::{ChangeEventType, ChangeRecord};
pub use errors::{SearchIndexError, StorageError, VellumError};
pub use ids::{ResourceId, TenantId};
pub use item::{ItemKey, StoredItem};
pub use result::Result;
pub use status::DocumentStatus;
