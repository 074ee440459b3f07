//! Core business logic for Vellum.
//!
//! # Modules
//!
//! - [`codec`] - Encoding resources into stored items and back
//! - [`requests`] - Storage request model and the tenant-aware builder
//! - [`bundle`] - Staging, rollback, read merging and the bundle transaction service
//! - [`versions`] - Resolution of the readable version of a resource
//! - [`resource`] - Single-resource create/read/vread/update/delete
//! - [`projector`] - Change-feed projection into the search index
//! - [`clock`] - Wall-clock helpers for leases and `meta.lastUpdated`
//!
//! # Bundle Workflow
//!
//! 1. **Validate**: entry count and duplicate targets
//! 2. **Lock**: move every targeted version from `AVAILABLE` to `LOCKED`
//! 3. **Stage**: write new versions as `PENDING`, run reads
//! 4. **Finalize**: promote new versions and retire the superseded ones
//! 5. **Rollback** on any staging failure
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use serde_json::json;
//! use vellum::adapters::memory::MemoryDocumentStore;
//! use vellum::core::bundle::{BundleService, BundleSettings};
//! use vellum::core::requests::RequestBuilder;
//! use vellum::domain::BatchRequest;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let store = Arc::new(MemoryDocumentStore::new());
//! let service = BundleService::new(store, RequestBuilder::new("resource-db"), BundleSettings::default());
//!
//! let requests = vec![BatchRequest::create("Patient", json!({"resourceType": "Patient"}))];
//! let response = service.transaction(&requests, None).await?;
//!
//! println!("Committed: {}", response.success);
//! # Ok(())
//! # }
//! ```

pub mod bundle;
pub mod clock;
pub mod codec;
pub mod projector;
pub mod requests;
pub mod resource;
pub mod versions;
