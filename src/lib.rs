// Vellum - Transactional FHIR persistence over conditional-write key-value stores
// Copyright (c) 2025 Vellum Contributors
// Licensed under the MIT License

//! # Vellum - Transactional FHIR persistence
//!
//! Vellum makes multi-resource FHIR bundles atomic on top of a key-value store
//! whose only transaction primitive is a bounded set of conditional writes, and
//! mirrors committed state into a search index from the store's change feed.
//!
//! ## Overview
//!
//! This library provides:
//! - **Staging** bundles of create/read/update/delete operations as conditional writes
//! - **Locking** with leases so concurrent bundles touching one id exclude each other
//! - **Rolling back** a failed bundle from its lock ledger and provisional responses
//! - **Projecting** change-feed records into a search index in a safe order
//!
//! ## Architecture
//!
//! - [`cli`] - Command-line interface and argument parsing
//! - [`core`] - Bundle engine, resource service and change projector
//! - [`adapters`] - Document stores (memory, PostgreSQL) and search indexes
//! - [`domain`] - Core domain types and models
//! - [`config`] - Configuration management
//! - [`logging`] - Structured logging and observability
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use serde_json::json;
//! use vellum::adapters::memory::MemoryDocumentStore;
//! use vellum::core::bundle::{BundleService, BundleSettings};
//! use vellum::core::requests::RequestBuilder;
//! use vellum::domain::BatchRequest;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = Arc::new(MemoryDocumentStore::new());
//!     let bundles = BundleService::new(
//!         store,
//!         RequestBuilder::new("resource-db"),
//!         BundleSettings::default(),
//!     );
//!
//!     let response = bundles
//!         .transaction(
//!             &[BatchRequest::create("Patient", json!({"resourceType": "Patient"}))],
//!             None,
//!         )
//!         .await?;
//!
//!     println!("Committed {} entries", response.entries.len());
//!     Ok(())
//! }
//! ```
//!
//! ## Document Status
//!
//! Every stored version carries a status. Only `AVAILABLE` versions are
//! readable; `LOCKED` and `PENDING_DELETE` hold a lease (`lockEndTs`) that
//! another transaction may take over once it has expired.
//!
//! ```text
//! PENDING ──commit──> AVAILABLE ──lock──> LOCKED ──> AVAILABLE | DELETED
//!                                   └───> PENDING_DELETE ──> DELETED
//! ```
//!
//! ## Change Projection
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use vellum::adapters::memory::MemorySearchIndex;
//! use vellum::core::projector::Projector;
//! use vellum::domain::ChangeRecord;
//!
//! # async fn example(records: Vec<ChangeRecord>) {
//! let projector = Projector::new(Arc::new(MemorySearchIndex::new()), "resource-db");
//! let report = projector.project_batch(&records).await;
//! println!("Applied: {}, failed: {}", report.applied(), report.failed);
//! # }
//! ```
//!
//! ## Error Handling
//!
//! Library operations return [`domain::Result`], backed by [`domain::VellumError`]:
//!
//! ```rust,no_run
//! use vellum::domain::VellumError;
//!
//! fn example() -> Result<(), VellumError> {
//!     let config = vellum::config::load_config("vellum.toml")?;
//!     println!("{}", config.storage.resource_table);
//!     Ok(())
//! }
//! ```

pub mod adapters;
pub mod cli;
pub mod config;
pub mod core;
pub mod domain;
pub mod logging;

pub use domain::{Result, VellumError};
