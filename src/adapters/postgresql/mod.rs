//! PostgreSQL storage backend
//!
//! Stores every tenant table in one `resource_items` relation keyed by
//! `(table_name, id, vid)`.

pub mod client;
pub mod store;

pub use client::PostgreSQLClient;
pub use store::PostgresDocumentStore;
