//! In-memory backends
//!
//! Used for tests, dry runs and `backend = "memory"`.

pub mod index;
pub mod store;

pub use index::{IndexOperation, MemorySearchIndex};
pub use store::MemoryDocumentStore;
