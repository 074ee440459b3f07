//! Document store abstraction
//!
//! The engine talks to its key-value backend only through [`DocumentStore`].
//! Backends are selected by [`create_document_store`].

pub mod factory;
pub mod traits;

pub use factory::create_document_store;
pub use traits::DocumentStore;
