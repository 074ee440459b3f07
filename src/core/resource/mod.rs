//! Single-resource operations

pub mod service;

pub use service::{ResourceResponse, ResourceService};
