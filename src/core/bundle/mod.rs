//! Transactional bundles
//!
//! [`staging`], [`rollback`] and [`merge`] are pure transforms over requests and
//! responses. [`service::BundleService`] executes them against a store.

pub mod merge;
pub mod rollback;
pub mod service;
pub mod staging;

pub use merge::populate_bundle_entry_responses_with_read_results;
pub use rollback::{generate_rollback_requests, RollbackPlan};
pub use service::{BundleService, BundleSettings};
pub use staging::{generate_staging_requests, StagingPlan};
