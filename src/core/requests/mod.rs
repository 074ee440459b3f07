//! Storage request model and builder

pub mod builder;
pub mod model;

pub use builder::{RequestBuilder, LOCK_DURATION_MS};
pub use model::{
    Condition, DeleteRequest, GetRequest, PutRequest, StatusUpdateRequest, VersionQuery,
    WriteRequest,
};
