//! Search index abstraction and the REST adapter

pub mod http;
pub mod traits;

pub use http::HttpSearchIndex;
pub use traits::{index_mappings, SearchIndex};

use crate::config::SearchConfig;
use crate::domain::Result;
use std::sync::Arc;

/// Create the search index client from configuration
pub fn create_search_index(config: &SearchConfig) -> Result<Arc<dyn SearchIndex>> {
    tracing::info!(endpoint = %config.endpoint, "Creating search index client");
    Ok(Arc::new(HttpSearchIndex::new(config)?))
}
