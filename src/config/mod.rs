//! Configuration management for Vellum.
//!
//! TOML-based configuration with:
//! - Environment variable substitution (`${VAR_NAME}`)
//! - `VELLUM_<SECTION>_<KEY>` environment overrides
//! - Default values for every optional setting
//! - Validation on load
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use vellum::config::load_config;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = load_config("vellum.toml")?;
//! println!("Base table: {}", config.storage.resource_table);
//! println!("Max bundle entries: {}", config.bundle.max_entries);
//! if let Some(search) = &config.search {
//!     println!("Search endpoint: {}", search.endpoint);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # Configuration Structure
//!
//! - [`ApplicationConfig`] - log level
//! - [`StorageConfig`] - document store backend and base table
//! - [`BundleConfig`] - bundle size bound, lease duration, lock retry policy
//! - [`SearchConfig`] - search cluster endpoint and credentials
//! - [`ProjectorConfig`] - change projector tenancy
//! - [`LoggingConfig`] - file logging
//!
//! # Example Configuration
//!
//! ```toml
//! environment = "production"
//!
//! [application]
//! log_level = "info"
//!
//! [storage]
//! backend = "postgresql"
//! resource_table = "resource-db"
//!
//! [storage.postgresql]
//! connection_string = "${VELLUM_PG_CONNECTION_STRING}"
//!
//! [bundle]
//! max_entries = 25
//!
//! [search]
//! endpoint = "https://search.example.com:9200"
//! username = "vellum"
//! password = "${VELLUM_SEARCH_PASSWORD}"
//! ```

pub mod loader;
pub mod schema;
pub mod secret;

// Re-export commonly used types
pub use loader::load_config;
pub use schema::{
    ApplicationConfig, BundleConfig, Environment, LoggingConfig, PostgreSQLConfig,
    ProjectorConfig, RetryConfig, SearchConfig, StorageBackend, StorageConfig, VellumConfig,
};
pub use secret::{secret_string, secret_string_opt, SecretString, SecretValue};
