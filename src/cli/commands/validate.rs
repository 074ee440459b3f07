//! Validate config command implementation
//!
//! This module implements the `validate-config` command for validating
//! the Vellum configuration file.

use crate::config::{load_config, StorageBackend};
use clap::Args;

/// Arguments for the validate-config command
#[derive(Args, Debug)]
pub struct ValidateArgs {}

impl ValidateArgs {
    /// Execute the validate-config command
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        tracing::info!(config_path = %config_path, "Validating configuration");

        println!("🔍 Validating configuration file: {config_path}");
        println!();

        // Loading also validates
        let config = match load_config(config_path) {
            Ok(c) => c,
            Err(e) => {
                println!("❌ Configuration is invalid");
                println!("   Error: {e}");
                return Ok(2); // Configuration error exit code
            }
        };

        println!("✅ Configuration is valid");
        println!();
        println!("Configuration Summary:");
        println!("  Environment: {:?}", config.environment);
        println!("  Log Level: {}", config.application.log_level);
        println!("  Resource Table: {}", config.storage.resource_table);

        match config.storage.backend {
            StorageBackend::Memory => println!("  Storage Backend: memory"),
            StorageBackend::PostgreSQL => {
                println!("  Storage Backend: PostgreSQL");
                if let Some(ref pg_config) = config.storage.postgresql {
                    use secrecy::ExposeSecret;
                    println!(
                        "  PostgreSQL Connection: {}",
                        pg_config
                            .connection_string
                            .expose_secret()
                            .as_ref()
                            .split('@')
                            .next_back()
                            .unwrap_or("***")
                    );
                    println!("  Max Connections: {}", pg_config.max_connections);
                }
            }
        }

        println!("  Bundle Max Entries: {}", config.bundle.max_entries);
        println!("  Lease: {} ms", config.bundle.lease_ms);
        println!(
            "  Lock Retries: {}",
            config.bundle.lock_retry.max_retries
        );
        println!(
            "  Update As Create: {}",
            config.bundle.update_create_supported
        );

        match &config.search {
            Some(search) => println!("  Search Endpoint: {}", search.endpoint),
            None => println!("  Search Endpoint: (not configured)"),
        }
        println!("  Multi-tenancy: {}", config.projector.multi_tenancy);
        println!();

        Ok(0)
    }
}
