//! Transact command implementation
//!
//! Runs a bundle file as one transaction against the configured store and
//! prints the bundle response.

use super::{parse_tenant, read_json_file};
use crate::adapters::storage::create_document_store;
use crate::config::load_config;
use crate::core::bundle::{BundleService, BundleSettings};
use crate::core::requests::RequestBuilder;
use crate::domain::BatchRequest;
use clap::Args;

/// Arguments for the transact command
#[derive(Args, Debug)]
pub struct TransactArgs {
    /// JSON file holding an array of bundle entries
    #[arg(short, long)]
    pub bundle: String,

    /// Tenant owning the bundle
    #[arg(short, long)]
    pub tenant: Option<String>,
}

impl TransactArgs {
    /// Execute the transact command
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        let config = match load_config(config_path) {
            Ok(c) => c,
            Err(e) => {
                tracing::error!(error = %e, "Configuration error");
                eprintln!("Configuration error: {e}");
                return Ok(2);
            }
        };

        let tenant = parse_tenant(self.tenant.as_deref())?;
        let requests: Vec<BatchRequest> = read_json_file(&self.bundle)?;

        let store = create_document_store(&config.storage).await?;
        let builder = RequestBuilder::new(config.storage.resource_table.as_str())
            .with_lease_ms(config.bundle.lease_ms);
        let service = BundleService::new(store, builder, BundleSettings::from(&config.bundle));

        tracing::info!(
            bundle = %self.bundle,
            entries = requests.len(),
            backend = ?config.storage.backend,
            "Running bundle"
        );

        match service.transaction(&requests, tenant.as_ref()).await {
            Ok(response) => {
                println!("{}", serde_json::to_string_pretty(&response)?);
                Ok(if response.success { 0 } else { 3 })
            }
            Err(e) => {
                tracing::error!(error = %e, "Bundle rejected");
                eprintln!("Bundle rejected: {e}");
                Ok(3)
            }
        }
    }
}
