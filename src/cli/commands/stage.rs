//! Stage command implementation
//!
//! Dry run of bundle staging: prints the storage requests, provisional
//! responses and locks a bundle would produce. No store is contacted.

use super::{parse_tenant, read_json_file};
use crate::config::{load_config, VellumConfig};
use crate::core::bundle::generate_staging_requests;
use crate::core::requests::RequestBuilder;
use crate::domain::{BatchRequest, Operation};
use clap::Args;
use std::collections::HashMap;
use std::path::Path;

/// Arguments for the stage command
#[derive(Args, Debug)]
pub struct StageArgs {
    /// JSON file holding an array of bundle entries
    #[arg(short, long)]
    pub bundle: String,

    /// Tenant owning the bundle
    #[arg(short, long)]
    pub tenant: Option<String>,

    /// Current version of a referenced id, as ID=VID (repeatable; unlisted ids are at 1)
    #[arg(long = "version", value_name = "ID=VID")]
    pub versions: Vec<String>,
}

impl StageArgs {
    /// Execute the stage command
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        let config = if Path::new(config_path).exists() {
            match load_config(config_path) {
                Ok(c) => c,
                Err(e) => {
                    eprintln!("Configuration error: {e}");
                    return Ok(2);
                }
            }
        } else {
            tracing::debug!(config_path = %config_path, "No configuration file, staging with defaults");
            VellumConfig::default()
        };

        let tenant = parse_tenant(self.tenant.as_deref())?;
        let requests: Vec<BatchRequest> = read_json_file(&self.bundle)?;

        if requests.len() > config.bundle.max_entries {
            eprintln!(
                "Bundle has {} entries, the maximum is {}",
                requests.len(),
                config.bundle.max_entries
            );
            return Ok(3);
        }

        let id_to_version_id = match self.version_map(&requests) {
            Ok(map) => map,
            Err(e) => {
                eprintln!("{e}");
                return Ok(2);
            }
        };

        let builder = RequestBuilder::new(config.storage.resource_table.as_str())
            .with_lease_ms(config.bundle.lease_ms);

        match generate_staging_requests(&builder, &requests, &id_to_version_id, tenant.as_ref()) {
            Ok(plan) => {
                tracing::info!(
                    entries = requests.len(),
                    writes = plan.write_requests().len(),
                    reads = plan.read_requests.len(),
                    "Bundle staged"
                );
                println!("{}", serde_json::to_string_pretty(&plan)?);
                Ok(0)
            }
            Err(e) => {
                eprintln!("Staging failed: {e}");
                Ok(3)
            }
        }
    }

    /// Versions of every referenced id: explicit `--version` pairs, else 1
    fn version_map(&self, requests: &[BatchRequest]) -> Result<HashMap<String, u64>, String> {
        let mut map: HashMap<String, u64> = requests
            .iter()
            .filter(|r| r.operation != Operation::Create)
            .filter_map(|r| r.target_id().map(|id| (id.to_string(), 1)))
            .collect();

        for pair in &self.versions {
            let (id, vid) = pair
                .split_once('=')
                .ok_or_else(|| format!("Invalid --version '{pair}', expected ID=VID"))?;
            let vid = vid
                .parse::<u64>()
                .map_err(|_| format!("Invalid version number in '{pair}'"))?;
            map.insert(id.to_string(), vid);
        }

        Ok(map)
    }
}
