//! Project command implementation
//!
//! Feeds a JSON array of change records through the projector into the
//! configured search index.

use super::read_json_file;
use crate::adapters::search::create_search_index;
use crate::config::load_config;
use crate::core::projector::Projector;
use crate::domain::ChangeRecord;
use clap::Args;

/// Arguments for the project command
#[derive(Args, Debug)]
pub struct ProjectArgs {
    /// JSON file holding an array of change records
    #[arg(short, long)]
    pub events: String,
}

impl ProjectArgs {
    /// Execute the project command
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        let config = match load_config(config_path) {
            Ok(c) => c,
            Err(e) => {
                tracing::error!(error = %e, "Configuration error");
                eprintln!("Configuration error: {e}");
                return Ok(2);
            }
        };

        let Some(search) = config.search.as_ref() else {
            eprintln!("Configuration error: a [search] section is required to project");
            return Ok(2);
        };

        let records: Vec<ChangeRecord> = read_json_file(&self.events)?;
        let index = create_search_index(search)?;
        let projector = Projector::new(index, config.storage.resource_table.as_str())
            .with_multi_tenancy(config.projector.multi_tenancy);

        let report = projector.project_batch(&records).await;
        println!("{}", serde_json::to_string_pretty(&report)?);

        Ok(if report.failed == 0 { 0 } else { 3 })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_project_requires_search_section() {
        let dir = tempfile::tempdir().unwrap();
        let config = dir.path().join("vellum.toml");
        std::fs::write(&config, "[storage]\nbackend = \"memory\"\n").unwrap();

        let args = ProjectArgs {
            events: dir.path().join("events.json").to_str().unwrap().to_string(),
        };
        assert_eq!(args.execute(config.to_str().unwrap()).await.unwrap(), 2);
    }
}
