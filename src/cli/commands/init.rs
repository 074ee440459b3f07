//! Init command implementation
//!
//! This module implements the `init` command for generating a sample
//! configuration file.

use clap::Args;
use std::fs;
use std::path::Path;

/// Arguments for the init command
#[derive(Args, Debug)]
pub struct InitArgs {
    /// Path where to create the configuration file
    #[arg(short, long, default_value = "vellum.toml")]
    pub output: String,

    /// Include the optional PostgreSQL and search sections
    #[arg(long)]
    pub with_examples: bool,

    /// Overwrite existing file
    #[arg(long)]
    pub force: bool,
}

impl InitArgs {
    /// Execute the init command
    pub async fn execute(&self) -> anyhow::Result<i32> {
        tracing::info!(output = %self.output, "Initializing configuration file");

        println!("📝 Initializing Vellum configuration");
        println!();

        if Path::new(&self.output).exists() && !self.force {
            println!("❌ Configuration file already exists: {}", self.output);
            println!("   Use --force to overwrite");
            return Ok(2); // Configuration error exit code
        }

        let config_content = if self.with_examples {
            Self::generate_config_with_examples()
        } else {
            Self::generate_minimal_config()
        };

        match fs::write(&self.output, config_content) {
            Ok(_) => {
                println!("✅ Configuration file created: {}", self.output);
                println!();
                println!("Next steps:");
                println!("  1. Edit {} with your settings", self.output);
                println!("  2. Set storage.backend to 'memory' or 'postgresql'");
                println!("  3. Put credentials in a .env file:");
                println!("     - VELLUM_PG_CONNECTION_STRING (if using PostgreSQL)");
                println!("     - VELLUM_SEARCH_PASSWORD (if the search endpoint needs auth)");
                println!("  4. Validate configuration: vellum validate-config");
                println!("  5. Dry-run a bundle: vellum stage --bundle bundle.json");
                println!();
                Ok(0)
            }
            Err(e) => {
                println!("❌ Failed to write configuration file");
                println!("   Error: {e}");
                Ok(5) // Fatal error exit code
            }
        }
    }

    /// Generate minimal configuration
    fn generate_minimal_config() -> String {
        r#"# Vellum Configuration File
# Transactional FHIR persistence over conditional-write key-value stores

environment = "development"  # development | staging | production

[application]
log_level = "info"

[storage]
backend = "memory"  # memory | postgresql
resource_table = "resource-db"

[bundle]
max_entries = 25
lease_ms = 35000
update_create_supported = false

[projector]
multi_tenancy = false

[logging]
local_enabled = true
local_path = "/var/log/vellum"
local_rotation = "daily"
local_max_size_mb = 100
"#
        .to_string()
    }

    /// Generate configuration with examples and comments
    fn generate_config_with_examples() -> String {
        r#"# Vellum Configuration File
# Transactional FHIR persistence over conditional-write key-value stores
#
# Values of the form ${VAR} are read from the environment (or .env).
# Any setting can be overridden with VELLUM_<SECTION>_<KEY>,
# e.g. VELLUM_BUNDLE_MAX_ENTRIES=50.

# Runtime environment; production refuses search.tls_verify = false
environment = "development"  # development | staging | production

[application]
# trace | debug | info | warn | error
log_level = "info"

[storage]
backend = "postgresql"  # memory | postgresql

# Base table; tenant tables are named {resource_table}-{tenant}
resource_table = "resource-db"

[storage.postgresql]
connection_string = "${VELLUM_PG_CONNECTION_STRING}"
max_connections = 10
connection_timeout_seconds = 30
statement_timeout_seconds = 60

[bundle]
# Upper bound on bundle entries (1-100)
max_entries = 25

# Lease granted to a locked resource; expired leases are taken over
lease_ms = 35000

# Let an update of an unknown id create it
update_create_supported = false

[bundle.lock_retry]
# Retries when another transaction holds a lock (0 = fail fast)
max_retries = 0
initial_delay_ms = 100
max_delay_ms = 2000
backoff_multiplier = 2.0

[search]
endpoint = "https://search.example.com:9200"
username = "vellum"
password = "${VELLUM_SEARCH_PASSWORD}"
timeout_seconds = 30
tls_verify = true

[projector]
# Resolve tenants from change-feed source identifiers
multi_tenancy = false

[logging]
local_enabled = true
local_path = "/var/log/vellum"
local_rotation = "daily"  # daily | hourly
local_max_size_mb = 100
"#
        .to_string()
    }
}
