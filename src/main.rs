// Vellum - Transactional FHIR persistence over conditional-write key-value stores
// Copyright (c) 2025 Vellum Contributors
// Licensed under the MIT License

use clap::Parser;
use std::process;
use vellum::cli::{Cli, Commands};
use vellum::config::LoggingConfig;
use vellum::logging::init_logging;

#[tokio::main]
async fn main() {
    // Load environment variables from .env file if present
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    // Console-only logging for the CLI; stdout stays reserved for command output
    let log_level = cli.log_level.as_deref().unwrap_or("info");
    let logging_config = LoggingConfig {
        local_enabled: false,
        ..LoggingConfig::default()
    };
    let guard = match init_logging(log_level, &logging_config) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Failed to initialize logging: {e}");
            process::exit(5);
        }
    };

    tracing::debug!(
        version = env!("CARGO_PKG_VERSION"),
        "Vellum - Transactional FHIR persistence"
    );

    let exit_code = match execute_command(&cli).await {
        Ok(code) => code,
        Err(e) => {
            tracing::error!(error = %e, "Command execution failed");
            eprintln!("Error: {e:#}");
            5 // Fatal error exit code
        }
    };

    drop(guard);
    process::exit(exit_code);
}

/// Execute the CLI command
async fn execute_command(cli: &Cli) -> anyhow::Result<i32> {
    match &cli.command {
        Commands::ValidateConfig(args) => args.execute(&cli.config).await,
        Commands::Init(args) => args.execute().await,
        Commands::Stage(args) => args.execute(&cli.config).await,
        Commands::Transact(args) => args.execute(&cli.config).await,
        Commands::Project(args) => args.execute(&cli.config).await,
    }
}
