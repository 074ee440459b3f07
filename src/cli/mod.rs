//! CLI interface and argument parsing
//!
//! This module provides the command-line interface for Vellum using clap.

pub mod commands;

use clap::{Parser, Subcommand};

/// Vellum - Transactional FHIR persistence
#[derive(Parser, Debug)]
#[command(name = "vellum")]
#[command(version, about, long_about = None)]
#[command(author = "Vellum Contributors")]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "vellum.toml", env = "VELLUM_CONFIG")]
    pub config: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, env = "VELLUM_LOG_LEVEL")]
    pub log_level: Option<String>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Validate configuration file
    ValidateConfig(commands::validate::ValidateArgs),

    /// Initialize a new configuration file
    Init(commands::init::InitArgs),

    /// Print the storage requests a bundle would stage, without touching a store
    Stage(commands::stage::StageArgs),

    /// Run a bundle as one transaction against the configured store
    Transact(commands::transact::TransactArgs),

    /// Project change records into the configured search index
    Project(commands::project::ProjectArgs),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parse_validate_config() {
        let cli = Cli::parse_from(["vellum", "validate-config"]);
        assert_eq!(cli.config, "vellum.toml");
        assert!(matches!(cli.command, Commands::ValidateConfig(_)));
    }

    #[test]
    fn test_cli_parse_with_config() {
        let cli = Cli::parse_from(["vellum", "--config", "custom.toml", "validate-config"]);
        assert_eq!(cli.config, "custom.toml");
    }

    #[test]
    fn test_cli_parse_with_log_level() {
        let cli = Cli::parse_from(["vellum", "--log-level", "debug", "init"]);
        assert_eq!(cli.log_level, Some("debug".to_string()));
    }

    #[test]
    fn test_cli_parse_stage() {
        let cli = Cli::parse_from([
            "vellum", "stage", "--bundle", "bundle.json", "--tenant", "acme", "--version", "p1=3",
        ]);
        match cli.command {
            Commands::Stage(args) => {
                assert_eq!(args.bundle, "bundle.json");
                assert_eq!(args.tenant.as_deref(), Some("acme"));
                assert_eq!(args.versions, vec!["p1=3".to_string()]);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_cli_parse_transact() {
        let cli = Cli::parse_from(["vellum", "transact", "--bundle", "bundle.json"]);
        assert!(matches!(cli.command, Commands::Transact(_)));
    }

    #[test]
    fn test_cli_parse_project() {
        let cli = Cli::parse_from(["vellum", "project", "--events", "events.json"]);
        assert!(matches!(cli.command, Commands::Project(_)));
    }
}
