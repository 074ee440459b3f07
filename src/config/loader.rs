//! Configuration loader with TOML parsing and environment variable overrides

use super::schema::{StorageBackend, VellumConfig};
use super::secret::secret_string;
use crate::domain::{Result, VellumError};
use regex::Regex;
use std::fs;
use std::path::Path;

/// Loads configuration from a TOML file
///
/// This function:
/// 1. Reads the TOML file
/// 2. Substitutes `${VAR}` placeholders from the environment
/// 3. Parses the TOML into [`VellumConfig`]
/// 4. Applies `VELLUM_<SECTION>_<KEY>` environment overrides
/// 5. Validates the result
///
/// # Errors
///
/// Returns a configuration error if the file is missing or unreadable, a
/// referenced variable is unset, parsing fails, or validation fails.
///
/// # Examples
///
/// ```no_run
/// use vellum::config::load_config;
///
/// let config = load_config("vellum.toml").expect("Failed to load config");
/// println!("Base table: {}", config.storage.resource_table);
/// ```
pub fn load_config(path: impl AsRef<Path>) -> Result<VellumConfig> {
    let path = path.as_ref();

    if !path.exists() {
        return Err(VellumError::Configuration(format!(
            "Configuration file not found: {}",
            path.display()
        )));
    }

    let contents = fs::read_to_string(path).map_err(|e| {
        VellumError::Configuration(format!(
            "Failed to read configuration file {}: {}",
            path.display(),
            e
        ))
    })?;

    let contents = substitute_env_vars(&contents)?;

    let mut config: VellumConfig = toml::from_str(&contents)
        .map_err(|e| VellumError::Configuration(format!("Failed to parse TOML: {e}")))?;

    apply_env_overrides(&mut config)?;

    config.validate().map_err(|e| {
        VellumError::Configuration(format!("Configuration validation failed: {e}"))
    })?;

    Ok(config)
}

/// Substitutes environment variables in the format `${VAR_NAME}`
///
/// Comment lines are left untouched.
///
/// # Errors
///
/// Returns an error listing every referenced variable that is not set
fn substitute_env_vars(input: &str) -> Result<String> {
    let re = Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)\}")
        .map_err(|e| VellumError::Other(format!("Invalid substitution pattern: {e}")))?;
    let mut result = String::new();
    let mut missing_vars: Vec<String> = Vec::new();

    for (index, line) in input.lines().enumerate() {
        if index > 0 {
            result.push('\n');
        }

        if line.trim_start().starts_with('#') {
            result.push_str(line);
            continue;
        }

        let mut processed_line = line.to_string();
        for cap in re.captures_iter(line) {
            let var_name = &cap[1];
            match std::env::var(var_name) {
                Ok(value) => {
                    processed_line = processed_line.replace(&cap[0], &value);
                }
                Err(_) => {
                    if !missing_vars.iter().any(|v| v == var_name) {
                        missing_vars.push(var_name.to_string());
                    }
                }
            }
        }
        result.push_str(&processed_line);
    }

    if !missing_vars.is_empty() {
        return Err(VellumError::Configuration(format!(
            "Missing required environment variables: {}",
            missing_vars.join(", ")
        )));
    }

    Ok(result)
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Result<Option<T>> {
    match std::env::var(key) {
        Ok(val) => val
            .parse()
            .map(Some)
            .map_err(|_| VellumError::Configuration(format!("Invalid value for {key}: '{val}'"))),
        Err(_) => Ok(None),
    }
}

/// Applies environment variable overrides using the VELLUM_* prefix
///
/// Variables follow the pattern `VELLUM_<SECTION>_<KEY>`, for example
/// `VELLUM_STORAGE_RESOURCE_TABLE` or `VELLUM_BUNDLE_MAX_ENTRIES`.
fn apply_env_overrides(config: &mut VellumConfig) -> Result<()> {
    if let Ok(val) = std::env::var("VELLUM_APPLICATION_LOG_LEVEL") {
        config.application.log_level = val;
    }

    // Storage overrides
    if let Ok(val) = std::env::var("VELLUM_STORAGE_BACKEND") {
        config.storage.backend = match val.to_ascii_lowercase().as_str() {
            "memory" => StorageBackend::Memory,
            "postgresql" => StorageBackend::PostgreSQL,
            other => {
                return Err(VellumError::Configuration(format!(
                    "Invalid value for VELLUM_STORAGE_BACKEND: '{other}'"
                )))
            }
        };
    }
    if let Ok(val) = std::env::var("VELLUM_STORAGE_RESOURCE_TABLE") {
        config.storage.resource_table = val;
    }
    if let Some(ref mut pg_config) = config.storage.postgresql {
        if let Ok(val) = std::env::var("VELLUM_STORAGE_POSTGRESQL_CONNECTION_STRING") {
            pg_config.connection_string = secret_string(val);
        }
        if let Some(max) = env_parse("VELLUM_STORAGE_POSTGRESQL_MAX_CONNECTIONS")? {
            pg_config.max_connections = max;
        }
    }

    // Bundle overrides
    if let Some(max) = env_parse("VELLUM_BUNDLE_MAX_ENTRIES")? {
        config.bundle.max_entries = max;
    }
    if let Some(lease) = env_parse("VELLUM_BUNDLE_LEASE_MS")? {
        config.bundle.lease_ms = lease;
    }
    if let Some(supported) = env_parse("VELLUM_BUNDLE_UPDATE_CREATE_SUPPORTED")? {
        config.bundle.update_create_supported = supported;
    }
    if let Some(retries) = env_parse("VELLUM_BUNDLE_LOCK_RETRY_MAX_RETRIES")? {
        config.bundle.lock_retry.max_retries = retries;
    }

    // Search overrides (only if search is configured)
    if let Some(ref mut search) = config.search {
        if let Ok(val) = std::env::var("VELLUM_SEARCH_ENDPOINT") {
            search.endpoint = val;
        }
        if let Ok(val) = std::env::var("VELLUM_SEARCH_USERNAME") {
            search.username = Some(val);
        }
        if let Ok(val) = std::env::var("VELLUM_SEARCH_PASSWORD") {
            search.password = Some(secret_string(val));
        }
        if let Some(verify) = env_parse("VELLUM_SEARCH_TLS_VERIFY")? {
            search.tls_verify = verify;
        }
    }

    if let Some(multi_tenancy) = env_parse("VELLUM_PROJECTOR_MULTI_TENANCY")? {
        config.projector.multi_tenancy = multi_tenancy;
    }

    // Logging overrides
    if let Some(enabled) = env_parse("VELLUM_LOGGING_LOCAL_ENABLED")? {
        config.logging.local_enabled = enabled;
    }
    if let Ok(val) = std::env::var("VELLUM_LOGGING_LOCAL_PATH") {
        config.logging.local_path = val;
    }
    if let Ok(val) = std::env::var("VELLUM_LOGGING_LOCAL_ROTATION") {
        config.logging.local_rotation = val;
    }

    Ok(())
}
