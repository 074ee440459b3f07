//! CLI command implementations

pub mod init;
pub mod project;
pub mod stage;
pub mod transact;
pub mod validate;

use crate::domain::TenantId;
use anyhow::Context;
use serde::de::DeserializeOwned;
use std::fs;

/// Reads a JSON document (a bundle or a change batch) from `path`
pub(crate) fn read_json_file<T: DeserializeOwned>(path: &str) -> anyhow::Result<T> {
    let contents = fs::read_to_string(path).with_context(|| format!("Failed to read {path}"))?;
    serde_json::from_str(&contents).with_context(|| format!("Failed to parse {path}"))
}

pub(crate) fn parse_tenant(tenant: Option<&str>) -> anyhow::Result<Option<TenantId>> {
    tenant
        .map(|t| TenantId::new(t).map_err(|e| anyhow::anyhow!("Invalid tenant: {e}")))
        .transpose()
}
