//! Identifier types with validation
//!
//! Newtype wrappers for the two identifiers the engine validates at its boundary:
//! logical resource ids supplied by callers and tenant ids that select a table.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Maximum length shared by resource and tenant ids
const MAX_ID_LEN: usize = 64;

/// Logical resource identifier
///
/// FHIR ids are 1 to 64 characters drawn from ASCII letters, digits, `-` and `.`.
/// The `_` separator is therefore free for composite search-index keys.
///
/// # Examples
///
/// ```
/// use vellum::domain::ids::ResourceId;
/// use std::str::FromStr;
///
/// let id = ResourceId::from_str("patient-42").unwrap();
/// assert_eq!(id.as_str(), "patient-42");
/// assert!(ResourceId::new("bad_id").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResourceId(String);

impl ResourceId {
    /// Creates a new ResourceId, rejecting ids outside the FHIR id grammar
    pub fn new(id: impl Into<String>) -> Result<Self, String> {
        let id = id.into();
        if id.is_empty() || id.len() > MAX_ID_LEN {
            return Err(format!(
                "Resource id must be 1 to {MAX_ID_LEN} characters, got {}",
                id.len()
            ));
        }
        if !id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '.')
        {
            return Err(format!("Resource id '{id}' contains invalid characters"));
        }
        Ok(Self(id))
    }

    /// Generates a fresh server-assigned id (UUID v4)
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    /// Returns the id as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes self and returns the inner String
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ResourceId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl AsRef<str> for ResourceId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Tenant identifier
///
/// Tenants select a namespaced table `{base}-{tenant}`, so the id is restricted to
/// ASCII letters and digits. That keeps the hyphen usable as the table separator.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TenantId(String);

impl TenantId {
    /// Creates a new TenantId
    pub fn new(id: impl Into<String>) -> Result<Self, String> {
        let id = id.into();
        if id.is_empty() || id.len() > MAX_ID_LEN {
            return Err(format!(
                "Tenant id must be 1 to {MAX_ID_LEN} characters, got {}",
                id.len()
            ));
        }
        if !id.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(format!("Tenant id '{id}' must be alphanumeric"));
        }
        Ok(Self(id))
    }

    /// Returns the tenant id as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TenantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for TenantId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl AsRef<str> for TenantId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
