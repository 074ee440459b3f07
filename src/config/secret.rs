//! Secret configuration values
//!
//! Connection strings and search credentials are held in `secrecy::Secret`
//! containers. The wrapped value is zeroed on drop, its `Debug` output is
//! redacted, and reading it requires an explicit `expose_secret()`.
//!
//! ```rust
//! use vellum::config::secret_string;
//! use secrecy::ExposeSecret;
//!
//! let password = secret_string("search-password".to_string());
//! assert_eq!(password.expose_secret().as_ref(), "search-password");
//! assert!(!format!("{password:?}").contains("search-password"));
//! ```

use secrecy::{CloneableSecret, DebugSecret, Secret, SerializableSecret};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use zeroize::Zeroize;

/// String payload of a [`SecretString`]
#[derive(Clone, Debug, Zeroize)]
#[zeroize(drop)]
pub struct SecretValue(String);

impl CloneableSecret for SecretValue {}
impl DebugSecret for SecretValue {}
impl SerializableSecret for SecretValue {}

impl From<String> for SecretValue {
    fn from(s: String) -> Self {
        SecretValue(s)
    }
}

impl PartialEq<str> for SecretValue {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl std::fmt::Display for SecretValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for SecretValue {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl SecretValue {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn starts_with(&self, prefix: &str) -> bool {
        self.0.starts_with(prefix)
    }
}

impl Serialize for SecretValue {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.0.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for SecretValue {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        String::deserialize(deserializer).map(SecretValue)
    }
}

/// Zeroizing, redacted string used for credentials
pub type SecretString = Secret<SecretValue>;

/// Wraps a plain string as a [`SecretString`]
#[inline]
pub fn secret_string(value: String) -> SecretString {
    Secret::new(SecretValue::from(value))
}

#[inline]
pub fn secret_string_opt(value: Option<String>) -> Option<SecretString> {
    value.map(secret_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;

    #[test]
    fn test_secret_string_exposes_value() {
        let secret = secret_string("postgresql://u:p@db/vellum".to_string());
        assert_eq!(secret.expose_secret(), "postgresql://u:p@db/vellum");
        assert!(secret.expose_secret().starts_with("postgresql://"));
    }

    #[test]
    fn test_secret_string_opt() {
        assert!(secret_string_opt(Some("pw".to_string())).is_some());
        assert!(secret_string_opt(None).is_none());
    }

    #[test]
    fn test_secret_debug_redacted() {
        let secret = secret_string("sensitive-data".to_string());
        let debug_output = format!("{secret:?}");
        assert!(!debug_output.contains("sensitive-data"));
    }

    #[test]
    fn test_secret_deserializes_from_toml() {
        #[derive(Deserialize)]
        struct Credentials {
            password: SecretString,
        }

        let parsed: Credentials = toml::from_str(r#"password = "hunter2""#).unwrap();
        assert_eq!(parsed.password.expose_secret(), "hunter2");
        assert!(!parsed.password.expose_secret().is_empty());
    }
}
