//! Dispatch Configuration
//!
//! Tunables for the dispatch engine and its call-site caches.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Upper bound on `generic.class` method names.
pub const DEFAULT_MAX_METHOD_NAME_LEN: usize = 512;

/// Configuration for dispatch resolution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatchConfig {
    /// Longest `generic.class` name the engine will look up.
    pub max_method_name_len: usize,

    /// Consult the registered-methods table of the generic's defining scope
    /// after the lexical scope chain.
    pub registered_methods: bool,

    /// Reuse head matches at `UseMethod` call sites.
    pub call_site_cache: bool,

    /// Reuse head matches at `NextMethod` call sites.
    pub next_method_cache: bool,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            max_method_name_len: DEFAULT_MAX_METHOD_NAME_LEN,
            registered_methods: true,
            call_site_cache: true,
            next_method_cache: true,
        }
    }
}

impl DispatchConfig {
    /// Creates a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a configuration from TOML text. Missing keys keep their
    /// defaults.
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(source)?)
    }

    /// Loads a configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let source = fs::read_to_string(path)?;
        Self::from_toml_str(&source)
    }

    /// Configuration with both caches disabled, so every call walks the
    /// class vector.
    pub fn uncached() -> Self {
        Self {
            call_site_cache: false,
            next_method_cache: false,
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn test_defaults() {
        let config = DispatchConfig::default();
        assert_eq!(config.max_method_name_len, 512);
        assert!(config.registered_methods);
        assert!(config.call_site_cache);
        assert!(config.next_method_cache);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = DispatchConfig::from_toml_str("call_site_cache = false\n").unwrap();
        assert!(!config.call_site_cache);
        assert!(config.next_method_cache);
        assert_eq!(config.max_method_name_len, DEFAULT_MAX_METHOD_NAME_LEN);
    }

    #[test]
    fn test_invalid_toml() {
        let result = DispatchConfig::from_toml_str("max_method_name_len = \"long\"");
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "max_method_name_len = 64").unwrap();
        writeln!(file, "registered_methods = false").unwrap();

        let config = DispatchConfig::load(file.path()).unwrap();
        assert_eq!(config.max_method_name_len, 64);
        assert!(!config.registered_methods);
    }

    #[test]
    fn test_load_missing_file() {
        let result = DispatchConfig::load("/nonexistent/rdispatch.toml");
        assert!(matches!(result, Err(ConfigError::Io(_))));
    }
}
