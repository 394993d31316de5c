//! # Storage Configuration
//!
//! Construction parameters for every structure in the core, loaded once at
//! startup from TOML:
//!
//! ```toml
//! page_power = 8          # pages of 256 elements
//! initial_page_count = 4  # page-table slots reserved up front
//! hash_size = 47          # registry buckets, prime recommended
//! initial_capacity = 64   # registry ids before the first expand
//! ```
//!
//! Missing keys fall back to the defaults above (`initial_page_count`
//! defaults to 1).

use std::path::Path;

use serde::Deserialize;

use crate::error::{StorageError, StorageResult};

/// Largest accepted page power (16M elements per page).
pub const MAX_PAGE_POWER: u32 = 24;

/// Default page power (256 elements per page).
pub const DEFAULT_PAGE_POWER: u32 = 8;

/// Default registry bucket count.
pub const DEFAULT_HASH_SIZE: usize = 47;

/// Default registry capacity.
pub const DEFAULT_CAPACITY: usize = 64;

/// Construction parameters shared by arrays, buffers, registries and trees.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StorageConfig {
    /// Page size as a power of two.
    pub page_power: u32,
    /// Page-table slots reserved at construction (one page is materialized).
    pub initial_page_count: usize,
    /// Bucket count of registry hash tables.
    pub hash_size: usize,
    /// Initial registry capacity in ids.
    pub initial_capacity: usize,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            page_power: DEFAULT_PAGE_POWER,
            initial_page_count: 1,
            hash_size: DEFAULT_HASH_SIZE,
            initial_capacity: DEFAULT_CAPACITY,
        }
    }
}

impl StorageConfig {
    /// Parses and validates a configuration from TOML text.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::InvalidConfig`] on malformed TOML, unknown keys
    /// or out-of-range values.
    pub fn from_toml_str(text: &str) -> StorageResult<Self> {
        let config: Self =
            toml::from_str(text).map_err(|e| StorageError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a configuration file.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::InvalidConfig`] if the file cannot be read or
    /// does not hold a valid configuration.
    pub fn from_file(path: impl AsRef<Path>) -> StorageResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| {
            StorageError::InvalidConfig(format!("{}: {e}", path.display()))
        })?;
        let config = Self::from_toml_str(&text)?;
        tracing::debug!(
            path = %path.display(),
            page_power = config.page_power,
            hash_size = config.hash_size,
            "storage config loaded"
        );
        Ok(config)
    }

    /// Checks every parameter against its accepted range.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::InvalidConfig`] naming the first bad field.
    pub fn validate(&self) -> StorageResult<()> {
        if self.page_power == 0 || self.page_power > MAX_PAGE_POWER {
            return Err(StorageError::InvalidConfig(format!(
                "page_power must be in 1..={MAX_PAGE_POWER} (got {})",
                self.page_power
            )));
        }
        if self.initial_page_count == 0 {
            return Err(StorageError::InvalidConfig(
                "initial_page_count must be at least 1".into(),
            ));
        }
        if self.hash_size == 0 {
            return Err(StorageError::InvalidConfig(
                "hash_size must be at least 1".into(),
            ));
        }
        if self.initial_capacity == 0 {
            return Err(StorageError::InvalidConfig(
                "initial_capacity must be at least 1".into(),
            ));
        }
        Ok(())
    }

    /// Number of elements in one page.
    #[inline]
    #[must_use]
    pub const fn page_size(&self) -> usize {
        1 << self.page_power
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = StorageConfig::default();
        assert_eq!(config.page_size(), 256);
        assert_eq!(config.hash_size, 47);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config = StorageConfig::from_toml_str("page_power = 4\nhash_size = 13\n").unwrap();
        assert_eq!(config.page_power, 4);
        assert_eq!(config.hash_size, 13);
        assert_eq!(config.initial_capacity, DEFAULT_CAPACITY);
        assert_eq!(config.initial_page_count, 1);
    }

    #[test]
    fn test_rejects_bad_values() {
        assert!(StorageConfig::from_toml_str("page_power = 0").is_err());
        assert!(StorageConfig::from_toml_str("page_power = 40").is_err());
        assert!(StorageConfig::from_toml_str("hash_size = 0").is_err());
        assert!(StorageConfig::from_toml_str("initial_page_count = 0").is_err());
        assert!(StorageConfig::from_toml_str("initial_capacity = 0").is_err());
    }

    #[test]
    fn test_rejects_unknown_keys() {
        let err = StorageConfig::from_toml_str("page_powr = 3").unwrap_err();
        assert!(matches!(err, StorageError::InvalidConfig(_)));
    }

    #[test]
    fn test_missing_file() {
        let err = StorageConfig::from_file("/definitely/not/here.toml").unwrap_err();
        assert!(matches!(err, StorageError::InvalidConfig(_)));
    }
}
