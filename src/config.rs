//! Category configuration.
//!
//! Defaults are embedded at compile time from `config/categories.json`; a
//! user file with the same shape replaces them.

use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::{debug, info};

use crate::error::ConfigError;
use crate::item::CategoryId;
use crate::style::StyleDescriptor;

const DEFAULT_CONFIG: &str = include_str!("../config/categories.json");

/// Map configuration supplied by the host
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MapConfig {
    /// Country where inactive items are hidden by the "active only" filter
    pub home_country: String,
    /// `[min_lon, min_lat, max_lon, max_lat]` shown when nothing else is requested
    pub default_extent: [f64; 4],
    /// Categories in display order
    pub categories: Vec<CategoryConfig>,
}

/// A top-level category
#[derive(Debug, Clone, Deserialize)]
pub struct CategoryConfig {
    pub id: CategoryId,
    pub label: String,
    #[serde(flatten)]
    pub style: StyleDescriptor,
    #[serde(default)]
    pub subcategories: Vec<SubcategoryConfig>,
}

/// A subcategory; without style fields it is drawn like its parent
#[derive(Debug, Clone, Deserialize)]
pub struct SubcategoryConfig {
    pub id: CategoryId,
    pub label: String,
    #[serde(flatten)]
    pub style: StyleDescriptor,
}

impl MapConfig {
    /// Embedded default configuration
    ///
    /// # Panics
    ///
    /// Panics if the embedded JSON is malformed, which the tests rule out.
    pub fn builtin() -> Self {
        serde_json::from_str(DEFAULT_CONFIG)
            .unwrap_or_else(|e| panic!("Embedded category config is invalid: {e}"))
    }

    /// Load the configuration from `path`, the user config file, or the defaults
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = path {
            return Self::from_file(path);
        }

        match user_config_path() {
            Some(path) if path.exists() => Self::from_file(&path),
            _ => {
                debug!("Using built-in category config");
                Ok(Self::builtin())
            }
        }
    }

    /// Parse a configuration file
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        let config: Self = serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;

        info!(path = ?path, categories = config.categories.len(), "Loaded category config");
        Ok(config)
    }

    pub fn category(&self, id: &CategoryId) -> Option<&CategoryConfig> {
        self.categories.iter().find(|c| &c.id == id)
    }
}

/// `<config_dir>/mappr/config.json`
fn user_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("mappr").join("config.json"))
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use super::*;
    use crate::style::{ResolveOptions, StyleResolver};

    #[test]
    fn test_builtin_config_parses() {
        let config = MapConfig::builtin();
        assert_eq!(config.home_country, "FR");
        assert_eq!(config.categories.len(), 3);
    }

    #[test]
    fn test_category_ids_are_unique() {
        let config = MapConfig::builtin();
        let mut seen = BTreeSet::new();
        for category in &config.categories {
            assert!(seen.insert(&category.id), "Duplicate category: {}", category.id);

            let mut sub_seen = BTreeSet::new();
            for sub in &category.subcategories {
                assert!(sub_seen.insert(&sub.id), "Duplicate subcategory: {}", sub.id);
            }
        }
    }

    #[test]
    fn test_builtin_styles_resolve() {
        let resolver = StyleResolver::default();
        for category in &MapConfig::builtin().categories {
            assert!(
                resolver
                    .resolve(&category.style, ResolveOptions::default())
                    .is_some(),
                "Category {} has no renderable style",
                category.id
            );
            for sub in category.subcategories.iter().filter(|s| !s.style.is_empty()) {
                assert!(
                    resolver.resolve(&sub.style, ResolveOptions::default()).is_some(),
                    "Subcategory {} has no renderable style",
                    sub.id
                );
            }
        }
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let err = MapConfig::load(Some(Path::new("/nonexistent/mappr.json"))).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }

    #[test]
    fn test_malformed_file_is_an_error() {
        let path = std::env::temp_dir().join(format!("mappr-config-{}.json", std::process::id()));
        std::fs::write(&path, "{\"homeCountry\": 3}").unwrap();

        let err = MapConfig::from_file(&path).unwrap_err();
        let _ = std::fs::remove_file(&path);

        assert!(matches!(err, ConfigError::Parse { .. }));
    }
}
