//! Configuration Loader
//!
//! Handles loading and merging router configuration from multiple sources.

use crate::config::settings::{ConfigOverlay, RouterConfig};
use crate::error::{Result, RouterError};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Environment variable holding a comma-separated list of allowed keys
pub const API_KEYS_ENV: &str = "MUXROUTE_API_KEYS";

/// Environment variable pointing at an extra config file
pub const CONFIG_PATH_ENV: &str = "MUXROUTE_CONFIG_PATH";

/// Configuration loader with support for multiple sources
pub struct ConfigLoader {
    config: RouterConfig,
}

impl ConfigLoader {
    /// Create a new config loader and load from default locations
    pub fn new() -> Result<Self> {
        let _ = dotenvy::dotenv();

        let mut loader = Self::empty();

        // Load built-in defaults first
        loader.load_builtin_defaults()?;

        // Then load from file system (can override built-ins)
        loader.load_from_default_paths()?;

        loader.load_env_api_keys();

        Ok(loader)
    }

    /// Create a loader with a specific config file
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let _ = dotenvy::dotenv();

        let mut loader = Self::empty();
        loader.load_builtin_defaults()?;
        loader.load_from_file(path)?;
        loader.load_env_api_keys();

        Ok(loader)
    }

    fn empty() -> Self {
        Self {
            config: RouterConfig::default(),
        }
    }

    /// Load built-in preference and pricing defaults
    fn load_builtin_defaults(&mut self) -> Result<()> {
        let defaults = include_str!("../../router.json");
        let overlay: ConfigOverlay = serde_json::from_str(defaults).map_err(|e| {
            RouterError::Config(format!("Failed to parse built-in router.json: {}", e))
        })?;

        self.config.merge(overlay);
        Ok(())
    }

    /// Load configuration from default paths
    fn load_from_default_paths(&mut self) -> Result<()> {
        for path in Self::get_config_paths() {
            if path.exists() {
                self.load_from_file(&path)?;
            }
        }

        Ok(())
    }

    /// Get list of config paths to check
    fn get_config_paths() -> Vec<PathBuf> {
        let mut paths = Vec::new();

        // 1. Environment variable
        if let Ok(custom_path) = std::env::var(CONFIG_PATH_ENV) {
            paths.push(PathBuf::from(custom_path));
        }

        // 2. Current directory
        paths.push(PathBuf::from("router.json"));
        paths.push(PathBuf::from("muxroute.json"));

        // 3. User config directory
        if let Some(config_dir) = dirs::config_dir() {
            paths.push(config_dir.join("muxroute").join("router.json"));
        }

        // 4. Home directory
        if let Some(home_dir) = dirs::home_dir() {
            paths.push(home_dir.join(".muxroute").join("router.json"));
        }

        paths
    }

    /// Load configuration from a specific file
    fn load_from_file(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            RouterError::Config(format!("Failed to read {}: {}", path.display(), e))
        })?;

        let overlay: ConfigOverlay = serde_json::from_str(&content).map_err(|e| {
            RouterError::Config(format!("Failed to parse {}: {}", path.display(), e))
        })?;

        debug!(path = %path.display(), "Loaded router config");
        self.config.merge(overlay);
        Ok(())
    }

    /// Merge keys from the environment into the allow-list
    fn load_env_api_keys(&mut self) {
        if let Ok(keys) = std::env::var(API_KEYS_ENV) {
            self.config.add_api_keys(parse_key_list(&keys));
        }
    }

    /// Get the loaded configuration
    pub fn config(&self) -> &RouterConfig {
        &self.config
    }

    /// Take ownership of the configuration
    pub fn into_config(self) -> RouterConfig {
        self.config
    }
}

/// Split a comma-separated key list, dropping blanks
pub fn parse_key_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|k| !k.is_empty())
        .map(String::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::router::{ModelRoute, TaskType};
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_load_builtin_defaults() {
        let mut loader = ConfigLoader::empty();
        loader.load_builtin_defaults().unwrap();

        let config = loader.config();
        for task in TaskType::ALL {
            assert!(!config.preferences[&task].is_empty(), "{} has no routes", task);
        }
        assert!(!config.pricing.is_empty());
        assert!(config.budget.cheapest_model.is_some());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builtin_preferences_are_priced() {
        let mut loader = ConfigLoader::empty();
        loader.load_builtin_defaults().unwrap();

        let config = loader.config();
        for routes in config.preferences.values() {
            for route in routes {
                assert!(config.price_of(route).is_some(), "{} has no price", route);
            }
        }
    }

    #[test]
    fn test_load_from_custom_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"{{
                "api_keys": ["sk-from-file"],
                "rate_limits": {{"requests_per_minute": 10, "requests_per_hour": 100}},
                "preferences": {{
                    "simple": ["custom/tiny-model"]
                }}
            }}"#
        )
        .unwrap();

        let loader = ConfigLoader::from_path(file.path()).unwrap();
        let config = loader.config();

        assert!(config.api_keys.iter().any(|k| k == "sk-from-file"));
        assert_eq!(config.rate_limits.requests_per_minute, 10);
        assert_eq!(
            config.preferences[&TaskType::Simple],
            vec![ModelRoute::new("custom", "tiny-model")]
        );
        // Untouched task types keep the built-in lists
        assert!(!config.preferences[&TaskType::Code].is_empty());
    }

    #[test]
    fn test_missing_file_is_config_error() {
        let err = ConfigLoader::from_path("/nonexistent/muxroute/router.json")
            .err()
            .unwrap();
        assert!(matches!(err, RouterError::Config(_)));
    }

    #[test]
    fn test_invalid_json_is_config_error() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "{{ not json").unwrap();

        let err = ConfigLoader::from_path(file.path()).err().unwrap();
        assert!(err.to_string().contains("Failed to parse"));
    }

    #[test]
    fn test_parse_key_list() {
        assert_eq!(parse_key_list("a, b,,c ,"), vec!["a", "b", "c"]);
        assert!(parse_key_list("  ").is_empty());
    }
}
