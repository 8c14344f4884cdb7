//! Configuration loading and management

use crate::config::client_config::ClientConfig;
use crate::error::{BeaconError, BeaconResult};
use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

const ENV_API_BASE_URL: &str = "BEACON_API_BASE_URL";
const ENV_STORAGE_DIR: &str = "BEACON_STORAGE_DIR";
const ENV_LOG_LEVEL: &str = "BEACON_LOG_LEVEL";
const ENV_LOG_FORMAT: &str = "BEACON_LOG_FORMAT";
const ENV_CACHE_TTL_MS: &str = "BEACON_CACHE_TTL_MS";

/// Source of configuration data
#[derive(Debug, Clone)]
pub enum ConfigSource {
    /// Configuration from a file (JSON, TOML or YAML by extension)
    File(PathBuf),
    /// `BEACON_*` process environment variables
    Environment,
    /// Explicit `BEACON_*` style overrides, e.g. from command line flags
    Overrides(HashMap<String, String>),
    /// Default configuration
    Default,
}

/// Configuration loader with support for multiple sources
///
/// Sources are applied in the order they were added; later sources win.
#[derive(Debug, Default)]
pub struct ConfigLoader {
    sources: Vec<ConfigSource>,
}

impl ConfigLoader {
    /// Create a new config loader
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a configuration source
    pub fn add_source(mut self, source: ConfigSource) -> Self {
        self.sources.push(source);
        self
    }

    /// Add a file source
    pub fn with_file<P: AsRef<Path>>(self, path: P) -> Self {
        self.add_source(ConfigSource::File(path.as_ref().to_path_buf()))
    }

    /// Add environment variables source
    pub fn with_env(self) -> Self {
        self.add_source(ConfigSource::Environment)
    }

    /// Add explicit overrides keyed like the environment variables
    pub fn with_overrides(self, overrides: HashMap<String, String>) -> Self {
        self.add_source(ConfigSource::Overrides(overrides))
    }

    /// Add default configuration source
    pub fn with_defaults(self) -> Self {
        self.add_source(ConfigSource::Default)
    }

    /// Load configuration from all sources and validate the result
    pub fn load(self) -> BeaconResult<ClientConfig> {
        let mut config = ClientConfig::default();

        for source in &self.sources {
            match source {
                ConfigSource::File(path) => {
                    tracing::debug!("Loading config from file: {}", path.display());
                    config = load_from_file(path)?;
                }
                ConfigSource::Environment => {
                    tracing::debug!("Loading config from environment");
                    apply_overrides(&mut config, |name| env::var(name).ok())?;
                }
                ConfigSource::Overrides(values) => {
                    tracing::debug!("Applying {} config overrides", values.len());
                    apply_overrides(&mut config, |name| values.get(name).cloned())?;
                }
                ConfigSource::Default => {
                    tracing::debug!("Loading default config");
                    config = ClientConfig::default();
                }
            }
        }

        config.validate()?;
        Ok(config)
    }
}

/// Load from defaults, an optional file and the environment
pub fn load_config(path: Option<&Path>) -> BeaconResult<ClientConfig> {
    let mut loader = ConfigLoader::new().with_defaults();
    if let Some(path) = path {
        loader = loader.with_file(path);
    }
    loader.with_env().load()
}

fn load_from_file(path: &Path) -> BeaconResult<ClientConfig> {
    let content = fs::read_to_string(path).map_err(|e| {
        BeaconError::config_with_context(
            format!("Failed to read config file: {}", e),
            format!("Reading configuration from '{}'", path.display()),
        )
    })?;

    let config = match path.extension().and_then(|s| s.to_str()) {
        Some("toml") => toml::from_str(&content).map_err(|e| {
            BeaconError::config_with_context(
                format!("Failed to parse TOML config: {}", e),
                format!("Deserializing TOML configuration from '{}'", path.display()),
            )
        })?,
        Some("yaml") | Some("yml") => serde_yaml::from_str(&content).map_err(|e| {
            BeaconError::config_with_context(
                format!("Failed to parse YAML config: {}", e),
                format!("Deserializing YAML configuration from '{}'", path.display()),
            )
        })?,
        _ => serde_json::from_str(&content).map_err(|e| {
            BeaconError::config_with_context(
                format!("Failed to parse JSON config: {}", e),
                format!("Deserializing JSON configuration from '{}'", path.display()),
            )
        })?,
    };

    Ok(config)
}

fn apply_overrides<F>(config: &mut ClientConfig, lookup: F) -> BeaconResult<()>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(url) = lookup(ENV_API_BASE_URL) {
        config.api_base_url = url;
    }

    if let Some(dir) = lookup(ENV_STORAGE_DIR) {
        config.storage.dir = Some(PathBuf::from(dir));
    }

    if let Some(level) = lookup(ENV_LOG_LEVEL) {
        config.logging.level = level;
    }

    if let Some(format) = lookup(ENV_LOG_FORMAT) {
        config.logging.format = format;
    }

    if let Some(ttl) = lookup(ENV_CACHE_TTL_MS) {
        config.cache.default_ttl_ms = ttl
            .parse()
            .map_err(|_| BeaconError::config(format!("Invalid {} value: {}", ENV_CACHE_TTL_MS, ttl)))?;
    }

    Ok(())
}
