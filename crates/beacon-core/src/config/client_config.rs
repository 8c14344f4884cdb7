//! Configuration model

use crate::error::{BeaconError, BeaconResult};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Top-level configuration for one data-access context
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Base URL of the remote API; every call goes to `{base}/api{path}`
    pub api_base_url: String,
    pub timeouts: TimeoutConfig,
    pub cache: CacheConfig,
    pub storage: StorageConfig,
    pub session: SessionConfig,
    pub logging: LoggingConfig,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_base_url: String::new(),
            timeouts: TimeoutConfig::default(),
            cache: CacheConfig::default(),
            storage: StorageConfig::default(),
            session: SessionConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl ClientConfig {
    /// Create a configuration pointing at the given API with defaults elsewhere
    pub fn new(api_base_url: impl Into<String>) -> Self {
        Self {
            api_base_url: api_base_url.into(),
            ..Default::default()
        }
    }

    /// Set the storage directory used by the persistent tiers
    pub fn with_storage_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.storage.dir = Some(dir.into());
        self
    }

    /// Base URL without a trailing slash
    pub fn base_url(&self) -> &str {
        self.api_base_url.trim_end_matches('/')
    }

    /// Validate the configuration
    pub fn validate(&self) -> BeaconResult<()> {
        let base = self.api_base_url.trim();
        if base.is_empty() {
            return Err(BeaconError::config_with_context(
                "api_base_url is required",
                "Set it in the config file or via BEACON_API_BASE_URL",
            ));
        }
        if !base.starts_with("http://") && !base.starts_with("https://") {
            return Err(BeaconError::config(format!(
                "api_base_url must start with http:// or https://, got '{}'",
                base
            )));
        }
        if self.timeouts.request_secs == 0 {
            return Err(BeaconError::config("timeouts.request_secs must be > 0"));
        }
        if self.cache.default_ttl_ms == 0 {
            return Err(BeaconError::config("cache.default_ttl_ms must be > 0"));
        }
        if self.cache.key_prefix.is_empty() || self.cache.key_prefix.contains(':') {
            return Err(BeaconError::config(
                "cache.key_prefix must be non-empty and must not contain ':'",
            ));
        }
        if self.cache.hot_capacity == 0 {
            return Err(BeaconError::config("cache.hot_capacity must be > 0"));
        }
        if self.cache.local_entry_limit_bytes > self.storage.local_quota_bytes {
            return Err(BeaconError::config(
                "cache.local_entry_limit_bytes must not exceed storage.local_quota_bytes",
            ));
        }
        if !self.session.login_path.starts_with('/') || !self.session.refresh_path.starts_with('/')
        {
            return Err(BeaconError::config(
                "session.login_path and session.refresh_path must start with '/'",
            ));
        }
        Ok(())
    }
}

/// HTTP timeouts
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeoutConfig {
    pub connect_secs: u64,
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            connect_secs: 10,
            request_secs: 30,
        }
    }
}

impl TimeoutConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_secs)
    }
}

/// Tiered cache settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Prefix of every persisted cache key
    pub key_prefix: String,
    /// Bumped whenever the cached payload shape changes
    pub namespace_version: u32,
    /// TTL applied when a write does not carry its own
    pub default_ttl_ms: u64,
    /// Serialized entries at or above this size go to the overflow tier
    pub local_entry_limit_bytes: usize,
    /// Maximum number of entries held in the hot tier
    pub hot_capacity: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            key_prefix: "beacon-cache".to_string(),
            namespace_version: 1,
            default_ttl_ms: 5 * 60 * 1000, // 5 minutes
            local_entry_limit_bytes: 100 * 1024,
            hot_capacity: 1000,
        }
    }
}

impl CacheConfig {
    pub fn default_ttl(&self) -> Duration {
        Duration::from_millis(self.default_ttl_ms)
    }
}

/// Persistent tier settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Directory for the persistent tiers; memory-only when absent
    pub dir: Option<PathBuf>,
    /// Hard capacity of the bounded synchronous tier
    pub local_quota_bytes: usize,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            dir: None,
            local_quota_bytes: 5 * 1024 * 1024, // 5 MiB
        }
    }
}

/// Session and renewal settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Renew this long before the credential expires
    pub renewal_margin_secs: u64,
    /// Lifetime assumed when neither the server nor the credential says
    pub fallback_lifetime_secs: u64,
    pub login_path: String,
    pub refresh_path: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            renewal_margin_secs: 60,
            fallback_lifetime_secs: 15 * 60,
            login_path: "/auth/login".to_string(),
            refresh_path: "/auth/refresh".to_string(),
        }
    }
}

impl SessionConfig {
    pub fn renewal_margin(&self) -> Duration {
        Duration::from_secs(self.renewal_margin_secs)
    }

    pub fn fallback_lifetime(&self) -> Duration {
        Duration::from_secs(self.fallback_lifetime_secs)
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
    /// Log format (json, pretty, compact)
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}
