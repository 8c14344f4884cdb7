//! Configuration for the data-access layer
//!
//! Configuration is assembled from defaults, an optional file (JSON, TOML or
//! YAML) and `BEACON_*` environment variables, in that order.

mod client_config;
mod loader;

pub use client_config::{
    CacheConfig, ClientConfig, LoggingConfig, SessionConfig, StorageConfig, TimeoutConfig,
};
pub use loader::{ConfigLoader, ConfigSource, load_config};
