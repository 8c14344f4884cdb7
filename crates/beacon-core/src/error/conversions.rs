//! From trait implementations for BeaconError conversions

use super::types::BeaconError;
use crate::storage::StorageError;

impl From<std::io::Error> for BeaconError {
    fn from(error: std::io::Error) -> Self {
        Self::io(error.to_string())
    }
}

impl From<serde_json::Error> for BeaconError {
    fn from(error: serde_json::Error) -> Self {
        Self::json(error.to_string())
    }
}

impl From<toml::de::Error> for BeaconError {
    fn from(error: toml::de::Error) -> Self {
        Self::config_with_context(error.to_string(), "Parsing TOML configuration")
    }
}

impl From<serde_yaml::Error> for BeaconError {
    fn from(error: serde_yaml::Error) -> Self {
        Self::config_with_context(error.to_string(), "Parsing YAML configuration")
    }
}

impl From<reqwest::Error> for BeaconError {
    fn from(error: reqwest::Error) -> Self {
        let url = error.url().map(|u| u.to_string());
        if let Some(status) = error.status() {
            return Self::api(status.as_u16(), error.to_string());
        }
        if error.is_decode() {
            return Self::json_with_context(error.to_string(), "Decoding response body");
        }
        Self::Network {
            message: error.to_string(),
            url,
        }
    }
}

impl From<StorageError> for BeaconError {
    fn from(error: StorageError) -> Self {
        Self::storage(error.to_string())
    }
}
