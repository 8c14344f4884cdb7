//! Request options

use crate::cache::Scope;
use crate::error::BeaconError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// HTTP methods the API accepts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    #[default]
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Delete => "DELETE",
        }
    }

    /// Reads are cacheable; everything else mutates server state
    pub fn is_read(&self) -> bool {
        matches!(self, HttpMethod::Get)
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HttpMethod {
    type Err = BeaconError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "GET" => Ok(HttpMethod::Get),
            "POST" => Ok(HttpMethod::Post),
            "PUT" => Ok(HttpMethod::Put),
            "PATCH" => Ok(HttpMethod::Patch),
            "DELETE" => Ok(HttpMethod::Delete),
            other => Err(BeaconError::invalid_field(
                "method",
                format!("Unsupported HTTP method: {}", other),
            )),
        }
    }
}

/// How a read interacts with the cache
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CacheMode {
    /// Serve from cache when fresh, otherwise fetch and store
    #[default]
    Default,
    /// Skip the cache read, still store the result
    Reload,
    /// Same as [`CacheMode::Reload`]
    Bypass,
    /// Neither read nor write the cache, and never share the call
    NoStore,
}

impl CacheMode {
    pub fn reads_cache(&self) -> bool {
        matches!(self, CacheMode::Default)
    }

    pub fn writes_cache(&self) -> bool {
        !matches!(self, CacheMode::NoStore)
    }
}

impl FromStr for CacheMode {
    type Err = BeaconError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "default" => Ok(CacheMode::Default),
            "reload" => Ok(CacheMode::Reload),
            "bypass" => Ok(CacheMode::Bypass),
            "no-store" => Ok(CacheMode::NoStore),
            other => Err(BeaconError::invalid_field(
                "cache_mode",
                format!("Unknown cache mode: {}", other),
            )),
        }
    }
}

/// Per-call options of [`RequestCoordinator::request`](super::RequestCoordinator::request)
#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    pub method: HttpMethod,
    pub body: Option<serde_json::Value>,
    /// Used when no well-formed persisted credential exists
    pub credential_override: Option<String>,
    pub cache_mode: CacheMode,
    /// TTL for the stored entry; on reads it can only shorten freshness
    pub cache_ttl: Option<Duration>,
    /// Logical cache key; defaults to `api:<path>`
    pub cache_key: Option<String>,
    /// Scope to use instead of the active one
    pub scope: Option<Scope>,
}

impl RequestOptions {
    pub fn get() -> Self {
        Self::default()
    }

    pub fn with_method(method: HttpMethod) -> Self {
        Self {
            method,
            ..Default::default()
        }
    }

    pub fn body(mut self, body: serde_json::Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn cache_mode(mut self, mode: CacheMode) -> Self {
        self.cache_mode = mode;
        self
    }

    pub fn cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = Some(ttl);
        self
    }

    pub fn cache_key(mut self, key: impl Into<String>) -> Self {
        self.cache_key = Some(key.into());
        self
    }

    pub fn scope(mut self, scope: Scope) -> Self {
        self.scope = Some(scope);
        self
    }

    pub fn credential(mut self, credential: impl Into<String>) -> Self {
        self.credential_override = Some(credential.into());
        self
    }
}
