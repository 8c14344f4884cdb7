//! Cache key layout and scopes

use crate::session::User;
use serde::{Deserialize, Serialize};
use std::fmt;

const ANONYMOUS: &str = "anonymous";

/// Partition of the cache owned by one principal
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Scope(String);

impl Scope {
    /// Scope for an arbitrary identifier
    ///
    /// `:` separates key segments, so it is percent-encoded here.
    pub fn new(id: impl AsRef<str>) -> Self {
        let id = id.as_ref().trim();
        if id.is_empty() {
            return Self::anonymous();
        }
        Self(id.replace(':', "%3A"))
    }

    /// The scope used while nobody is signed in
    pub fn anonymous() -> Self {
        Self(ANONYMOUS.to_string())
    }

    /// Scope of a signed-in user: the principal id, falling back to email
    pub fn for_user(user: &User) -> Self {
        match (user.id.as_deref(), user.email.as_deref()) {
            (Some(id), _) if !id.trim().is_empty() => Self::new(id),
            (_, Some(email)) => Self::new(email),
            _ => Self::anonymous(),
        }
    }

    pub fn is_anonymous(&self) -> bool {
        self.0 == ANONYMOUS
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for Scope {
    fn default() -> Self {
        Self::anonymous()
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Fully-qualified key of one cache entry
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub version: u32,
    pub scope: Scope,
    pub logical: String,
}

impl CacheKey {
    pub fn new(version: u32, scope: Scope, logical: impl Into<String>) -> Self {
        Self {
            version,
            scope,
            logical: logical.into(),
        }
    }

    /// Logical key of an API read; `path` includes the query string
    pub fn for_request(path: &str) -> String {
        format!("api:{}", path)
    }

    /// Render as `<prefix>:v<version>:<scope>:<logical>`
    pub fn render(&self, prefix: &str) -> String {
        format!(
            "{}:v{}:{}:{}",
            prefix, self.version, self.scope, self.logical
        )
    }
}

/// Prefix and namespace version shared by every key of one cache
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeySpace {
    prefix: String,
    version: u32,
}

impl KeySpace {
    pub fn new(prefix: impl Into<String>, version: u32) -> Self {
        Self {
            prefix: prefix.into(),
            version,
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn version(&self) -> u32 {
        self.version
    }

    /// Render a logical key under a scope at the current version
    pub fn render(&self, scope: &Scope, logical: &str) -> String {
        CacheKey::new(self.version, scope.clone(), logical).render(&self.prefix)
    }

    /// Whether a stored key belongs to this cache, under any version or scope
    pub fn owns(&self, stored_key: &str) -> bool {
        stored_key
            .strip_prefix(self.prefix.as_str())
            .is_some_and(|rest| rest.starts_with(':'))
    }
}
