//! Credential validation and the renewal seam

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use tracing::warn;

/// Result of a renewal attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenewalOutcome {
    /// A fresh credential is in place
    Renewed,
    /// Renewal was impossible; the session has been cleared
    LoggedOut,
}

/// Source of the bearer credential and the single renewal entrypoint
#[async_trait]
pub trait CredentialProvider: Send + Sync {
    /// The persisted credential, if any
    fn credential(&self) -> Option<String>;

    /// Renew the credential; concurrent callers share one attempt
    async fn renew(&self) -> RenewalOutcome;
}

/// Fixed credential with no way to renew it
#[derive(Debug, Clone, Default)]
pub struct StaticCredentials {
    token: Option<String>,
}

impl StaticCredentials {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: Some(token.into()),
        }
    }

    pub fn none() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CredentialProvider for StaticCredentials {
    fn credential(&self) -> Option<String> {
        self.token.clone()
    }

    async fn renew(&self) -> RenewalOutcome {
        RenewalOutcome::LoggedOut
    }
}

/// Three non-empty base64url segments separated by `.`
pub fn is_well_formed(token: &str) -> bool {
    let segments: Vec<&str> = token.split('.').collect();
    segments.len() == 3
        && segments.iter().all(|segment| {
            let segment = segment.trim_end_matches('=');
            !segment.is_empty()
                && segment
                    .bytes()
                    .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
        })
}

/// Pick the credential for a call
///
/// A well-formed persisted credential wins; a malformed one is ignored in
/// favour of the caller's override.
pub fn resolve(persisted: Option<String>, override_token: Option<&str>) -> Option<String> {
    match persisted {
        Some(token) if is_well_formed(&token) => Some(token),
        Some(_) => {
            warn!("Ignoring malformed persisted credential");
            override_token.map(str::to_string)
        }
        None => override_token.map(str::to_string),
    }
}

/// The `exp` claim (epoch seconds) of a well-formed credential
pub fn expiry_claim(token: &str) -> Option<i64> {
    if !is_well_formed(token) {
        return None;
    }
    let payload = token.split('.').nth(1)?;
    let bytes = URL_SAFE_NO_PAD.decode(payload.trim_end_matches('=')).ok()?;
    let claims: serde_json::Value = serde_json::from_slice(&bytes).ok()?;
    claims.get("exp").and_then(|exp| {
        exp.as_i64()
            .or_else(|| exp.as_f64().map(|secs| secs as i64))
    })
}
