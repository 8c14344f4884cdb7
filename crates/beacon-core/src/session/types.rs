//! Session data types

use crate::client::credential;
use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::time::Duration;

/// The signed-in principal
///
/// Fields the dashboard does not model are kept in `extra` so the persisted
/// copy round-trips what the server sent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct User {
    #[serde(
        default,
        deserialize_with = "string_or_number",
        skip_serializing_if = "Option::is_none"
    )]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl User {
    /// Best human-readable identifier
    pub fn display_name(&self) -> &str {
        self.name
            .as_deref()
            .or(self.email.as_deref())
            .or(self.id.as_deref())
            .unwrap_or("unknown")
    }
}

fn string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::String(s)) => Some(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

/// Body of a successful login or refresh
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    pub token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    /// Epoch milliseconds or an RFC 3339 timestamp
    #[serde(default)]
    pub expires_at: Option<Value>,
    #[serde(default)]
    pub user: Option<User>,
}

impl AuthResponse {
    /// When the new credential expires
    ///
    /// Prefers the response's `expiresAt`, then the credential's `exp` claim,
    /// then `now + fallback`.
    pub fn resolve_expiry(&self, now: DateTime<Utc>, fallback: Duration) -> DateTime<Utc> {
        self.expires_at
            .as_ref()
            .and_then(parse_timestamp)
            .or_else(|| {
                credential::expiry_claim(&self.token)
                    .and_then(|secs| Utc.timestamp_opt(secs, 0).single())
            })
            .unwrap_or_else(|| {
                now + chrono::Duration::milliseconds(fallback.as_millis() as i64)
            })
    }
}

fn parse_timestamp(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f as i64))
            .and_then(|ms| Utc.timestamp_millis_opt(ms).single()),
        Value::String(s) => DateTime::parse_from_rfc3339(s)
            .map(|dt| dt.with_timezone(&Utc))
            .ok()
            .or_else(|| {
                s.parse::<i64>()
                    .ok()
                    .and_then(|ms| Utc.timestamp_millis_opt(ms).single())
            }),
        _ => None,
    }
}

/// In-memory session
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    pub token: String,
    pub refresh_token: Option<String>,
    pub expires_at: DateTime<Utc>,
    pub user: User,
}

/// Externally visible session state
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SessionState {
    Unauthenticated,
    Authenticated {
        expires_at: DateTime<Utc>,
        user: User,
    },
    Renewing,
}
