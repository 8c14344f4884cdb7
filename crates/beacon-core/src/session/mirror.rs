//! Persisted copy of the session

use super::types::{Session, User};
use crate::client::credential;
use crate::storage::{SharedSyncStore, StorageError};
use chrono::{TimeZone, Utc};

const TOKEN_KEY: &str = "token";
const REFRESH_TOKEN_KEY: &str = "refreshToken";
const EXPIRES_AT_KEY: &str = "tokenExpiresAt";
const USER_KEY: &str = "user";

/// What the mirror currently holds
#[derive(Debug, Clone, PartialEq)]
pub enum MirrorState {
    Empty,
    Valid(Session),
    /// Something is stored but cannot be turned back into a session
    Malformed(String),
}

/// Session fields persisted under fixed, unscoped keys of the synchronous store
#[derive(Debug, Clone)]
pub struct SessionMirror {
    store: SharedSyncStore,
}

impl SessionMirror {
    pub fn new(store: SharedSyncStore) -> Self {
        Self { store }
    }

    /// The persisted credential, if readable
    pub fn token(&self) -> Option<String> {
        self.store.get_item(TOKEN_KEY).ok().flatten()
    }

    pub fn refresh_token(&self) -> Option<String> {
        self.store.get_item(REFRESH_TOKEN_KEY).ok().flatten()
    }

    /// Persist every field of `session`
    pub fn save(&self, session: &Session) -> Result<(), StorageError> {
        let user = serde_json::to_string(&session.user)
            .map_err(|e| StorageError::Io(format!("Failed to serialize user: {}", e)))?;

        self.store.set_item(TOKEN_KEY, &session.token)?;
        match &session.refresh_token {
            Some(refresh) => self.store.set_item(REFRESH_TOKEN_KEY, refresh)?,
            None => self.store.remove_item(REFRESH_TOKEN_KEY)?,
        }
        self.store.set_item(
            EXPIRES_AT_KEY,
            &session.expires_at.timestamp_millis().to_string(),
        )?;
        self.store.set_item(USER_KEY, &user)?;
        Ok(())
    }

    /// Remove every persisted field; attempts all keys even if one fails
    pub fn clear(&self) -> Result<(), StorageError> {
        let mut first_error = None;
        for key in [TOKEN_KEY, REFRESH_TOKEN_KEY, EXPIRES_AT_KEY, USER_KEY] {
            if let Err(e) = self.store.remove_item(key) {
                first_error.get_or_insert(e);
            }
        }
        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// Read the mirror back
    ///
    /// A missing expiry falls back to the credential's `exp` claim, then to
    /// "already expired" so the caller renews straight away.
    pub fn load(&self) -> Result<MirrorState, StorageError> {
        let Some(token) = self.store.get_item(TOKEN_KEY)? else {
            return Ok(MirrorState::Empty);
        };
        if !credential::is_well_formed(&token) {
            return Ok(MirrorState::Malformed("persisted token is malformed".into()));
        }

        let Some(raw_user) = self.store.get_item(USER_KEY)? else {
            return Ok(MirrorState::Malformed("persisted user is missing".into()));
        };
        let user: User = match serde_json::from_str(&raw_user) {
            Ok(user) => user,
            Err(e) => {
                return Ok(MirrorState::Malformed(format!(
                    "persisted user is unreadable: {}",
                    e
                )));
            }
        };

        let expires_at = self
            .store
            .get_item(EXPIRES_AT_KEY)?
            .and_then(|ms| ms.parse::<i64>().ok())
            .and_then(|ms| Utc.timestamp_millis_opt(ms).single())
            .or_else(|| {
                credential::expiry_claim(&token)
                    .and_then(|secs| Utc.timestamp_opt(secs, 0).single())
            })
            .unwrap_or_default();

        Ok(MirrorState::Valid(Session {
            token,
            refresh_token: self.store.get_item(REFRESH_TOKEN_KEY)?,
            expires_at,
            user,
        }))
    }
}
