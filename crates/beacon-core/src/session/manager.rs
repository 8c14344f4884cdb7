//! Session manager: login, logout, restore and state

use super::mirror::{MirrorState, SessionMirror};
use super::types::{AuthResponse, Session, SessionState, User};
use crate::cache::{Scope, TieredCache};
use crate::client::response;
use crate::client::{ApiRequest, HttpMethod, HttpTransport, RenewalOutcome};
use crate::clock::SharedClock;
use crate::config::ClientConfig;
use crate::error::{BeaconError, BeaconResult};
use crate::storage::SharedSyncStore;
use futures::future::{BoxFuture, Shared};
use parking_lot::{Mutex, RwLock};
use serde_json::json;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{info, instrument, warn};

/// Owns the credential, its renewal, and the persisted mirror
#[derive(Clone)]
pub struct SessionManager {
    pub(super) inner: Arc<SessionInner>,
}

pub(super) struct SessionInner {
    pub(super) transport: Arc<dyn HttpTransport>,
    pub(super) cache: Arc<TieredCache>,
    pub(super) mirror: SessionMirror,
    pub(super) clock: SharedClock,
    pub(super) login_url: String,
    pub(super) refresh_url: String,
    pub(super) renewal_margin: Duration,
    pub(super) fallback_lifetime: Duration,
    pub(super) session: RwLock<Option<Session>>,
    pub(super) renewal: Mutex<Option<(u64, Shared<BoxFuture<'static, RenewalOutcome>>)>>,
    pub(super) timer: Mutex<Option<(u64, JoinHandle<()>)>>,
    pub(super) next_id: AtomicU64,
    /// Bumped by login and logout; results of calls that straddle a bump are dropped
    pub(super) epoch: AtomicU64,
}

impl std::fmt::Debug for SessionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionManager")
            .field("state", &self.state())
            .finish()
    }
}

impl SessionManager {
    /// Create a manager; call [`restore`](Self::restore) to pick up a
    /// persisted session
    pub fn new(
        config: &ClientConfig,
        transport: Arc<dyn HttpTransport>,
        cache: Arc<TieredCache>,
        local_store: SharedSyncStore,
        clock: SharedClock,
    ) -> Self {
        let base = config.base_url();
        Self {
            inner: Arc::new(SessionInner {
                transport,
                cache,
                mirror: SessionMirror::new(local_store),
                clock,
                login_url: format!("{}/api{}", base, config.session.login_path),
                refresh_url: format!("{}/api{}", base, config.session.refresh_path),
                renewal_margin: config.session.renewal_margin(),
                fallback_lifetime: config.session.fallback_lifetime(),
                session: RwLock::new(None),
                renewal: Mutex::new(None),
                timer: Mutex::new(None),
                next_id: AtomicU64::new(0),
                epoch: AtomicU64::new(0),
            }),
        }
    }

    /// Sign in with email and password
    ///
    /// The cache is purged before the call. On failure the manager stays
    /// unauthenticated and the server's message is surfaced.
    #[instrument(skip(self, password))]
    pub async fn login(&self, email: &str, password: &str) -> BeaconResult<User> {
        let inner = &self.inner;
        let epoch = inner.epoch.fetch_add(1, Ordering::SeqCst) + 1;
        inner.cache.clear_all().await;

        let reply = inner
            .transport
            .send(ApiRequest {
                method: HttpMethod::Post,
                url: inner.login_url.clone(),
                bearer: None,
                body: Some(json!({ "email": email, "password": password })),
            })
            .await?;

        if !reply.is_success() {
            let message = response::error_message(&reply);
            warn!("Login failed with status {}: {}", reply.status, message);
            return Err(if reply.status == 401 {
                BeaconError::unauthorized(message)
            } else {
                BeaconError::api(reply.status, message)
            });
        }

        let auth: AuthResponse = serde_json::from_str(&reply.body).map_err(|e| {
            BeaconError::json_with_context(e.to_string(), "Decoding login response")
        })?;
        let Some(user) = auth.user.clone() else {
            return Err(BeaconError::json_with_context(
                "missing field `user`",
                "Decoding login response",
            ));
        };

        if inner.epoch.load(Ordering::SeqCst) != epoch {
            info!("Session changed while signing in, discarding login result");
            return Err(BeaconError::Aborted);
        }
        let session = inner.session_from(&auth, user.clone());
        inner.install(session);
        info!("Signed in as {}", user.display_name());
        Ok(user)
    }

    /// Clear the session, the mirror and the whole cache; idempotent
    pub async fn logout(&self) {
        self.inner.logout().await;
    }

    /// Pick up a session persisted by an earlier run
    ///
    /// A malformed mirror is erased. A session already past its expiry is
    /// renewed before this returns.
    pub async fn restore(&self) -> BeaconResult<SessionState> {
        let inner = &self.inner;
        let loaded = match inner.mirror.load() {
            Ok(state) => state,
            Err(e) => {
                warn!("Session mirror unavailable: {}", e);
                return Ok(self.state());
            }
        };

        match loaded {
            MirrorState::Empty => {}
            MirrorState::Malformed(reason) => {
                warn!("Discarding persisted session: {}", reason);
                if let Err(e) = inner.mirror.clear() {
                    warn!("Failed to erase session mirror: {}", e);
                }
            }
            MirrorState::Valid(session) => {
                let expired = session.expires_at <= inner.clock.now();
                info!("Restored session for {}", session.user.display_name());
                inner.cache.set_scope(Scope::for_user(&session.user));
                *inner.session.write() = Some(session);
                if expired {
                    self.renew().await;
                } else {
                    inner.arm_timer();
                }
            }
        }

        Ok(self.state())
    }

    pub fn state(&self) -> SessionState {
        let Some((expires_at, user)) = self
            .inner
            .session
            .read()
            .as_ref()
            .map(|s| (s.expires_at, s.user.clone()))
        else {
            return SessionState::Unauthenticated;
        };
        if self.inner.renewal.lock().is_some() {
            return SessionState::Renewing;
        }
        SessionState::Authenticated { expires_at, user }
    }

    pub fn current_user(&self) -> Option<User> {
        self.inner.session.read().as_ref().map(|s| s.user.clone())
    }

    pub fn is_authenticated(&self) -> bool {
        self.inner.session.read().is_some()
    }

    /// Stop the renewal timer without touching the session
    pub fn shutdown(&self) {
        self.inner.cancel_timer();
    }
}

impl SessionInner {
    pub(super) fn session_from(&self, auth: &AuthResponse, user: User) -> Session {
        Session {
            token: auth.token.clone(),
            refresh_token: auth.refresh_token.clone(),
            expires_at: auth.resolve_expiry(self.clock.now(), self.fallback_lifetime),
            user,
        }
    }

    /// Make `session` current: memory, mirror, scope and timer
    pub(super) fn install(self: &Arc<Self>, session: Session) {
        if let Err(e) = self.mirror.save(&session) {
            warn!("Failed to persist session, erasing the stale copy: {}", e);
            if let Err(e) = self.mirror.clear() {
                warn!("Failed to erase session mirror: {}", e);
            }
        }
        self.cache.set_scope(Scope::for_user(&session.user));
        *self.session.write() = Some(session);
        self.arm_timer();
    }

    pub(super) async fn logout(&self) {
        self.epoch.fetch_add(1, Ordering::SeqCst);
        self.cancel_timer();
        let was_signed_in = self.session.write().take().is_some();
        if let Err(e) = self.mirror.clear() {
            warn!("Failed to clear session mirror: {}", e);
        }
        self.cache.clear_all().await;
        self.cache.set_scope(Scope::anonymous());
        if was_signed_in {
            info!("Signed out");
        }
    }
}
