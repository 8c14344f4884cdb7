//! Credential renewal: the single-flight guard and the proactive timer

use super::manager::{SessionInner, SessionManager};
use super::types::AuthResponse;
use crate::client::{ApiRequest, CredentialProvider, HttpMethod, RenewalOutcome};
use async_trait::async_trait;
use futures::FutureExt;
use serde_json::json;
use std::sync::atomic::Ordering;
use std::sync::{Arc, Weak};
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

impl SessionManager {
    /// Renew the credential
    ///
    /// Concurrent callers, reactive or proactive, share one attempt. Without
    /// a renewal credential, or when the attempt fails, the session is
    /// logged out.
    pub async fn renew(&self) -> RenewalOutcome {
        let pending = {
            let mut slot = self.inner.renewal.lock();
            match slot.as_ref() {
                Some((_, pending)) => pending.clone(),
                None => {
                    let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
                    let inner = Arc::clone(&self.inner);
                    let pending = async move {
                        let outcome = inner.perform_renewal().await;
                        let mut slot = inner.renewal.lock();
                        if slot.as_ref().is_some_and(|(current, _)| *current == id) {
                            *slot = None;
                        }
                        outcome
                    }
                    .boxed()
                    .shared();
                    *slot = Some((id, pending.clone()));
                    pending
                }
            }
        };
        pending.await
    }

    /// Expiry of the current credential
    pub fn expires_at(&self) -> Option<chrono::DateTime<chrono::Utc>> {
        self.inner.session.read().as_ref().map(|s| s.expires_at)
    }
}

#[async_trait]
impl CredentialProvider for SessionManager {
    /// The persisted credential, else the in-memory one
    ///
    /// A mirror that could not be updated is erased, so it never outlives
    /// the in-memory session it copies.
    fn credential(&self) -> Option<String> {
        self.inner
            .mirror
            .token()
            .or_else(|| self.inner.session.read().as_ref().map(|s| s.token.clone()))
    }

    async fn renew(&self) -> RenewalOutcome {
        SessionManager::renew(self).await
    }
}

impl SessionInner {
    #[instrument(skip(self))]
    async fn perform_renewal(self: &Arc<Self>) -> RenewalOutcome {
        let epoch = self.epoch.load(Ordering::SeqCst);
        let current = self.session.read().clone();
        let refresh_token = current
            .as_ref()
            .and_then(|s| s.refresh_token.clone())
            .or_else(|| self.mirror.refresh_token());

        let Some(refresh_token) = refresh_token else {
            info!("No renewal credential, signing out");
            self.logout().await;
            return RenewalOutcome::LoggedOut;
        };

        let reply = self
            .transport
            .send(ApiRequest {
                method: HttpMethod::Post,
                url: self.refresh_url.clone(),
                bearer: None,
                body: Some(json!({ "refreshToken": refresh_token })),
            })
            .await;

        if self.epoch.load(Ordering::SeqCst) != epoch {
            info!("Session changed during renewal, discarding the result");
            return RenewalOutcome::LoggedOut;
        }

        let auth = match reply {
            Ok(reply) if reply.is_success() => {
                match serde_json::from_str::<AuthResponse>(&reply.body) {
                    Ok(auth) => auth,
                    Err(e) => {
                        warn!("Unreadable renewal response: {}", e);
                        self.logout().await;
                        return RenewalOutcome::LoggedOut;
                    }
                }
            }
            Ok(reply) => {
                warn!("Renewal rejected with status {}", reply.status);
                self.logout().await;
                return RenewalOutcome::LoggedOut;
            }
            Err(e) => {
                warn!("Renewal failed: {}", e);
                self.logout().await;
                return RenewalOutcome::LoggedOut;
            }
        };

        let Some(user) = auth.user.clone().or_else(|| current.map(|s| s.user)) else {
            warn!("Renewal response carries no user and none is signed in");
            self.logout().await;
            return RenewalOutcome::LoggedOut;
        };

        let mut session = self.session_from(&auth, user);
        if session.refresh_token.is_none() {
            session.refresh_token = Some(refresh_token);
        }
        self.install(session);
        info!("Credential renewed");
        RenewalOutcome::Renewed
    }

    /// Schedule proactive renewal `margin` before the current expiry
    pub(super) fn arm_timer(self: &Arc<Self>) {
        let Some(expires_at) = self.session.read().as_ref().map(|s| s.expires_at) else {
            return;
        };
        let lead = (expires_at - self.clock.now())
            .to_std()
            .unwrap_or(Duration::ZERO);
        let delay = lead.saturating_sub(self.renewal_margin);
        debug!("Renewal timer armed for {:?}", delay);

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let weak: Weak<SessionInner> = Arc::downgrade(self);

        let mut slot = self.timer.lock();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let Some(inner) = weak.upgrade() else {
                return;
            };
            {
                let mut slot = inner.timer.lock();
                if !slot.as_ref().is_some_and(|(current, _)| *current == id) {
                    return;
                }
                *slot = None;
            }
            if inner.session.read().is_some() {
                SessionManager { inner }.renew().await;
            }
        });
        if let Some((_, previous)) = slot.replace((id, handle)) {
            previous.abort();
        }
    }

    pub(super) fn cancel_timer(&self) {
        if let Some((_, handle)) = self.timer.lock().take() {
            handle.abort();
        }
    }
}
