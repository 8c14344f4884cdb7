//! Session manager tests

#[cfg(test)]
mod tests {
    use super::super::*;
    use crate::cache::{CacheOptions, Scope, TieredCache};
    use crate::client::testing::QueueTransport;
    use crate::client::{CredentialProvider, HttpMethod, RenewalOutcome};
    use crate::clock::{Clock, ManualClock, SharedClock};
    use crate::config::ClientConfig;
    use crate::error::BeaconError;
    use crate::storage::{BoundedStore, SyncStore};
    use serde_json::{Value, json};
    use std::sync::Arc;
    use std::time::Duration;
    use tokio_test::{assert_err, assert_ok};

    struct Fixture {
        clock: ManualClock,
        transport: Arc<QueueTransport>,
        store: Arc<BoundedStore>,
        cache: Arc<TieredCache>,
        session: SessionManager,
    }

    fn fixture() -> Fixture {
        fixture_with_quota(1024 * 1024)
    }

    fn fixture_with_quota(quota: usize) -> Fixture {
        let config = ClientConfig::new("http://dash.test");
        let clock = ManualClock::starting_now();
        let shared: SharedClock = Arc::new(clock.clone());
        let transport = Arc::new(QueueTransport::new());
        let store = Arc::new(BoundedStore::in_memory(quota));
        let cache = Arc::new(TieredCache::new(
            &config.cache,
            store.clone(),
            Arc::new(crate::storage::MemoryStore::new()),
            shared.clone(),
        ));
        let session = SessionManager::new(
            &config,
            transport.clone(),
            cache.clone(),
            store.clone(),
            shared,
        );
        Fixture {
            clock,
            transport,
            store,
            cache,
            session,
        }
    }

    fn auth_body(token: &str, expires_in: Duration, clock: &ManualClock) -> String {
        let expires_at = clock.now().timestamp_millis() + expires_in.as_millis() as i64;
        json!({
            "token": token,
            "refreshToken": format!("refresh-{}", token),
            "expiresAt": expires_at,
            "user": {"id": "u1", "email": "ana@example.com", "name": "Ana"}
        })
        .to_string()
    }

    async fn signed_in(f: &Fixture) {
        f.transport.reply(
            HttpMethod::Post,
            "/auth/login",
            200,
            &auth_body("aaa.bbb.ccc", Duration::from_secs(3600), &f.clock),
        );
        f.session.login("ana@example.com", "secret").await.unwrap();
    }

    #[tokio::test]
    async fn test_login_persists_mirror_and_switches_scope() {
        let f = fixture();
        f.cache.set("api:/stale", &json!(1), &CacheOptions::default()).await;
        signed_in(&f).await;

        assert!(f.session.is_authenticated());
        assert_eq!(f.session.current_user().unwrap().id.as_deref(), Some("u1"));
        assert_eq!(f.store.get_item("token").unwrap().as_deref(), Some("aaa.bbb.ccc"));
        assert_eq!(
            f.store.get_item("refreshToken").unwrap().as_deref(),
            Some("refresh-aaa.bbb.ccc")
        );
        assert!(f.store.get_item("tokenExpiresAt").unwrap().is_some());
        assert!(f.store.get_item("user").unwrap().is_some());
        assert_eq!(f.cache.active_scope(), Scope::new("u1"));

        let anonymous = CacheOptions::new().with_scope(Scope::anonymous());
        assert!(f.cache.get::<Value>("api:/stale", &anonymous).is_none());

        let login = &f.transport.sent()[0];
        assert_eq!(login.url, "http://dash.test/api/auth/login");
        assert_eq!(
            login.body,
            Some(json!({"email": "ana@example.com", "password": "secret"}))
        );
        assert!(login.bearer.is_none());
    }

    #[tokio::test]
    async fn test_login_failure_surfaces_server_message() {
        let f = fixture();
        f.transport.reply(
            HttpMethod::Post,
            "/auth/login",
            401,
            r#"{"error":"Invalid email or password"}"#,
        );

        let err = f.session.login("ana@example.com", "wrong").await.unwrap_err();
        assert!(matches!(err, BeaconError::Unauthorized { .. }));
        assert_eq!(err.user_message(), "Invalid email or password");
        assert_eq!(f.session.state(), SessionState::Unauthenticated);
        assert!(f.store.get_item("token").unwrap().is_none());
    }

    #[tokio::test]
    async fn test_expiry_falls_back_to_configured_lifetime() {
        let f = fixture();
        f.transport.reply(
            HttpMethod::Post,
            "/auth/login",
            200,
            r#"{"token":"aaa.bbb.ccc","user":{"email":"ana@example.com"}}"#,
        );
        f.session.login("ana@example.com", "secret").await.unwrap();

        let expected = f.clock.now() + chrono::Duration::minutes(15);
        assert_eq!(f.session.expires_at(), Some(expected));
        assert_eq!(f.cache.active_scope(), Scope::new("ana@example.com"));
    }

    #[tokio::test]
    async fn test_logout_is_idempotent() {
        let f = fixture();
        signed_in(&f).await;
        f.cache.set("api:/me", &json!(1), &CacheOptions::default()).await;

        f.session.logout().await;
        f.session.logout().await;

        assert_eq!(f.session.state(), SessionState::Unauthenticated);
        assert!(f.store.keys().unwrap().is_empty());
        assert!(f.cache.active_scope().is_anonymous());
        assert!(f.session.credential().is_none());
    }

    #[tokio::test]
    async fn test_renew_without_refresh_token_logs_out() {
        let f = fixture();
        f.transport.reply(
            HttpMethod::Post,
            "/auth/login",
            200,
            r#"{"token":"aaa.bbb.ccc","user":{"id":"u1"}}"#,
        );
        f.session.login("ana@example.com", "secret").await.unwrap();

        assert_eq!(f.session.renew().await, RenewalOutcome::LoggedOut);
        assert!(!f.session.is_authenticated());
        assert_eq!(f.transport.count(HttpMethod::Post, "/auth/refresh"), 0);
    }

    #[tokio::test]
    async fn test_renew_success_replaces_credential() {
        let f = fixture();
        signed_in(&f).await;
        f.transport.reply(
            HttpMethod::Post,
            "/auth/refresh",
            200,
            &auth_body("ddd.eee.fff", Duration::from_secs(3600), &f.clock),
        );

        assert_eq!(f.session.renew().await, RenewalOutcome::Renewed);
        assert_eq!(f.session.credential().as_deref(), Some("ddd.eee.fff"));
        assert_eq!(f.store.get_item("token").unwrap().as_deref(), Some("ddd.eee.fff"));

        let refresh = f.transport.sent().pop().unwrap();
        assert_eq!(refresh.body, Some(json!({"refreshToken": "refresh-aaa.bbb.ccc"})));
    }

    #[tokio::test]
    async fn test_renew_failure_logs_out_and_purges_cache() {
        let f = fixture();
        signed_in(&f).await;
        f.cache.set("api:/campaigns", &json!([]), &CacheOptions::default()).await;
        f.transport
            .reply(HttpMethod::Post, "/auth/refresh", 401, r#"{"error":"revoked"}"#);

        assert_eq!(f.session.renew().await, RenewalOutcome::LoggedOut);
        assert_eq!(f.session.state(), SessionState::Unauthenticated);
        assert!(f.store.get_item("token").unwrap().is_none());

        let u1 = CacheOptions::new().with_scope(Scope::new("u1"));
        assert!(f.cache.get::<Value>("api:/campaigns", &u1).is_none());
    }

    #[tokio::test]
    async fn test_renewed_credential_survives_failed_mirror_write() {
        let f = fixture_with_quota(4096);
        signed_in(&f).await;

        // Fill the store so the longer renewed token cannot be written
        let free = f.store.quota_bytes() - f.store.used_bytes();
        assert_ok!(f.store.set_item("filler", &"x".repeat(free - "filler".len())));
        assert_err!(f.store.set_item("token", "aaa.bbb.ccc-longer"));

        f.transport.reply(
            HttpMethod::Post,
            "/auth/refresh",
            200,
            &auth_body("ddd.eee.fff-renewed", Duration::from_secs(3600), &f.clock),
        );

        assert_eq!(f.session.renew().await, RenewalOutcome::Renewed);
        assert_eq!(f.session.credential().as_deref(), Some("ddd.eee.fff-renewed"));
        assert!(f.session.is_authenticated());

        // The superseded token is not left behind for a later restore
        assert_eq!(assert_ok!(f.store.get_item("token")), None);
        assert_eq!(assert_ok!(f.store.get_item("refreshToken")), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_logout_during_renewal_stays_logged_out() {
        let f = fixture();
        signed_in(&f).await;
        f.transport.set_delay(Duration::from_millis(50));
        f.transport.reply(
            HttpMethod::Post,
            "/auth/refresh",
            200,
            &auth_body("ddd.eee.fff", Duration::from_secs(3600), &f.clock),
        );

        let (outcome, ()) = tokio::join!(f.session.renew(), async {
            tokio::time::sleep(Duration::from_millis(10)).await;
            f.session.logout().await;
        });

        assert_eq!(outcome, RenewalOutcome::LoggedOut);
        assert_eq!(f.session.state(), SessionState::Unauthenticated);
        assert!(f.session.credential().is_none());
        assert_eq!(assert_ok!(f.store.get_item("token")), None);
        assert!(f.cache.active_scope().is_anonymous());

        // No timer was armed for the discarded session
        tokio::time::sleep(Duration::from_secs(7200)).await;
        assert_eq!(f.transport.count(HttpMethod::Post, "/auth/refresh"), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_login_during_renewal_keeps_new_session() {
        let f = fixture();
        signed_in(&f).await;
        f.transport.set_delay(Duration::from_millis(50));
        f.transport.reply(
            HttpMethod::Post,
            "/auth/refresh",
            200,
            &auth_body("ddd.eee.fff", Duration::from_secs(3600), &f.clock),
        );

        let (outcome, login) = tokio::join!(f.session.renew(), async {
            tokio::time::sleep(Duration::from_millis(10)).await;
            f.session.login("ana@example.com", "secret").await
        });

        assert_ok!(login);
        assert_eq!(outcome, RenewalOutcome::LoggedOut);
        assert_eq!(f.session.credential().as_deref(), Some("aaa.bbb.ccc"));
        assert_eq!(
            assert_ok!(f.store.get_item("token")).as_deref(),
            Some("aaa.bbb.ccc")
        );
        assert_eq!(f.transport.count(HttpMethod::Post, "/auth/login"), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_renewals_share_one_attempt() {
        let f = fixture();
        signed_in(&f).await;
        f.transport.set_delay(Duration::from_millis(100));
        f.transport.reply(
            HttpMethod::Post,
            "/auth/refresh",
            200,
            &auth_body("ddd.eee.fff", Duration::from_secs(3600), &f.clock),
        );

        let (a, b, c) = tokio::join!(f.session.renew(), f.session.renew(), f.session.renew());

        assert_eq!((a, b, c), (
            RenewalOutcome::Renewed,
            RenewalOutcome::Renewed,
            RenewalOutcome::Renewed
        ));
        assert_eq!(f.transport.count(HttpMethod::Post, "/auth/refresh"), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_state_is_renewing_while_outstanding() {
        let f = fixture();
        signed_in(&f).await;
        f.transport.set_delay(Duration::from_millis(100));
        f.transport.reply(
            HttpMethod::Post,
            "/auth/refresh",
            200,
            &auth_body("ddd.eee.fff", Duration::from_secs(3600), &f.clock),
        );

        let session = f.session.clone();
        let pending = tokio::spawn(async move { session.renew().await });
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(f.session.state(), SessionState::Renewing);

        assert_eq!(pending.await.unwrap(), RenewalOutcome::Renewed);
        assert!(matches!(f.session.state(), SessionState::Authenticated { .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn test_proactive_timer_renews_before_expiry() {
        let f = fixture();
        f.transport.reply(
            HttpMethod::Post,
            "/auth/login",
            200,
            &auth_body("aaa.bbb.ccc", Duration::from_secs(120), &f.clock),
        );
        f.transport.reply(
            HttpMethod::Post,
            "/auth/refresh",
            200,
            &auth_body("ddd.eee.fff", Duration::from_secs(3600), &f.clock),
        );
        f.session.login("ana@example.com", "secret").await.unwrap();

        tokio::time::sleep(Duration::from_secs(59)).await;
        assert_eq!(f.transport.count(HttpMethod::Post, "/auth/refresh"), 0);

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(f.transport.count(HttpMethod::Post, "/auth/refresh"), 1);
        assert_eq!(f.session.credential().as_deref(), Some("ddd.eee.fff"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_logout_cancels_timer() {
        let f = fixture();
        f.transport.reply(
            HttpMethod::Post,
            "/auth/login",
            200,
            &auth_body("aaa.bbb.ccc", Duration::from_secs(120), &f.clock),
        );
        f.session.login("ana@example.com", "secret").await.unwrap();
        f.session.logout().await;

        tokio::time::sleep(Duration::from_secs(300)).await;
        assert_eq!(f.transport.count(HttpMethod::Post, "/auth/refresh"), 0);
    }

    #[tokio::test]
    async fn test_restore_from_mirror() {
        let f = fixture();
        signed_in(&f).await;

        // A second manager over the same store picks the session up
        let other = {
            let config = ClientConfig::new("http://dash.test");
            let clock: SharedClock = Arc::new(f.clock.clone());
            SessionManager::new(
                &config,
                f.transport.clone(),
                f.cache.clone(),
                f.store.clone(),
                clock,
            )
        };
        f.cache.set_scope(Scope::anonymous());

        let state = other.restore().await.unwrap();
        assert!(matches!(state, SessionState::Authenticated { .. }));
        assert_eq!(other.credential().as_deref(), Some("aaa.bbb.ccc"));
        assert_eq!(f.cache.active_scope(), Scope::new("u1"));
    }

    #[tokio::test]
    async fn test_restore_erases_malformed_mirror() {
        let f = fixture();
        f.store.set_item("token", "garbage").unwrap();
        f.store.set_item("user", "{}").unwrap();

        let state = f.session.restore().await.unwrap();

        assert_eq!(state, SessionState::Unauthenticated);
        assert!(f.store.get_item("token").unwrap().is_none());
        assert!(f.store.get_item("user").unwrap().is_none());
    }

    #[tokio::test]
    async fn test_restore_renews_expired_session() {
        let f = fixture();
        f.store.set_item("token", "aaa.bbb.ccc").unwrap();
        f.store.set_item("refreshToken", "r1").unwrap();
        f.store
            .set_item("tokenExpiresAt", &(f.clock.now().timestamp_millis() - 1000).to_string())
            .unwrap();
        f.store.set_item("user", r#"{"id":"u1"}"#).unwrap();
        f.transport.reply(
            HttpMethod::Post,
            "/auth/refresh",
            200,
            &auth_body("ddd.eee.fff", Duration::from_secs(3600), &f.clock),
        );

        let state = f.session.restore().await.unwrap();

        assert!(matches!(state, SessionState::Authenticated { .. }));
        assert_eq!(f.session.credential().as_deref(), Some("ddd.eee.fff"));
        assert_eq!(f.transport.count(HttpMethod::Post, "/auth/refresh"), 1);
    }
}
