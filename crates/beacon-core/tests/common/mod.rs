//! Shared helpers for beacon-core integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use beacon_core::client::{ApiRequest, ApiResponse, HttpTransport};
use beacon_core::clock::ManualClock;
use beacon_core::{BeaconResult, ClientConfig, DataLayer, HttpMethod};
use parking_lot::Mutex;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

pub const BASE_URL: &str = "http://dash.test";
pub const FIRST_TOKEN: &str = "eyJhbGciOiJIUzI1NiJ9.Zmlyc3Q.c2lnMQ";
pub const RENEWED_TOKEN: &str = "eyJhbGciOiJIUzI1NiJ9.cmVuZXdlZA.c2lnMg";

type Handler = Box<dyn Fn(&ApiRequest) -> BeaconResult<ApiResponse> + Send + Sync>;

struct Route {
    method: HttpMethod,
    path: String,
    handler: Handler,
}

/// Transport answering from registered handlers
///
/// Routes match on method and the path after `/api`; the most recently
/// registered match wins. Unmatched requests get a 404.
#[derive(Default)]
pub struct ScriptedTransport {
    routes: Mutex<Vec<Route>>,
    sent: Mutex<Vec<ApiRequest>>,
    latency: Mutex<Duration>,
}

impl std::fmt::Debug for ScriptedTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScriptedTransport")
            .field("routes", &self.routes.lock().len())
            .field("sent", &self.sent.lock().len())
            .finish()
    }
}

impl ScriptedTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn on<F>(&self, method: HttpMethod, path: &str, handler: F)
    where
        F: Fn(&ApiRequest) -> BeaconResult<ApiResponse> + Send + Sync + 'static,
    {
        self.routes.lock().push(Route {
            method,
            path: path.to_string(),
            handler: Box::new(handler),
        });
    }

    /// Always answer `status` with `body`
    pub fn respond(&self, method: HttpMethod, path: &str, status: u16, body: serde_json::Value) {
        let body = if body.is_null() {
            String::new()
        } else {
            body.to_string()
        };
        self.on(method, path, move |_| Ok(ApiResponse::new(status, body.clone())));
    }

    /// Delay every response by `latency`
    pub fn set_latency(&self, latency: Duration) {
        *self.latency.lock() = latency;
    }

    pub fn sent(&self) -> Vec<ApiRequest> {
        self.sent.lock().clone()
    }

    pub fn calls(&self, method: HttpMethod, path: &str) -> usize {
        self.sent
            .lock()
            .iter()
            .filter(|r| r.method == method && api_path(&r.url) == path)
            .count()
    }
}

fn api_path(url: &str) -> String {
    url.strip_prefix(BASE_URL)
        .and_then(|rest| rest.strip_prefix("/api"))
        .unwrap_or(url)
        .to_string()
}

#[async_trait]
impl HttpTransport for ScriptedTransport {
    async fn send(&self, request: ApiRequest) -> BeaconResult<ApiResponse> {
        self.sent.lock().push(request.clone());
        let latency = *self.latency.lock();
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }

        let path = api_path(&request.url);
        let routes = self.routes.lock();
        match routes
            .iter()
            .rev()
            .find(|r| r.method == request.method && r.path == path)
        {
            Some(route) => (route.handler)(&request),
            None => Ok(ApiResponse::new(404, json!({"error": "Not found"}).to_string())),
        }
    }
}

/// Login/refresh body for `token`, valid for `lifetime` from `clock`
pub fn auth_body(token: &str, refresh: &str, lifetime: Duration, clock: &ManualClock) -> serde_json::Value {
    use beacon_core::Clock;
    json!({
        "token": token,
        "refreshToken": refresh,
        "expiresAt": clock.now().timestamp_millis() + lifetime.as_millis() as i64,
        "user": {"id": "user-a", "email": "ana@example.com", "name": "Ana", "role": "manager"}
    })
}

pub struct Harness {
    pub transport: Arc<ScriptedTransport>,
    pub clock: ManualClock,
    pub layer: DataLayer,
}

/// A data layer over a scripted transport, memory-only storage and a manual clock
pub async fn harness() -> Harness {
    harness_with(ClientConfig::new(BASE_URL)).await
}

pub async fn harness_with(config: ClientConfig) -> Harness {
    let transport = ScriptedTransport::new();
    let clock = ManualClock::starting_now();
    let layer = DataLayer::builder(config)
        .transport(transport.clone())
        .clock(Arc::new(clock.clone()))
        .build()
        .await
        .unwrap();
    Harness {
        transport,
        clock,
        layer,
    }
}

/// Script a successful login and sign in
pub async fn sign_in(h: &Harness) {
    let body = auth_body(FIRST_TOKEN, "refresh-1", Duration::from_secs(3600), &h.clock);
    h.transport
        .respond(HttpMethod::Post, "/auth/login", 200, body);
    h.layer
        .session()
        .login("ana@example.com", "secret")
        .await
        .unwrap();
}
