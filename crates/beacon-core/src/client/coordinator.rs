//! Request coordinator

use super::credential::{self, CredentialProvider, RenewalOutcome};
use super::inflight::InflightRegistry;
use super::response;
use super::transport::{ApiRequest, HttpTransport};
use super::types::{HttpMethod, RequestOptions};
use crate::cache::{CacheKey, CacheOptions, TieredCache};
use crate::error::{BeaconError, BeaconResult};
use crate::lifecycle::PageLifecycle;
use futures::FutureExt;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, info, instrument};

/// Dispatches API calls with caching, deduplication and 401 recovery
#[derive(Clone)]
pub struct RequestCoordinator {
    inner: Arc<CoordinatorInner>,
}

struct CoordinatorInner {
    base_url: String,
    transport: Arc<dyn HttpTransport>,
    cache: Arc<TieredCache>,
    credentials: Arc<dyn CredentialProvider>,
    inflight: InflightRegistry,
    lifecycle: PageLifecycle,
}

impl std::fmt::Debug for RequestCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestCoordinator")
            .field("base_url", &self.inner.base_url)
            .field("inflight", &self.inner.inflight.len())
            .finish()
    }
}

impl RequestCoordinator {
    /// Create a coordinator for the API at `base_url`
    pub fn new(
        base_url: impl Into<String>,
        transport: Arc<dyn HttpTransport>,
        cache: Arc<TieredCache>,
        credentials: Arc<dyn CredentialProvider>,
        lifecycle: PageLifecycle,
    ) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            inner: Arc::new(CoordinatorInner {
                base_url,
                transport,
                cache,
                credentials,
                inflight: InflightRegistry::new(),
                lifecycle,
            }),
        }
    }

    /// Number of reads currently being fetched
    pub fn inflight_count(&self) -> usize {
        self.inner.inflight.len()
    }

    /// Issue a call to `{base}/api{path}`
    ///
    /// Reads go through the cache and the inflight registry according to
    /// `options.cache_mode`. Successful mutations purge the whole cache.
    #[instrument(skip(self, options), fields(method = %options.method))]
    pub async fn request(&self, path: &str, options: RequestOptions) -> BeaconResult<Value> {
        let inner = &self.inner;
        if inner.lifecycle.is_tearing_down() {
            return Err(BeaconError::Aborted);
        }

        if options.method.is_read() && options.cache_mode.writes_cache() {
            return self.cached_read(path, options).await;
        }

        let method = options.method;
        let result = inner.race_teardown(inner.execute(path, &options)).await;
        if result.is_ok() && !method.is_read() {
            debug!("{} {} succeeded, purging cache", method, path);
            inner.inflight.reset();
            inner.cache.clear_all().await;
        }
        result
    }

    async fn cached_read(&self, path: &str, options: RequestOptions) -> BeaconResult<Value> {
        let inner = &self.inner;
        let logical_key = options
            .cache_key
            .clone()
            .unwrap_or_else(|| CacheKey::for_request(path));
        // Pin the scope so a session change mid-fetch cannot redirect the write
        let cache_options = CacheOptions {
            ttl: options.cache_ttl,
            scope: Some(
                options
                    .scope
                    .clone()
                    .unwrap_or_else(|| inner.cache.active_scope()),
            ),
        };

        if options.cache_mode.reads_cache() {
            if let Some(value) = inner.cache.get_async::<Value>(&logical_key, &cache_options).await {
                debug!("Serving {} from cache", path);
                return Ok(value);
            }
        }

        // Fetches started before a purge are never joined afterwards
        let epoch = inner.cache.epoch();
        let inflight_key = format!(
            "{}#{}",
            inner.cache.storage_key(&logical_key, &cache_options),
            epoch
        );
        let (pending, joined) = inner.inflight.join_or_start(&inflight_key, |generation| {
            let inner = Arc::clone(&self.inner);
            let path = path.to_string();
            let inflight_key = inflight_key.clone();
            async move {
                let result = inner.execute(&path, &options).await;
                if let Ok(value) = &result {
                    if inner.inflight.is_current(&inflight_key, generation) {
                        inner
                            .cache
                            .set_value_in_epoch(&logical_key, value.clone(), &cache_options, epoch)
                            .await;
                    }
                }
                inner.inflight.settle(&inflight_key, generation);
                result
            }
            .boxed()
        });
        if joined {
            debug!("Joining pending fetch for {}", inflight_key);
        }

        inner.race_teardown(pending).await
    }

    /// GET and decode into `T`
    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> BeaconResult<T> {
        self.get_json_with(path, RequestOptions::get()).await
    }

    /// GET with explicit options and decode into `T`
    pub async fn get_json_with<T: DeserializeOwned>(
        &self,
        path: &str,
        options: RequestOptions,
    ) -> BeaconResult<T> {
        let value = self.request(path, options).await?;
        into_typed(path, value)
    }

    pub async fn post_json<B, T>(&self, path: &str, body: &B) -> BeaconResult<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.send_json(HttpMethod::Post, path, body).await
    }

    pub async fn put_json<B, T>(&self, path: &str, body: &B) -> BeaconResult<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.send_json(HttpMethod::Put, path, body).await
    }

    pub async fn patch_json<B, T>(&self, path: &str, body: &B) -> BeaconResult<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.send_json(HttpMethod::Patch, path, body).await
    }

    pub async fn delete(&self, path: &str) -> BeaconResult<Value> {
        self.request(path, RequestOptions::with_method(HttpMethod::Delete))
            .await
    }

    async fn send_json<B, T>(&self, method: HttpMethod, path: &str, body: &B) -> BeaconResult<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let body = serde_json::to_value(body)?;
        let value = self
            .request(path, RequestOptions::with_method(method).body(body))
            .await?;
        into_typed(path, value)
    }
}

fn into_typed<T: DeserializeOwned>(path: &str, value: Value) -> BeaconResult<T> {
    serde_json::from_value(value).map_err(|e| {
        BeaconError::json_with_context(e.to_string(), format!("Decoding response of {}", path))
    })
}

impl CoordinatorInner {
    fn url(&self, path: &str) -> String {
        if path.starts_with('/') {
            format!("{}/api{}", self.base_url, path)
        } else {
            format!("{}/api/{}", self.base_url, path)
        }
    }

    fn resolve_credential(&self, options: &RequestOptions) -> Option<String> {
        credential::resolve(
            self.credentials.credential(),
            options.credential_override.as_deref(),
        )
    }

    /// One call plus at most one retry after renewal
    async fn execute(&self, path: &str, options: &RequestOptions) -> BeaconResult<Value> {
        let mut request = ApiRequest {
            method: options.method,
            url: self.url(path),
            bearer: self.resolve_credential(options),
            body: options.body.clone(),
        };

        let reply = self.transport.send(request.clone()).await?;
        if reply.status != 401 {
            return response::decode(reply);
        }

        info!("{} {} returned 401, renewing credential", options.method, path);
        let outcome = self.credentials.renew().await;
        if outcome == RenewalOutcome::LoggedOut {
            debug!("Renewal failed, retrying {} once anyway", path);
        }

        request.bearer = self.resolve_credential(options);
        let retried = self.transport.send(request).await?;
        if retried.status == 401 {
            return Err(BeaconError::unauthorized(response::error_message(&retried)));
        }
        response::decode(retried)
    }

    /// Resolve to `Aborted` if teardown begins before `call` finishes
    async fn race_teardown<F>(&self, call: F) -> BeaconResult<Value>
    where
        F: Future<Output = BeaconResult<Value>>,
    {
        let result = tokio::select! {
            biased;
            _ = self.lifecycle.cancelled() => Err(BeaconError::Aborted),
            result = call => result,
        };
        match result {
            Err(_) if self.lifecycle.is_tearing_down() => Err(BeaconError::Aborted),
            other => other,
        }
    }
}
