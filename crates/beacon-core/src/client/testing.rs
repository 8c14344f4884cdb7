//! In-process transport for unit tests

use super::transport::{ApiRequest, ApiResponse, HttpTransport};
use super::types::HttpMethod;
use crate::error::{BeaconError, BeaconResult};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::time::Duration;

/// Replies from per-route queues; the last reply of a queue repeats
#[derive(Debug, Default)]
pub(crate) struct QueueTransport {
    routes: Mutex<HashMap<(HttpMethod, String), VecDeque<BeaconResult<ApiResponse>>>>,
    sent: Mutex<Vec<ApiRequest>>,
    delay: Mutex<Option<Duration>>,
}

impl QueueTransport {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Queue a reply for `method` on `/api{path}`
    pub(crate) fn reply(&self, method: HttpMethod, path: &str, status: u16, body: &str) {
        self.push(method, path, Ok(ApiResponse::new(status, body)));
    }

    pub(crate) fn fail(&self, method: HttpMethod, path: &str, error: BeaconError) {
        self.push(method, path, Err(error));
    }

    fn push(&self, method: HttpMethod, path: &str, reply: BeaconResult<ApiResponse>) {
        self.routes
            .lock()
            .entry((method, path.to_string()))
            .or_default()
            .push_back(reply);
    }

    pub(crate) fn set_delay(&self, delay: Duration) {
        *self.delay.lock() = Some(delay);
    }

    pub(crate) fn sent(&self) -> Vec<ApiRequest> {
        self.sent.lock().clone()
    }

    pub(crate) fn count(&self, method: HttpMethod, path: &str) -> usize {
        let suffix = format!("/api{}", path);
        self.sent
            .lock()
            .iter()
            .filter(|r| r.method == method && r.url.ends_with(&suffix))
            .count()
    }
}

#[async_trait]
impl HttpTransport for QueueTransport {
    async fn send(&self, request: ApiRequest) -> BeaconResult<ApiResponse> {
        self.sent.lock().push(request.clone());
        let delay = *self.delay.lock();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let path = request
            .url
            .split_once("/api")
            .map(|(_, path)| path.to_string())
            .unwrap_or_default();
        let mut routes = self.routes.lock();
        match routes.get_mut(&(request.method, path)) {
            Some(queue) if queue.len() > 1 => queue.pop_front().unwrap_or_else(|| Ok(ApiResponse::new(404, ""))),
            Some(queue) => queue.front().cloned().unwrap_or_else(|| Ok(ApiResponse::new(404, ""))),
            None => Ok(ApiResponse::new(404, r#"{"error":"Not found"}"#)),
        }
    }
}
