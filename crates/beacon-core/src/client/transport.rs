//! HTTP transport seam

use super::types::HttpMethod;
use crate::config::TimeoutConfig;
use crate::error::{BeaconError, BeaconResult};
use async_trait::async_trait;
use reqwest::Client;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderValue};
use tracing::debug;

/// A fully-resolved outgoing request
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub method: HttpMethod,
    pub url: String,
    /// Sent as `Authorization: Bearer <credential>`
    pub bearer: Option<String>,
    pub body: Option<serde_json::Value>,
}

/// Raw response: status code and body text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiResponse {
    pub status: u16,
    pub body: String,
}

impl ApiResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Sends requests to the remote API
///
/// Only transport failures are errors; every HTTP status comes back as an
/// [`ApiResponse`].
#[async_trait]
pub trait HttpTransport: Send + Sync + std::fmt::Debug {
    async fn send(&self, request: ApiRequest) -> BeaconResult<ApiResponse>;
}

/// [`HttpTransport`] backed by `reqwest`
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    /// Create a transport with the configured timeouts
    pub fn new(timeouts: &TimeoutConfig) -> BeaconResult<Self> {
        let client = Client::builder()
            .connect_timeout(timeouts.connect_timeout())
            .timeout(timeouts.request_timeout())
            .build()
            .map_err(|e| {
                BeaconError::config_with_context(
                    format!("Failed to create HTTP client: {}", e),
                    "Building the reqwest client",
                )
            })?;
        Ok(Self { client })
    }

    /// Wrap an existing client
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn send(&self, request: ApiRequest) -> BeaconResult<ApiResponse> {
        let method = match request.method {
            HttpMethod::Get => reqwest::Method::GET,
            HttpMethod::Post => reqwest::Method::POST,
            HttpMethod::Put => reqwest::Method::PUT,
            HttpMethod::Patch => reqwest::Method::PATCH,
            HttpMethod::Delete => reqwest::Method::DELETE,
        };

        let mut builder = self
            .client
            .request(method, &request.url)
            .header(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        if let Some(bearer) = &request.bearer {
            let value = HeaderValue::from_str(&format!("Bearer {}", bearer))
                .map_err(|_| BeaconError::invalid_field("credential", "Credential is not a valid header value"))?;
            builder = builder.header(AUTHORIZATION, value);
        }
        if let Some(body) = &request.body {
            builder = builder.body(body.to_string());
        }

        let response = builder
            .send()
            .await
            .map_err(|e| BeaconError::network_at(e.to_string(), request.url.clone()))?;
        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| BeaconError::network_at(e.to_string(), request.url.clone()))?;

        debug!("{} {} -> {}", request.method, request.url, status);
        Ok(ApiResponse { status, body })
    }
}
