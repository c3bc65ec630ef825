use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};
use std::time::Duration;

use medisync_core::{current_unix_timestamp_ms, read_non_empty, ApiError, KeyValueStore, AUTH_TOKEN_KEY};
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use serde::{de::DeserializeOwned, Serialize};

use crate::types::TransportError;

pub const DEFAULT_API_BASE: &str = "http://localhost:8080/api/v1";
pub const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 30_000;
pub const DEFAULT_CONNECT_TIMEOUT_MS: u64 = 10_000;
pub const REQUEST_ID_HEADER: &str = "x-request-id";

static REQUEST_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Returns a process-unique request id of the form `medisync-{millis}-{n}`.
pub fn new_request_id() -> String {
    let counter = REQUEST_COUNTER.fetch_add(1, Ordering::Relaxed);
    format!("medisync-{}-{counter}", current_unix_timestamp_ms())
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// Public struct `BackendConfig` used across MediSync clients.
pub struct BackendConfig {
    pub api_base: String,
    /// Applied to collection calls only; streams run until the body ends.
    pub request_timeout_ms: u64,
    pub connect_timeout_ms: u64,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_API_BASE.to_string(),
            request_timeout_ms: DEFAULT_REQUEST_TIMEOUT_MS,
            connect_timeout_ms: DEFAULT_CONNECT_TIMEOUT_MS,
        }
    }
}

#[derive(Clone)]
/// Shared HTTP client that attaches the persisted bearer credential to every
/// request and decodes failed responses into [`ApiError`].
pub struct BackendClient {
    client: reqwest::Client,
    config: BackendConfig,
    credentials: Arc<dyn KeyValueStore>,
}

impl std::fmt::Debug for BackendClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackendClient")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl BackendClient {
    pub fn new(
        config: BackendConfig,
        credentials: Arc<dyn KeyValueStore>,
    ) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_millis(config.connect_timeout_ms.max(1)))
            .build()?;
        Ok(Self {
            client,
            config,
            credentials,
        })
    }

    pub fn config(&self) -> &BackendConfig {
        &self.config
    }

    pub fn url(&self, path: &str) -> String {
        let base = self.config.api_base.trim_end_matches('/');
        if path.starts_with('/') {
            format!("{base}{path}")
        } else {
            format!("{base}/{path}")
        }
    }

    /// Starts a request with the bearer credential (read fresh each call) and
    /// a request id attached.
    pub fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let request_id = new_request_id();
        tracing::trace!(%method, path, request_id = %request_id, "backend request");
        let mut builder = self
            .client
            .request(method, self.url(path))
            .header(REQUEST_ID_HEADER, request_id);
        if let Some(token) = read_non_empty(self.credentials.as_ref(), AUTH_TOKEN_KEY) {
            builder = builder.bearer_auth(token);
        }
        builder
    }

    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        self.send_json(self.request(Method::GET, path)).await
    }

    pub async fn post_json<B, T>(&self, path: &str, body: &B) -> Result<T, ApiError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.send_json(self.request(Method::POST, path).json(body))
            .await
    }

    pub async fn patch_json<B, T>(&self, path: &str, body: &B) -> Result<T, ApiError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.send_json(self.request(Method::PATCH, path).json(body))
            .await
    }

    /// Posts a body and ignores whatever the server returns on success.
    pub async fn post_empty<B>(&self, path: &str, body: &B) -> Result<(), ApiError>
    where
        B: Serialize + ?Sized,
    {
        self.send_empty(self.request(Method::POST, path).json(body))
            .await
    }

    /// Posts to an action route that takes no request body.
    pub async fn post_action(&self, path: &str) -> Result<(), ApiError> {
        self.send_empty(self.request(Method::POST, path)).await
    }

    pub async fn post_action_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        self.send_json(self.request(Method::POST, path)).await
    }

    pub async fn delete(&self, path: &str) -> Result<(), ApiError> {
        self.send_empty(self.request(Method::DELETE, path)).await
    }

    async fn send_json<T: DeserializeOwned>(&self, builder: RequestBuilder) -> Result<T, ApiError> {
        let response = self.send_checked(builder).await?;
        let status = response.status();
        let body = response.text().await.map_err(network_error)?;
        serde_json::from_str(&body).map_err(|error| {
            ApiError::new(
                status.as_u16(),
                canonical_reason(status),
                format!("invalid response body: {error}"),
            )
        })
    }

    async fn send_empty(&self, builder: RequestBuilder) -> Result<(), ApiError> {
        self.send_checked(builder).await.map(|_| ())
    }

    async fn send_checked(&self, builder: RequestBuilder) -> Result<Response, ApiError> {
        let builder =
            builder.timeout(Duration::from_millis(self.config.request_timeout_ms.max(1)));
        let response = builder.send().await.map_err(network_error)?;
        ensure_success(response).await
    }
}

/// Passes successful responses through and decodes failures into [`ApiError`].
pub async fn ensure_success(response: Response) -> Result<Response, ApiError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    let error = ApiError::from_body(status.as_u16(), canonical_reason(status), &body);
    tracing::debug!(
        status = status.as_u16(),
        message = %error.message,
        "backend request failed"
    );
    Err(error)
}

fn canonical_reason(status: StatusCode) -> &'static str {
    status.canonical_reason().unwrap_or("")
}

fn network_error(error: reqwest::Error) -> ApiError {
    ApiError::new(0, "network error", error.to_string())
}
