/*
[INPUT]:  HTTP configuration (base URL, timeouts)
[OUTPUT]: Configured reqwest client ready for task service calls
[POS]:    HTTP layer - core client implementation
[UPDATE]: When adding connection options or changing client behavior
*/

use crate::http::{AdapterError, Result};
use crate::types::{ApiEnvelope, TaskId};
use reqwest::{Client, Method, RequestBuilder, Url};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::debug;

/// Base URL of a locally running task service
pub const DEFAULT_BASE_URL: &str = "http://localhost:8080/api";

/// HTTP client configuration
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub timeout: Duration,
    pub connect_timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(10),
        }
    }
}

/// HTTP client for the video task service
#[derive(Debug, Clone)]
pub struct TaskServiceClient {
    http_client: Client,
    base_url: Url,
    timeout: Duration,
}

impl TaskServiceClient {
    /// Create a new client against the default local service
    pub fn new() -> Result<Self> {
        Self::with_config(ClientConfig::default())
    }

    /// Create a new client with custom configuration
    pub fn with_config(config: ClientConfig) -> Result<Self> {
        Self::with_config_and_base_url(config, DEFAULT_BASE_URL)
    }

    /// Create a client pointed at an arbitrary service root, e.g. a mock server.
    pub fn with_config_and_base_url(config: ClientConfig, base_url: &str) -> Result<Self> {
        let http_client = Client::builder()
            .timeout(config.timeout)
            .connect_timeout(config.connect_timeout)
            .build()?;

        Ok(Self {
            http_client,
            base_url: normalize_base_url(base_url)?,
            timeout: config.timeout,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Build full URL for a service endpoint, relative to the base path
    fn endpoint_url(&self, endpoint: &str) -> Result<Url> {
        Ok(self.base_url.join(endpoint.trim_start_matches('/'))?)
    }

    /// Build request builder for a service endpoint
    pub(crate) fn request(&self, method: Method, endpoint: &str) -> Result<RequestBuilder> {
        let url = self.endpoint_url(endpoint)?;
        Ok(self.http_client.request(method, url))
    }

    /// Build request builder for `{endpoint}/{task_id}`, escaping the id as one segment
    pub(crate) fn task_request(
        &self,
        method: Method,
        endpoint: &str,
        task_id: &TaskId,
    ) -> Result<RequestBuilder> {
        let mut url = self.endpoint_url(endpoint)?;
        url.path_segments_mut()
            .map_err(|_| AdapterError::Config("base URL cannot be extended".to_string()))?
            .pop_if_empty()
            .push(task_id.as_str());
        Ok(self.http_client.request(method, url))
    }

    /// Send a request and unwrap the `{code, msg, data}` envelope.
    pub(crate) async fn send_envelope<T>(&self, builder: RequestBuilder) -> Result<ApiEnvelope<T>>
    where
        T: DeserializeOwned,
    {
        let response = builder.send().await.map_err(|err| self.map_transport(err))?;
        let status = response.status();
        let url = response.url().path().to_string();
        let body = response.text().await.map_err(|err| self.map_transport(err))?;
        debug!(%status, path = %url, bytes = body.len(), "task service response");

        match serde_json::from_str::<ApiEnvelope<T>>(&body) {
            Ok(envelope) => Ok(envelope),
            Err(_) if !status.is_success() => Err(AdapterError::InvalidResponse(format!(
                "HTTP {status}: {}",
                truncate(&body, 256)
            ))),
            Err(err) => Err(AdapterError::Serialization(err)),
        }
    }

    pub(crate) async fn send_data<T>(&self, builder: RequestBuilder) -> Result<T>
    where
        T: DeserializeOwned,
    {
        self.send_envelope(builder).await?.into_data()
    }

    pub(crate) async fn send_unit(&self, builder: RequestBuilder) -> Result<()> {
        self.send_envelope::<serde_json::Value>(builder)
            .await?
            .into_optional()
            .map(|_| ())
    }

    fn map_transport(&self, err: reqwest::Error) -> AdapterError {
        if err.is_timeout() {
            AdapterError::Timeout {
                duration: self.timeout.as_secs(),
            }
        } else {
            AdapterError::Http(err)
        }
    }
}

/// `Url::join` drops the last path segment unless the base ends with `/`.
fn normalize_base_url(raw: &str) -> Result<Url> {
    let mut url = Url::parse(raw)?;
    if url.cannot_be_a_base() {
        return Err(AdapterError::Config(format!("base URL cannot be a base: {raw}")));
    }
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

fn truncate(body: &str, max: usize) -> &str {
    match body.char_indices().nth(max) {
        Some((idx, _)) => &body[..idx],
        None => body,
    }
}
