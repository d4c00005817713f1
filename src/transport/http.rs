//! HTTP transport backed by reqwest.

use super::VeapTransport;
use crate::error::ClientError;
use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode, Url};
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

/// VEAP over HTTP
pub struct HttpTransport {
    client: Client,
    base: Url,
}

impl HttpTransport {
    /// Create a transport for the server at `base_url`.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ClientError> {
        let base = Url::parse(base_url)
            .map_err(|e| ClientError::Config(format!("Invalid server URL {}: {}", base_url, e)))?;
        if base.scheme() != "http" && base.scheme() != "https" {
            return Err(ClientError::Config(format!(
                "Unsupported URL scheme: {}",
                base.scheme()
            )));
        }
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ClientError::Config(format!("Failed to create HTTP client: {}", e)))?;
        Ok(Self { client, base })
    }

    fn url(&self, path: &str) -> Result<Url, ClientError> {
        self.base
            .join(path)
            .map_err(|e| ClientError::transport(format!("Invalid address {}: {}", path, e)))
    }

    async fn decode(response: Response) -> Result<Value, ClientError> {
        let status = response.status();
        let bytes = response
            .bytes()
            .await
            .map_err(|e| ClientError::transport(e.to_string()))?;
        if !status.is_success() {
            return Err(status_error(status, &bytes));
        }
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(Value::Null);
        }
        serde_json::from_slice(&bytes)
            .map_err(|e| ClientError::malformed(format!("Invalid JSON response: {}", e)))
    }
}

/// Maps a non-2xx status to a protocol error, keeping the server's message.
pub(crate) fn status_error(status: StatusCode, body: &[u8]) -> ClientError {
    let message = serde_json::from_slice::<Value>(body)
        .ok()
        .and_then(|v| v.get("message").and_then(Value::as_str).map(str::to_string))
        .or_else(|| {
            let text = String::from_utf8_lossy(body).trim().to_string();
            (!text.is_empty()).then_some(text)
        });
    ClientError::protocol(status.as_u16(), message)
}

#[async_trait]
impl VeapTransport for HttpTransport {
    async fn get(&self, path: &str) -> Result<Value, ClientError> {
        let url = self.url(path)?;
        debug!(%url, "GET");
        let response = self
            .client
            .get(url)
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| ClientError::transport(e.to_string()))?;
        Self::decode(response).await
    }

    async fn put(&self, path: &str, body: Value) -> Result<Value, ClientError> {
        let url = self.url(path)?;
        debug!(%url, "PUT");
        let response = self
            .client
            .put(url)
            .json(&body)
            .send()
            .await
            .map_err(|e| ClientError::transport(e.to_string()))?;
        Self::decode(response).await
    }
}
