use crate::backends::{with_timeout, Backend};
use crate::config::ClientConfig;
use crate::error::BackendError;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};

/// Ground station reached over plain HTTP.
pub struct HttpBackend {
    client: Client,
    base_url: String,
    timeout: Duration,
}

impl HttpBackend {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, BackendError> {
        let client = Client::builder()
            .build()
            .map_err(|e| BackendError::Network(e.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            timeout,
        })
    }

    pub fn from_config(config: &ClientConfig) -> Result<Self, BackendError> {
        Self::new(config.base_url.clone(), config.timeout())
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, endpoint: &str) -> String {
        format!("{}/{}", self.base_url, endpoint.trim_start_matches('/'))
    }

    fn request_error(&self, e: reqwest::Error) -> BackendError {
        if e.is_timeout() {
            BackendError::Timeout {
                ms: u64::try_from(self.timeout.as_millis()).unwrap_or(u64::MAX),
            }
        } else {
            BackendError::Network(e.to_string())
        }
    }
}

#[async_trait]
impl Backend for HttpBackend {
    async fn get_json(&self, endpoint: &str) -> Result<Value, BackendError> {
        let url = self.url(endpoint);
        debug!(%url, "GET");

        with_timeout(self.timeout, async {
            let response = self
                .client
                .get(&url)
                .send()
                .await
                .map_err(|e| self.request_error(e))?;

            let status = response.status();
            if !status.is_success() {
                warn!(%url, %status, "GET failed");
                return Err(BackendError::Status {
                    code: status.as_u16(),
                    reason: status.canonical_reason().unwrap_or("").to_string(),
                });
            }

            response
                .json::<Value>()
                .await
                .map_err(|e| BackendError::InvalidJson(e.to_string()))
        })
        .await
    }

    async fn post_json(&self, endpoint: &str, body: &Value) -> Result<Value, BackendError> {
        let url = self.url(endpoint);
        let bytes = serde_json::to_vec(body).map_err(|e| BackendError::InvalidJson(e.to_string()))?;
        debug!(%url, payload = %body, "POST");

        with_timeout(self.timeout, async {
            // No Content-Type header: the ground station rejects application/json.
            let response = self
                .client
                .post(&url)
                .body(bytes)
                .send()
                .await
                .map_err(|e| self.request_error(e))?;

            let status = response.status();
            if status != StatusCode::OK {
                warn!(%url, %status, "POST failed");
                return Err(BackendError::Status {
                    code: status.as_u16(),
                    reason: status.canonical_reason().unwrap_or("").to_string(),
                });
            }

            response
                .json::<Value>()
                .await
                .map_err(|e| BackendError::InvalidJson(e.to_string()))
        })
        .await
    }
}
