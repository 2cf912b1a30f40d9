//! Backend connections for `groundlink`.
//!
//! A [`Backend`] answers JSON requests against endpoint paths relative to the
//! ground station's base URL. Every call either completes or fails; a slow
//! or unreachable device surfaces as [`BackendError::Timeout`], never a hang.
//!
//! # Feature flags
//! - **`http`**: enables [`HttpBackend`](http::HttpBackend) on top of `reqwest` (default).
//!
//! [`MemoryBackend`](memory::MemoryBackend) is always available for offline use and tests.

use crate::error::BackendError;
use async_trait::async_trait;
use serde_json::Value;
use std::future::Future;
use std::time::Duration;

#[cfg(feature = "http")]
#[cfg_attr(docsrs, doc(cfg(feature = "http")))]
pub mod http;
pub mod memory;

/// Request/response JSON access to the ground station.
#[async_trait]
pub trait Backend: Send + Sync {
    /// `GET endpoint`, returning the parsed body.
    async fn get_json(&self, endpoint: &str) -> Result<Value, BackendError>;

    /// `POST endpoint` with `body`, returning the parsed response body.
    async fn post_json(&self, endpoint: &str, body: &Value) -> Result<Value, BackendError>;
}

/// Runs `request`, failing with [`BackendError::Timeout`] once `limit` elapses.
pub async fn with_timeout<T, F>(limit: Duration, request: F) -> Result<T, BackendError>
where
    F: Future<Output = Result<T, BackendError>>,
{
    match tokio::time::timeout(limit, request).await {
        Ok(result) => result,
        Err(_) => Err(BackendError::Timeout {
            ms: u64::try_from(limit.as_millis()).unwrap_or(u64::MAX),
        }),
    }
}
