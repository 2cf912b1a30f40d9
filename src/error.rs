//! Error types for backend access and controls reconciliation

use thiserror::Error;

/// Errors from a [`Backend`](crate::backends::Backend) request
#[derive(Error, Debug, Clone, PartialEq)]
pub enum BackendError {
    /// Request aborted after the configured timeout
    #[error("Request timed out after {ms} ms")]
    Timeout { ms: u64 },

    /// Backend unreachable or connection dropped
    #[error("Network error: {0}")]
    Network(String),

    /// Backend answered with an unexpected HTTP status
    #[error("HTTP status {code}: {reason}")]
    Status { code: u16, reason: String },

    /// Body is not valid JSON
    #[error("Invalid JSON: {0}")]
    InvalidJson(String),
}

impl BackendError {
    /// Transient failures a reconnect policy may retry.
    pub fn is_transient(&self) -> bool {
        matches!(self, BackendError::Timeout { .. } | BackendError::Network(_))
    }
}

/// Errors from loading or saving controls mappings
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ControlsError {
    /// Wire data misses required fields or holds impossible values
    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    /// Request failed
    #[error(transparent)]
    Backend(#[from] BackendError),

    /// Axis carries an assigner this client does not know how to send back
    #[error("Axis '{output}' of role '{role}' uses an unknown value assigner and cannot be saved")]
    UnsupportedAssigner { role: String, output: String },

    /// Operation needs a successful load first
    #[error("Controls have not been loaded")]
    NotLoaded,

    /// Active-role scope requested with no role selected
    #[error("No active controller role")]
    NoActiveRole,
}
