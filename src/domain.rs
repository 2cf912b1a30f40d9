//! Settings domains: one per settings panel.
//!
//! A domain owns the confirmed and staged state of one backend endpoint and
//! knows how to load, save and discard it. [`Session`](crate::session::Session)
//! drives them in batches.

use crate::backends::Backend;
use crate::controller::SaveOutcome;
use crate::error::{BackendError, ControlsError};
use crate::validate::Rejection;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DomainName {
    Controls,
    Radio,
    Trim,
    MaxSurfaceAngles,
    SerialPort,
}

impl DomainName {
    pub const ALL: [DomainName; 5] = [
        DomainName::Controls,
        DomainName::Radio,
        DomainName::Trim,
        DomainName::MaxSurfaceAngles,
        DomainName::SerialPort,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DomainName::Controls => "controls",
            DomainName::Radio => "radio",
            DomainName::Trim => "trim",
            DomainName::MaxSurfaceAngles => "max_surface_angles",
            DomainName::SerialPort => "serial_port",
        }
    }
}

impl fmt::Display for DomainName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum DomainError {
    #[error(transparent)]
    Backend(#[from] BackendError),

    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    #[error(transparent)]
    Controls(#[from] ControlsError),

    #[error(transparent)]
    Rejected(#[from] Rejection),

    #[error("Settings have not been loaded")]
    NotLoaded,
}

impl DomainError {
    pub(crate) fn malformed(e: serde_json::Error) -> Self {
        DomainError::MalformedResponse(e.to_string())
    }
}

/// Load/save contract shared by every settings panel.
#[async_trait]
pub trait ConfigDomain: Send {
    fn name(&self) -> DomainName;

    /// Fetches confirmed state. On failure the previous state is kept.
    async fn load(&mut self, backend: &dyn Backend) -> Result<(), DomainError>;

    /// Sends the resolved state and adopts the backend's echo as confirmed.
    async fn save(&mut self, backend: &dyn Backend) -> Result<SaveOutcome, DomainError>;

    fn is_loaded(&self) -> bool;

    fn has_pending_changes(&self) -> bool;

    /// Drops every staged value.
    fn discard(&mut self);
}
