//! Serial link to the transmitter bridge.
//!
//! A ground station without a serial bridge answers the `GET` with a non-200
//! status; that loads as "not in use" rather than a failure.

use super::Field;
use crate::backends::Backend;
use crate::controller::SaveOutcome;
use crate::domain::{ConfigDomain, DomainError, DomainName};
use crate::error::BackendError;
use crate::validate::Rejection;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// Baud rates offered as presets. Any positive rate is accepted.
pub const BAUD_RATE_PRESETS: [u32; 14] = [
    110, 300, 600, 1200, 2400, 4800, 9600, 14400, 19200, 38400, 57600, 115200, 128000, 256000,
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SerialPortParameters {
    pub name: String,
    pub baud_rate: u32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct SerialPortResponse {
    serial_port_parameters: Option<SerialPortParameters>,
    #[serde(default)]
    available_ports: Vec<String>,
}

#[derive(Debug, Default)]
pub struct SerialPortDomain {
    endpoint: String,
    loaded: bool,
    in_use: bool,
    available_ports: Vec<String>,
    port: Field<String>,
    baud_rate: Field<u32>,
}

impl SerialPortDomain {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            ..Default::default()
        }
    }

    /// `false` when the ground station runs without a serial bridge.
    pub fn in_use(&self) -> bool {
        self.in_use
    }

    pub fn available_ports(&self) -> &[String] {
        &self.available_ports
    }

    pub fn confirmed(&self) -> Option<SerialPortParameters> {
        Some(SerialPortParameters {
            name: self.port.confirmed()?.clone(),
            baud_rate: *self.baud_rate.confirmed()?,
        })
    }

    pub fn resolved_port(&self) -> Option<&str> {
        self.port.resolved().map(String::as_str)
    }

    pub fn resolved_baud_rate(&self) -> Option<u32> {
        self.baud_rate.resolved().copied()
    }

    /// Stages a port. Only ports the backend reported are accepted.
    pub fn stage_port(&mut self, name: &str) -> Result<(), Rejection> {
        if !self.available_ports.iter().any(|p| p == name) {
            return Err(Rejection::NotWhitelisted {
                output: "serial port".to_string(),
                allowed: self.available_ports.iter().map(|p| vec![p.clone()]).collect(),
            });
        }
        self.port.stage(name.to_string());
        Ok(())
    }

    pub fn stage_baud_rate(&mut self, baud_rate: u32) -> Result<(), Rejection> {
        if baud_rate == 0 {
            return Err(Rejection::OutOfRange {
                field: "baud rate",
                value: 0.0,
                min: 1.0,
                max: f64::from(u32::MAX),
            });
        }
        self.baud_rate.stage(baud_rate);
        Ok(())
    }

    /// Parses a baud rate typed as text. Only plain digits are accepted.
    pub fn stage_baud_rate_text(&mut self, text: &str) -> Result<(), Rejection> {
        let text = text.trim();
        if text.is_empty() || !text.bytes().all(|b| b.is_ascii_digit()) {
            return Err(Rejection::MissingValue("baud rate"));
        }
        let rate = text.parse::<u32>().map_err(|_| Rejection::OutOfRange {
            field: "baud rate",
            value: f64::INFINITY,
            min: 1.0,
            max: f64::from(u32::MAX),
        })?;
        self.stage_baud_rate(rate)
    }

    fn confirm(&mut self, params: Option<SerialPortParameters>) {
        match params {
            Some(p) => {
                self.port.confirm(Some(p.name));
                self.baud_rate.confirm(Some(p.baud_rate));
            }
            None => {
                self.port.confirm(None);
                self.baud_rate.confirm(None);
            }
        }
    }
}

#[async_trait]
impl ConfigDomain for SerialPortDomain {
    fn name(&self) -> DomainName {
        DomainName::SerialPort
    }

    async fn load(&mut self, backend: &dyn Backend) -> Result<(), DomainError> {
        let raw = match backend.get_json(&self.endpoint).await {
            Ok(raw) => raw,
            Err(BackendError::Status { code, .. }) => {
                debug!(code, "serial bridge not in use");
                self.in_use = false;
                self.loaded = true;
                return Ok(());
            }
            Err(e) => return Err(e.into()),
        };
        let resp: SerialPortResponse =
            serde_json::from_value(raw).map_err(DomainError::malformed)?;

        self.available_ports = resp.available_ports;
        self.confirm(resp.serial_port_parameters);
        self.in_use = true;
        self.loaded = true;
        Ok(())
    }

    async fn save(&mut self, backend: &dyn Backend) -> Result<SaveOutcome, DomainError> {
        if !self.loaded {
            return Err(DomainError::NotLoaded);
        }
        if !self.has_pending_changes() {
            return Ok(SaveOutcome::NoChanges);
        }
        let payload = SerialPortParameters {
            name: self
                .resolved_port()
                .ok_or(Rejection::MissingValue("serial port"))?
                .to_string(),
            baud_rate: self
                .resolved_baud_rate()
                .ok_or(Rejection::MissingValue("baud rate"))?,
        };
        debug!(?payload, "serial port payload");

        let body = serde_json::to_value(&payload).map_err(DomainError::malformed)?;
        let echo = backend
            .post_json(&self.endpoint, &body)
            .await
            .inspect_err(|e| warn!(error = %e, "serial port save failed"))?;
        let echo: Option<SerialPortParameters> =
            serde_json::from_value(echo).map_err(DomainError::malformed)?;

        self.confirm(echo);
        self.discard();
        info!("serial port saved");
        Ok(SaveOutcome::Saved)
    }

    fn is_loaded(&self) -> bool {
        self.loaded
    }

    fn has_pending_changes(&self) -> bool {
        self.port.is_pending() || self.baud_rate.is_pending()
    }

    fn discard(&mut self) {
        self.port.discard();
        self.baud_rate.discard();
    }
}
