//! Client configuration
//!
//! Loaded from TOML. Every field has a default, so an empty file (or no file)
//! talks to `http://localhost:8080` with a 5 s request timeout.
//!
//! ```toml
//! base_url = "http://192.168.4.1:8080"
//! timeout_ms = 3000
//!
//! [limits.gain]
//! min = 0.01
//! max = 50.0
//!
//! [controls]
//! save_scope = "active-role"
//! ```

use crate::catalog::{Bounds, Limits};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Top-level configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Ground station base URL
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Per-request timeout in milliseconds
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    #[serde(default)]
    pub endpoints: Endpoints,

    /// Axis parameter limits used when validating edits
    #[serde(default)]
    pub limits: Limits,

    #[serde(default)]
    pub controls: ControlsConfig,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_ms: default_timeout_ms(),
            endpoints: Endpoints::default(),
            limits: Limits::default(),
            controls: ControlsConfig::default(),
        }
    }
}

fn default_base_url() -> String {
    "http://localhost:8080".to_string()
}

fn default_timeout_ms() -> u64 {
    5000
}

/// Endpoint paths relative to `base_url`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Endpoints {
    #[serde(default = "default_controls")]
    pub controls: String,
    #[serde(default = "default_radio")]
    pub radio: String,
    #[serde(default = "default_trim")]
    pub trim: String,
    #[serde(default = "default_max_surface_angles")]
    pub max_surface_angles: String,
    #[serde(default = "default_serial_port")]
    pub serial_port: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            controls: default_controls(),
            radio: default_radio(),
            trim: default_trim(),
            max_surface_angles: default_max_surface_angles(),
            serial_port: default_serial_port(),
        }
    }
}

fn default_controls() -> String { "/settings/control/".to_string() }
fn default_radio() -> String { "/settings/radio/".to_string() }
fn default_trim() -> String { "/settings/trim/".to_string() }
fn default_max_surface_angles() -> String { "/settings/maxsurfaceangles/".to_string() }
fn default_serial_port() -> String { "/settings/serialport/".to_string() }

/// Which roles the controls domain saves when asked to save without a scope
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SaveScopeSetting {
    #[default]
    AllRoles,
    ActiveRole,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControlsConfig {
    #[serde(default)]
    pub save_scope: SaveScopeSetting,
}

impl ClientConfig {
    /// Parses and validates a TOML document.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: ClientConfig = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.base_url.starts_with("http://") || self.base_url.starts_with("https://")) {
            return Err(ConfigError::Invalid(format!(
                "base_url must start with http:// or https://, got '{}'",
                self.base_url
            )));
        }
        if self.timeout_ms == 0 {
            return Err(ConfigError::Invalid("timeout_ms must be positive".to_string()));
        }
        check_bounds("limits.deadzone", &self.limits.deadzone)?;
        check_bounds("limits.gain", &self.limits.gain)?;
        Ok(())
    }
}

fn check_bounds(name: &str, bounds: &Bounds) -> Result<(), ConfigError> {
    if !bounds.min.is_finite() || !bounds.max.is_finite() || bounds.min > bounds.max {
        return Err(ConfigError::Invalid(format!(
            "{name} must be finite with min <= max, got [{}, {}]",
            bounds.min, bounds.max
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_document_uses_defaults() {
        let config = ClientConfig::from_toml_str("").unwrap();
        assert_eq!(config, ClientConfig::default());
        assert_eq!(config.timeout(), Duration::from_secs(5));
        assert_eq!(config.endpoints.controls, "/settings/control/");
        assert_eq!(config.limits.gain, Bounds::new(0.01, 100.0));
        assert_eq!(config.controls.save_scope, SaveScopeSetting::AllRoles);
    }

    #[test]
    fn test_partial_document_overrides() {
        let config = ClientConfig::from_toml_str(
            r#"
            base_url = "http://192.168.4.1:8080"
            timeout_ms = 2500

            [endpoints]
            radio = "/v2/radio/"

            [limits.gain]
            min = 0.1
            max = 10.0

            [controls]
            save_scope = "active-role"
            "#,
        )
        .unwrap();

        assert_eq!(config.base_url, "http://192.168.4.1:8080");
        assert_eq!(config.timeout_ms, 2500);
        assert_eq!(config.endpoints.radio, "/v2/radio/");
        assert_eq!(config.endpoints.trim, "/settings/trim/");
        assert_eq!(config.limits.gain, Bounds::new(0.1, 10.0));
        assert_eq!(config.limits.deadzone, Bounds::new(0.0, 1.0));
        assert_eq!(config.controls.save_scope, SaveScopeSetting::ActiveRole);
    }

    #[test]
    fn test_inverted_limits_rejected() {
        let err = ClientConfig::from_toml_str(
            r#"
            [limits.deadzone]
            min = 1.0
            max = 0.0
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_bad_base_url_rejected() {
        let err = ClientConfig::from_toml_str(r#"base_url = "localhost:8080""#).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_syntax_error_is_parse_error() {
        let err = ClientConfig::from_toml_str("base_url = ").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }
}
