//! groundlink: control-panel core for an RC/UAV ground station.
//!
//! Keeps the panel's edits (staged) apart from what the ground station last
//! confirmed, validates every edit against the capability catalog, and
//! reconciles saves with the backend's echo. Controls mappings are the main
//! domain; radio, trim, surface angle and serial port settings follow the same
//! load/stage/save cycle through [`ConfigDomain`].
//!
//! Start with [`Session`], or drive a [`ControlsController`] directly.

#![cfg_attr(docsrs, feature(doc_cfg))]

pub mod backends;
pub mod binding;
pub mod catalog;
pub mod config;
pub mod controller;
pub mod convert;
pub mod domain;
pub mod domains;
pub mod error;
pub mod filtered_listener;
pub mod logger;
pub mod notify;
pub mod resolver;
pub mod session;
pub mod staging;
pub mod validate;
pub mod wire;

pub use backends::memory::MemoryBackend;
pub use backends::Backend;
#[cfg(feature = "http")]
pub use backends::http::HttpBackend;
pub use binding::*;
pub use catalog::{Bounds, Catalog, Limits};
pub use config::{ClientConfig, ConfigError};
pub use controller::*;
pub use domain::{ConfigDomain, DomainError, DomainName};
pub use error::{BackendError, ControlsError};
pub use filtered_listener::FilteredListener;
pub use logger::LogListener;
pub use notify::*;
pub use resolver::{MappingRow, Resolver};
pub use session::Session;
pub use staging::StagingStore;
pub use validate::{Rejection, Validator};
