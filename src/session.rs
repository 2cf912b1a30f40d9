//! One connection to a ground station and every settings domain behind it.
//!
//! ```no_run
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! use groundlink::{ClientConfig, DomainName, LogListener, NoticeFilter, Session};
//!
//! let config = ClientConfig::load("groundlink.toml")?;
//! let mut session = Session::connect(&config)?;
//! session.notices_mut().add_listener(LogListener::new(), NoticeFilter::All, None);
//!
//! let loaded = session.load(None).await;
//! if !loaded[&DomainName::Controls] {
//!     return Ok(());
//! }
//! # Ok(())
//! # }
//! ```

use crate::backends::Backend;
use crate::binding::MappingKind;
use crate::config::ClientConfig;
use crate::controller::{ControlsController, RawEdit, SaveOutcome, SaveScope};
use crate::domain::{ConfigDomain, DomainError, DomainName};
use crate::domains::{RadioDomain, SerialPortDomain, SurfaceDomain};
use crate::error::ControlsError;
use crate::notify::{Notice, NoticeBus};
use crate::validate::Rejection;
use std::collections::BTreeMap;
use tracing::debug;

const SAVED: &str = "Successfully updated.";

pub struct Session {
    backend: Box<dyn Backend>,
    notices: NoticeBus,
    controls: ControlsController,
    radio: RadioDomain,
    trim: SurfaceDomain,
    max_surface_angles: SurfaceDomain,
    serial_port: SerialPortDomain,
}

impl Session {
    pub fn new(config: &ClientConfig, backend: impl Backend + 'static) -> Self {
        Self::with_backend(config, Box::new(backend))
    }

    pub fn with_backend(config: &ClientConfig, backend: Box<dyn Backend>) -> Self {
        let endpoints = &config.endpoints;
        Self {
            backend,
            notices: NoticeBus::new(),
            controls: ControlsController::from_config(config),
            radio: RadioDomain::new(endpoints.radio.clone()),
            trim: SurfaceDomain::trim(endpoints.trim.clone()),
            max_surface_angles: SurfaceDomain::max_angles(endpoints.max_surface_angles.clone()),
            serial_port: SerialPortDomain::new(endpoints.serial_port.clone()),
        }
    }

    /// Session over HTTP to `config.base_url`.
    #[cfg(feature = "http")]
    #[cfg_attr(docsrs, doc(cfg(feature = "http")))]
    pub fn connect(config: &ClientConfig) -> Result<Self, crate::error::BackendError> {
        let backend = crate::backends::http::HttpBackend::from_config(config)?;
        Ok(Self::new(config, backend))
    }

    pub fn backend(&self) -> &dyn Backend {
        self.backend.as_ref()
    }

    pub fn notices_mut(&mut self) -> &mut NoticeBus {
        &mut self.notices
    }

    pub fn controls(&self) -> &ControlsController {
        &self.controls
    }

    /// Direct access, bypassing notices.
    pub fn controls_mut(&mut self) -> &mut ControlsController {
        &mut self.controls
    }

    pub fn radio(&self) -> &RadioDomain {
        &self.radio
    }

    pub fn radio_mut(&mut self) -> &mut RadioDomain {
        &mut self.radio
    }

    pub fn trim(&self) -> &SurfaceDomain {
        &self.trim
    }

    pub fn trim_mut(&mut self) -> &mut SurfaceDomain {
        &mut self.trim
    }

    pub fn max_surface_angles(&self) -> &SurfaceDomain {
        &self.max_surface_angles
    }

    pub fn max_surface_angles_mut(&mut self) -> &mut SurfaceDomain {
        &mut self.max_surface_angles
    }

    pub fn serial_port(&self) -> &SerialPortDomain {
        &self.serial_port
    }

    pub fn serial_port_mut(&mut self) -> &mut SerialPortDomain {
        &mut self.serial_port
    }

    pub fn domain(&self, name: DomainName) -> &dyn ConfigDomain {
        match name {
            DomainName::Controls => &self.controls,
            DomainName::Radio => &self.radio,
            DomainName::Trim => &self.trim,
            DomainName::MaxSurfaceAngles => &self.max_surface_angles,
            DomainName::SerialPort => &self.serial_port,
        }
    }

    fn parts_mut(
        &mut self,
        name: DomainName,
    ) -> (&dyn Backend, &mut NoticeBus, &mut dyn ConfigDomain) {
        let domain: &mut dyn ConfigDomain = match name {
            DomainName::Controls => &mut self.controls,
            DomainName::Radio => &mut self.radio,
            DomainName::Trim => &mut self.trim,
            DomainName::MaxSurfaceAngles => &mut self.max_surface_angles,
            DomainName::SerialPort => &mut self.serial_port,
        };
        (self.backend.as_ref(), &mut self.notices, domain)
    }

    /// Loads the selected domains (`None` = all), one after another.
    ///
    /// Returns per-domain success and publishes a notice for every failure.
    pub async fn load(&mut self, selection: Option<&[DomainName]>) -> BTreeMap<DomainName, bool> {
        let mut results = BTreeMap::new();
        for name in selection.unwrap_or(&DomainName::ALL).iter().copied() {
            let (backend, notices, domain) = self.parts_mut(name);
            let ok = match domain.load(backend).await {
                Ok(()) => true,
                Err(e) => {
                    notices.publish(&Notice::error(
                        name.as_str(),
                        format!("Error fetching {name} data.\n\n{e}"),
                    ));
                    false
                }
            };
            results.insert(name, ok);
        }
        results
    }

    /// Saves the selected domains (`None` = all). A domain without pending
    /// changes counts as a success and sends nothing.
    pub async fn save(&mut self, selection: Option<&[DomainName]>) -> BTreeMap<DomainName, bool> {
        let mut results = BTreeMap::new();
        for name in selection.unwrap_or(&DomainName::ALL).iter().copied() {
            let (backend, notices, domain) = self.parts_mut(name);
            let ok = match domain.save(backend).await {
                Ok(outcome) => {
                    publish_outcome(notices, name, outcome);
                    true
                }
                Err(e) => {
                    publish_error(notices, name, &e);
                    false
                }
            };
            results.insert(name, ok);
        }
        results
    }

    pub fn pending_changes_exist(&self, selection: Option<&[DomainName]>) -> bool {
        selection
            .unwrap_or(&DomainName::ALL)
            .iter()
            .any(|name| self.domain(*name).has_pending_changes())
    }

    pub fn discard(&mut self, selection: Option<&[DomainName]>) {
        for name in selection.unwrap_or(&DomainName::ALL).iter().copied() {
            let (_, _, domain) = self.parts_mut(name);
            domain.discard();
        }
    }

    /// Stages one mapping edit. A rejection is also published with the whitelist.
    pub fn edit_control(
        &mut self,
        role: &str,
        output: &str,
        kind: MappingKind,
        raw: RawEdit,
    ) -> Result<(), Rejection> {
        self.controls
            .edit(role, output, kind, raw)
            .inspect_err(|rejection| {
                debug!(role, output, %rejection, "edit rejected");
                self.notices
                    .publish(&Notice::rejected(DomainName::Controls.as_str(), rejection));
            })
    }

    /// Saves controls for `scope` and publishes the result.
    pub async fn save_controls(&mut self, scope: &SaveScope) -> Result<SaveOutcome, ControlsError> {
        let result = self.controls.save(self.backend.as_ref(), scope).await;
        match &result {
            Ok(outcome) => publish_outcome(&mut self.notices, DomainName::Controls, *outcome),
            Err(e) => publish_error(
                &mut self.notices,
                DomainName::Controls,
                &DomainError::Controls(e.clone()),
            ),
        }
        result
    }

    pub fn discard_controls(&mut self, scope: &SaveScope) -> Result<(), ControlsError> {
        self.controls.discard(scope)
    }
}

fn publish_outcome(notices: &mut NoticeBus, name: DomainName, outcome: SaveOutcome) {
    match outcome {
        SaveOutcome::Saved => notices.publish(&Notice::success(name.as_str(), SAVED)),
        SaveOutcome::Coalesced => notices.publish(&Notice::info(
            name.as_str(),
            "A save is already in progress.",
        )),
        SaveOutcome::NoChanges => {}
    }
}

fn publish_error(notices: &mut NoticeBus, name: DomainName, error: &DomainError) {
    let notice = match error {
        DomainError::Rejected(rejection) => Notice::rejected(name.as_str(), rejection),
        e => Notice::error(name.as_str(), format!("Error saving {name} data.\n\n{e}")),
    };
    notices.publish(&notice);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::memory::MemoryBackend;
    use crate::notify::{NoticeFilter, NoticeQueue, Severity};
    use serde_json::json;

    #[tokio::test]
    async fn test_load_reports_per_domain() {
        let config = ClientConfig::default();
        let backend = MemoryBackend::new();
        backend.set_document(
            &config.endpoints.radio,
            json!({ "Channel": 1, "PALevel": 0, "IsPlaneFeedbackEnabled": false }),
        );

        let mut session = Session::new(&config, backend);
        let queue = NoticeQueue::new();
        session
            .notices_mut()
            .add_listener(queue.clone(), NoticeFilter::All, None);

        let loaded = session
            .load(Some(&[DomainName::Radio, DomainName::Trim]))
            .await;
        assert_eq!(loaded[&DomainName::Radio], true);
        assert_eq!(loaded[&DomainName::Trim], false);
        assert_eq!(loaded.len(), 2);

        let notices = queue.drain();
        assert_eq!(notices.len(), 1);
        assert_eq!(notices[0].severity, Severity::Error);
        assert_eq!(notices[0].source, "trim");
    }

    #[tokio::test]
    async fn test_save_publishes_success() {
        let config = ClientConfig::default();
        let backend = MemoryBackend::new();
        backend.set_document(
            &config.endpoints.radio,
            json!({ "Channel": 1, "PALevel": 0, "IsPlaneFeedbackEnabled": false }),
        );
        let mut session = Session::new(&config, backend);
        let queue = NoticeQueue::new();
        session
            .notices_mut()
            .add_listener(queue.clone(), NoticeFilter::All, None);

        session.load(Some(&[DomainName::Radio])).await;
        session.radio_mut().stage_pa_level(3).unwrap();
        assert!(session.pending_changes_exist(None));

        let saved = session.save(Some(&[DomainName::Radio])).await;
        assert_eq!(saved[&DomainName::Radio], true);
        assert!(!session.pending_changes_exist(None));
        assert_eq!(queue.drain(), vec![Notice::success("radio", SAVED)]);
    }

    #[tokio::test]
    async fn test_discard_selection() {
        let config = ClientConfig::default();
        let backend = MemoryBackend::new();
        backend.set_document(
            &config.endpoints.radio,
            json!({ "Channel": 1, "PALevel": 0, "IsPlaneFeedbackEnabled": false }),
        );
        let mut session = Session::new(&config, backend);
        session.load(Some(&[DomainName::Radio])).await;
        session.radio_mut().stage_channel(9).unwrap();

        session.discard(Some(&[DomainName::Trim]));
        assert!(session.pending_changes_exist(Some(&[DomainName::Radio])));
        session.discard(None);
        assert!(!session.pending_changes_exist(None));
    }
}
