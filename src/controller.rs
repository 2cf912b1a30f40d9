//! Controls reconciliation: load, edit, save and discard over a [`Backend`].
//!
//! [`ControlsController`] is the only owner of the confirmed/staged pair.
//! Rendering code reads through [`ControlsController::resolve`],
//! [`ControlsController::rows`] and friends, and writes through
//! [`ControlsController::edit`] and [`ControlsController::discard`].
//!
//! ## States
//! `Uninitialized → Loading → Ready → Saving → Ready`, with `LoadFailed` and
//! `SaveFailed` after a failed attempt. Any operation may be retried after a
//! failure; a failed load or save never touches the mappings.
//!
//! ## Saving
//! [`ControlsController::save`] does everything in one call. Hosts that keep
//! the controller behind a `RefCell` can split it into
//! [`begin_save`](ControlsController::begin_save), the `POST`, and
//! [`finish_save`](ControlsController::finish_save) so no borrow is held across
//! the request. While a save is in flight, another save touching any of the
//! same roles is coalesced into it (nothing is sent).
//!
//! The in-flight mark belongs to the [`SaveTicket`]. Dropping a ticket, or a
//! `save` future that holds one, releases its roles and leaves staged edits
//! untouched.

use crate::backends::Backend;
use crate::binding::{
    ActionMapping, AxisMapping, AxisMode, ControllerRole, InputSpec, Mapping, MappingKind, MappingSet,
    UNBOUND,
};
use crate::catalog::{Catalog, Limits};
use crate::config::{ClientConfig, SaveScopeSetting};
use crate::convert::{from_wire, to_wire_payload};
use crate::error::{BackendError, ControlsError};
use crate::resolver::{MappingRow, Resolver};
use crate::staging::StagingStore;
use crate::validate::{Rejection, Validator};
use crate::wire::{ControlsPayload, ControlsResponse};
use serde_json::Value;
use std::collections::BTreeSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, info, warn};

/// Gain used when differential mode is picked without one.
pub const DEFAULT_GAIN: f64 = 0.1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControllerState {
    Uninitialized,
    Loading,
    Ready,
    Saving,
    LoadFailed,
    SaveFailed,
}

/// Roles covered by a save, discard or pending-change query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveScope {
    ActiveRole,
    AllRoles,
    Roles(Vec<ControllerRole>),
}

impl From<SaveScopeSetting> for SaveScope {
    fn from(setting: SaveScopeSetting) -> Self {
        match setting {
            SaveScopeSetting::AllRoles => SaveScope::AllRoles,
            SaveScopeSetting::ActiveRole => SaveScope::ActiveRole,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveOutcome {
    /// Backend accepted the mappings; confirmed now holds its echo.
    Saved,
    /// Nothing staged in scope; nothing sent.
    NoChanges,
    /// A save for an overlapping scope is still in flight; nothing sent.
    Coalesced,
}

/// Raw values from the mapping editor.
#[derive(Debug, Clone, PartialEq)]
pub enum RawEdit {
    /// Free button pick: primary and optional secondary (combo).
    Buttons {
        primary: String,
        secondary: Option<String>,
    },
    /// One entry picked from a restricted output's whitelist, e.g. `"A, B"`.
    Choice(String),
    /// Axis pick. Absent parameters default to not inverted, deadzone 0, direct.
    Axis {
        input: String,
        inverted: bool,
        deadzone: Option<f64>,
        mode: Option<AxisMode>,
        gain: Option<f64>,
    },
}

impl RawEdit {
    pub fn button(primary: impl Into<String>) -> Self {
        RawEdit::Buttons {
            primary: primary.into(),
            secondary: None,
        }
    }

    pub fn combo(primary: impl Into<String>, secondary: impl Into<String>) -> Self {
        RawEdit::Buttons {
            primary: primary.into(),
            secondary: Some(secondary.into()),
        }
    }

    pub fn axis(input: impl Into<String>) -> Self {
        RawEdit::Axis {
            input: input.into(),
            inverted: false,
            deadzone: None,
            mode: None,
            gain: None,
        }
    }

    pub fn kind(&self) -> MappingKind {
        match self {
            RawEdit::Buttons { .. } | RawEdit::Choice(_) => MappingKind::Button,
            RawEdit::Axis { .. } => MappingKind::Axis,
        }
    }

    /// Builds the candidate mapping. Range checks happen in the validator.
    pub fn into_mapping(self) -> Result<Mapping, Rejection> {
        match self {
            RawEdit::Buttons { primary, secondary } => {
                let secondary = secondary.unwrap_or_else(|| UNBOUND.to_string());
                let button = InputSpec::from_inputs([primary, secondary])?;
                Ok(ActionMapping::new(button).into())
            }
            RawEdit::Choice(choice) => Ok(ActionMapping::new(InputSpec::parse(&choice)?).into()),
            RawEdit::Axis {
                input,
                inverted,
                deadzone,
                mode,
                gain,
            } => {
                let in_axis = InputSpec::single(input);
                if in_axis.is_unbound() {
                    return Ok(AxisMapping::unbound().into());
                }
                let mode = mode.unwrap_or_default();
                let gain = match mode {
                    AxisMode::Differential => Some(gain.unwrap_or(DEFAULT_GAIN)),
                    _ => gain,
                };
                Ok(AxisMapping {
                    in_axis,
                    invert: inverted,
                    deadzone: deadzone.unwrap_or(0.0),
                    mode,
                    gain,
                }
                .into())
            }
        }
    }
}

/// Roles with a save on the wire. Shared between a controller and its tickets.
#[derive(Debug, Clone, Default)]
struct InFlight(Arc<Mutex<BTreeSet<ControllerRole>>>);

impl InFlight {
    fn lock(&self) -> MutexGuard<'_, BTreeSet<ControllerRole>> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn overlaps(&self, roles: &[ControllerRole]) -> bool {
        let set = self.lock();
        roles.iter().any(|role| set.contains(role))
    }

    fn claim(&self, roles: &[ControllerRole]) {
        self.lock().extend(roles.iter().cloned());
    }

    fn release(&self, roles: &[ControllerRole]) {
        let mut set = self.lock();
        for role in roles {
            set.remove(role);
        }
    }
}

/// A save that passed [`ControlsController::begin_save`] and awaits its `POST`.
///
/// Its roles count as in flight until it is passed to
/// [`ControlsController::finish_save`] or dropped.
#[derive(Debug)]
#[must_use = "hand the POST result to finish_save; dropping the ticket abandons the save"]
pub struct SaveTicket {
    roles: Vec<ControllerRole>,
    payload: ControlsPayload,
    in_flight: InFlight,
    released: bool,
}

impl SaveTicket {
    pub fn roles(&self) -> &[ControllerRole] {
        &self.roles
    }

    pub fn payload(&self) -> &ControlsPayload {
        &self.payload
    }

    /// JSON body for the `POST`.
    pub fn body(&self) -> Result<Value, BackendError> {
        serde_json::to_value(&self.payload).map_err(|e| BackendError::InvalidJson(e.to_string()))
    }

    fn release(&mut self) {
        if !self.released {
            self.in_flight.release(&self.roles);
            self.released = true;
        }
    }
}

impl Drop for SaveTicket {
    fn drop(&mut self) {
        if !self.released {
            debug!(roles = ?self.roles, "save abandoned");
        }
        self.release();
    }
}

/// Result of [`ControlsController::begin_save`].
#[derive(Debug)]
pub enum SavePlan {
    NoChanges,
    Coalesced,
    Send(SaveTicket),
}

pub struct ControlsController {
    endpoint: String,
    limits: Limits,
    save_scope: SaveScope,
    state: ControllerState,
    loaded: bool,
    catalog: Catalog,
    store: StagingStore,
    active_role: Option<ControllerRole>,
    in_flight: InFlight,
}

impl ControlsController {
    pub fn new(endpoint: impl Into<String>, limits: Limits) -> Self {
        Self {
            endpoint: endpoint.into(),
            limits,
            save_scope: SaveScope::AllRoles,
            state: ControllerState::Uninitialized,
            loaded: false,
            catalog: Catalog::default(),
            store: StagingStore::default(),
            active_role: None,
            in_flight: InFlight::default(),
        }
    }

    pub fn from_config(config: &ClientConfig) -> Self {
        let mut controller = Self::new(config.endpoints.controls.clone(), config.limits);
        controller.save_scope = config.controls.save_scope.into();
        controller
    }

    /// Current state. A `Saving` whose tickets were all dropped reads as `Ready`.
    pub fn state(&self) -> ControllerState {
        match self.state {
            ControllerState::Saving if self.in_flight.is_empty() => ControllerState::Ready,
            state => state,
        }
    }

    /// `true` while a ticket from [`begin_save`](Self::begin_save) is alive.
    pub fn is_saving(&self) -> bool {
        !self.in_flight.is_empty()
    }

    /// `true` once any load has succeeded, even if a later refresh failed.
    #[inline]
    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    #[inline]
    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Scope used by [`ConfigDomain::save`](crate::domain::ConfigDomain::save).
    pub fn default_scope(&self) -> &SaveScope {
        &self.save_scope
    }

    pub fn set_default_scope(&mut self, scope: SaveScope) {
        self.save_scope = scope;
    }

    pub fn roles(&self) -> Vec<ControllerRole> {
        self.store.roles()
    }

    pub fn active_role(&self) -> Option<&ControllerRole> {
        self.active_role.as_ref()
    }

    /// Selects the role shown by the panel. Unknown roles are refused.
    pub fn set_active_role(&mut self, role: &str) -> bool {
        if self.store.has_role(role) {
            self.active_role = Some(ControllerRole::from(role));
            true
        } else {
            false
        }
    }

    #[inline]
    pub fn resolver(&self) -> Resolver<'_> {
        self.store.resolver()
    }

    pub fn resolve(&self, role: &str, output: &str, kind: MappingKind) -> Mapping {
        self.store.resolver().resolve(role, output, kind)
    }

    pub fn is_dirty(&self, role: &str, output: &str, kind: MappingKind) -> bool {
        self.store.resolver().is_dirty(role, output, kind)
    }

    /// List rows for `role` in catalog order.
    pub fn rows(&self, role: &str, kind: MappingKind) -> Vec<MappingRow> {
        self.store.resolver().rows(role, kind, &self.catalog)
    }

    /// Whitelist offered for a restricted output, unbound included.
    pub fn permitted(&self, output: &str) -> Option<Vec<Vec<String>>> {
        Validator::new(&self.catalog).permitted(output)
    }

    /// Fetches catalog and mappings. On failure the previous state is kept.
    pub async fn load(&mut self, backend: &dyn Backend) -> Result<(), ControlsError> {
        self.state = ControllerState::Loading;

        match self.fetch(backend).await {
            Ok((catalog, confirmed)) => {
                self.catalog = catalog;
                let new_roles = self.store.replace_confirmed(confirmed);
                if !new_roles.is_empty() {
                    debug!(?new_roles, "seeded staging for new roles");
                }

                let active_still_known = self
                    .active_role
                    .as_ref()
                    .is_some_and(|role| self.store.has_role(role.as_str()));
                if !active_still_known {
                    self.active_role = self.store.roles().into_iter().next();
                }

                self.loaded = true;
                self.state = if self.in_flight.is_empty() {
                    ControllerState::Ready
                } else {
                    ControllerState::Saving
                };
                info!(roles = self.store.roles().len(), "controls loaded");
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, "controls load failed");
                self.state = ControllerState::LoadFailed;
                Err(e)
            }
        }
    }

    async fn fetch(
        &self,
        backend: &dyn Backend,
    ) -> Result<(Catalog, MappingSet), ControlsError> {
        let raw = backend.get_json(&self.endpoint).await?;
        let resp: ControlsResponse = serde_json::from_value(raw)
            .map_err(|e| ControlsError::MalformedResponse(e.to_string()))?;

        let mut catalog = Catalog {
            buttons: resp.available_controller_buttons,
            axes: resp.available_controller_axes,
            actions: resp.available_control_actions,
            plane_axes: resp.available_plane_axes,
            limits: self.limits,
            ..Default::default()
        };
        for (output, combos) in resp.control_actions_restrictions {
            catalog.restrict(output, combos);
        }

        let confirmed = from_wire(
            resp.control_actions_settings.as_ref(),
            resp.plane_axes_settings.as_ref(),
        )?;
        Ok((catalog, confirmed))
    }

    /// Parses, validates and stages one edit. Rejections leave staging untouched.
    pub fn edit(
        &mut self,
        role: &str,
        output: &str,
        kind: MappingKind,
        raw: RawEdit,
    ) -> Result<(), Rejection> {
        if raw.kind() != kind {
            return Err(Rejection::KindMismatch {
                expected: kind,
                got: raw.kind(),
            });
        }
        let proposed = raw.into_mapping()?;
        let role = ControllerRole::from(role);
        self.store
            .stage_edit(&role, output, proposed, &Validator::new(&self.catalog))
    }

    /// Drops the staged value of one cell.
    pub fn clear_cell(&mut self, role: &str, output: &str, kind: MappingKind) -> bool {
        self.store.clear_cell(role, output, kind)
    }

    pub fn has_pending_changes(&self, scope: &SaveScope) -> bool {
        match self.scope_roles(scope) {
            Ok(roles) => self.store.has_pending_changes(Some(&roles)),
            Err(_) => false,
        }
    }

    /// Throws away staged edits in scope.
    pub fn discard(&mut self, scope: &SaveScope) -> Result<(), ControlsError> {
        let roles = self.scope_roles(scope)?;
        self.store.reset_all(Some(&roles));
        Ok(())
    }

    /// Drops every staged edit of every role.
    pub fn discard_all(&mut self) {
        self.store.reset_all(None);
    }

    /// Loads, checks and serializes the scope. Marks its roles in flight.
    pub fn begin_save(&mut self, scope: &SaveScope) -> Result<SavePlan, ControlsError> {
        if !self.loaded {
            return Err(ControlsError::NotLoaded);
        }
        let roles = self.scope_roles(scope)?;

        if self.in_flight.overlaps(&roles) {
            debug!(?roles, "save coalesced into in-flight save");
            return Ok(SavePlan::Coalesced);
        }
        if !self.store.has_pending_changes(Some(&roles)) {
            return Ok(SavePlan::NoChanges);
        }

        let effective = self.store.effective(&roles);
        let payload = to_wire_payload(&effective, &roles)?;

        self.in_flight.claim(&roles);
        self.state = ControllerState::Saving;
        Ok(SavePlan::Send(SaveTicket {
            roles,
            payload,
            in_flight: self.in_flight.clone(),
            released: false,
        }))
    }

    /// Reconciles the `POST` result. On success confirmed takes the echo and the
    /// scope's staged edits are cleared; on failure staged edits are kept.
    pub fn finish_save(
        &mut self,
        mut ticket: SaveTicket,
        response: Result<Value, BackendError>,
    ) -> Result<SaveOutcome, ControlsError> {
        ticket.release();

        let echo = response.map_err(ControlsError::from).and_then(|raw| {
            let echo: ControlsPayload = serde_json::from_value(raw)
                .map_err(|e| ControlsError::MalformedResponse(e.to_string()))?;
            from_wire(
                echo.control_actions_settings.as_ref(),
                echo.plane_axes_settings.as_ref(),
            )
        });

        match echo {
            Ok(echo) => {
                self.store.apply_echo(echo, &ticket.roles);
                if !self
                    .active_role
                    .as_ref()
                    .is_some_and(|role| self.store.has_role(role.as_str()))
                {
                    self.active_role = self.store.roles().into_iter().next();
                }
                self.state = if self.in_flight.is_empty() {
                    ControllerState::Ready
                } else {
                    ControllerState::Saving
                };
                info!(roles = ?ticket.roles, "controls saved");
                Ok(SaveOutcome::Saved)
            }
            Err(e) => {
                warn!(error = %e, roles = ?ticket.roles, "controls save failed");
                self.state = ControllerState::SaveFailed;
                Err(e)
            }
        }
    }

    /// Saves the scope's effective mappings and reconciles the echo.
    pub async fn save(
        &mut self,
        backend: &dyn Backend,
        scope: &SaveScope,
    ) -> Result<SaveOutcome, ControlsError> {
        let ticket = match self.begin_save(scope)? {
            SavePlan::NoChanges => return Ok(SaveOutcome::NoChanges),
            SavePlan::Coalesced => return Ok(SaveOutcome::Coalesced),
            SavePlan::Send(ticket) => ticket,
        };

        let response = match ticket.body() {
            Ok(body) => backend.post_json(&self.endpoint, &body).await,
            Err(e) => Err(e),
        };
        self.finish_save(ticket, response)
    }

    fn scope_roles(&self, scope: &SaveScope) -> Result<Vec<ControllerRole>, ControlsError> {
        match scope {
            SaveScope::ActiveRole => self
                .active_role
                .clone()
                .map(|role| vec![role])
                .ok_or(ControlsError::NoActiveRole),
            SaveScope::AllRoles => Ok(self.store.roles()),
            SaveScope::Roles(roles) => Ok(roles.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raw_buttons_collapse_duplicates() {
        let mapping = RawEdit::combo("A", "A").into_mapping().unwrap();
        assert_eq!(mapping, ActionMapping::new(InputSpec::single("A")).into());

        let mapping = RawEdit::combo("unbound", "B").into_mapping().unwrap();
        assert_eq!(mapping.input().to_string(), "B");
    }

    #[test]
    fn test_raw_axis_defaults() {
        let mapping = RawEdit::axis("LeftX").into_mapping().unwrap();
        assert_eq!(mapping, AxisMapping::direct("LeftX").into());

        let mapping = RawEdit::Axis {
            input: "LeftX".into(),
            inverted: true,
            deadzone: Some(0.2),
            mode: Some(AxisMode::Differential),
            gain: None,
        }
        .into_mapping()
        .unwrap();
        let Mapping::Axis(axis) = mapping else {
            panic!("expected axis mapping");
        };
        assert_eq!(axis.gain, Some(DEFAULT_GAIN));
        assert!(axis.invert);

        let unbound = RawEdit::axis("unbound").into_mapping().unwrap();
        assert!(unbound.is_unbound());
    }

    #[test]
    fn test_edit_before_load_is_rejected() {
        let mut controller = ControlsController::new("/settings/control/", Limits::default());
        let err = controller
            .edit("Pilot", "Throttle", MappingKind::Button, RawEdit::button("A"))
            .unwrap_err();
        assert_eq!(err, Rejection::UnknownRole("Pilot".into()));
        assert_eq!(controller.state(), ControllerState::Uninitialized);
    }

    #[test]
    fn test_kind_mismatch() {
        let mut controller = ControlsController::new("/settings/control/", Limits::default());
        let err = controller
            .edit("Pilot", "Rudder", MappingKind::Axis, RawEdit::button("A"))
            .unwrap_err();
        assert_eq!(
            err,
            Rejection::KindMismatch {
                expected: MappingKind::Axis,
                got: MappingKind::Button
            }
        );
    }

    #[test]
    fn test_save_before_load() {
        let mut controller = ControlsController::new("/settings/control/", Limits::default());
        assert!(matches!(
            controller.begin_save(&SaveScope::AllRoles),
            Err(ControlsError::NotLoaded)
        ));
    }
}
