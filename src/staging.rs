//! Staged edits layered over confirmed mappings.
//!
//! [`StagingStore`] owns two [`MappingSet`]s:
//! - **confirmed**: the last state known to match the backend.
//! - **staged**: per-cell overrides. An absent cell means "use confirmed".
//!
//! # Semantics
//! - Both sets hold an entry map for every known role, so lookups never miss a role table.
//! - Edits overwrite one cell (last write wins). Nothing is merged field by field.
//! - An edit equal to the confirmed value clears the override instead of storing it.
//! - Confirmed cells are only replaced by a load or a save echo, never by an edit.
//!
//! Reads for rendering go through [`StagingStore::resolver`].
//!
//! # Example
//! ```
//! use groundlink::{ActionMapping, Catalog, ControllerRole, InputSpec, MappingKind, MappingSet, StagingStore, Validator};
//!
//! let role = ControllerRole::from("Pilot");
//! let mut confirmed = MappingSet::default();
//! confirmed.insert(&role, "Gear", ActionMapping::unbound().into());
//!
//! let catalog = Catalog {
//!     buttons: vec!["ButtonA".into()],
//!     actions: vec!["Gear".into()],
//!     ..Default::default()
//! };
//!
//! let mut store = StagingStore::new(confirmed);
//! store
//!     .stage_edit(&role, "Gear", ActionMapping::new(InputSpec::single("ButtonA")).into(), &Validator::new(&catalog))
//!     .unwrap();
//! assert!(store.resolver().is_dirty("Pilot", "Gear", MappingKind::Button));
//! ```

use crate::binding::{ControllerRole, Mapping, MappingKind, MappingSet};
use crate::resolver::Resolver;
use crate::validate::{Rejection, Validator};
use std::collections::BTreeSet;
use tracing::debug;

#[derive(Debug, Clone, Default)]
pub struct StagingStore {
    confirmed: MappingSet,
    staged: MappingSet,
}

impl StagingStore {
    /// Seeds an empty override table for every role in `confirmed`.
    pub fn new(confirmed: MappingSet) -> Self {
        let mut store = Self::default();
        store.replace_confirmed(confirmed);
        store
    }

    #[inline]
    pub fn confirmed(&self) -> &MappingSet {
        &self.confirmed
    }

    #[inline]
    pub fn staged(&self) -> &MappingSet {
        &self.staged
    }

    #[inline]
    pub fn resolver(&self) -> Resolver<'_> {
        Resolver::new(&self.confirmed, &self.staged)
    }

    /// Known roles, in order.
    pub fn roles(&self) -> Vec<ControllerRole> {
        self.confirmed.roles().into_iter().collect()
    }

    pub fn has_role(&self, role: &str) -> bool {
        self.confirmed.has_role(role)
    }

    /// Replaces confirmed state after a load. Returns the roles seen for the first time.
    ///
    /// Overrides of roles that are still present survive; overrides of roles the
    /// backend no longer reports are dropped.
    pub fn replace_confirmed(&mut self, confirmed: MappingSet) -> Vec<ControllerRole> {
        let roles = confirmed.roles();
        let new_roles: Vec<ControllerRole> = roles
            .iter()
            .filter(|role| !self.staged.has_role(role.as_str()))
            .cloned()
            .collect();

        let stale: Vec<ControllerRole> = self
            .staged
            .roles()
            .into_iter()
            .filter(|role| !roles.contains(role))
            .collect();
        for role in &stale {
            debug!(role = %role, "dropping staged edits of vanished role");
            self.staged.remove_role(role.as_str());
        }

        self.confirmed = confirmed;
        for role in &roles {
            self.confirmed.ensure_role(role);
            self.staged.ensure_role(role);
        }
        new_roles
    }

    /// Merges a save echo into confirmed and clears the overrides of `saved`.
    ///
    /// Each role in the echo replaces its confirmed tables; roles the echo omits keep
    /// their confirmed state.
    pub fn apply_echo(&mut self, echo: MappingSet, saved: &[ControllerRole]) {
        let MappingSet {
            action_mappings,
            axis_mappings,
        } = echo;
        for (role, cells) in action_mappings {
            self.confirmed.action_mappings.insert(role, cells);
        }
        for (role, cells) in axis_mappings {
            self.confirmed.axis_mappings.insert(role, cells);
        }

        for role in self.confirmed.roles() {
            self.confirmed.ensure_role(&role);
            self.staged.ensure_role(&role);
        }
        self.reset_all(Some(saved));
    }

    /// Validates and stages one cell. On rejection nothing changes.
    pub fn stage_edit(
        &mut self,
        role: &ControllerRole,
        output: &str,
        proposed: Mapping,
        validator: &Validator<'_>,
    ) -> Result<(), Rejection> {
        if !self.has_role(role.as_str()) {
            return Err(Rejection::UnknownRole(role.to_string()));
        }
        validator.validate(output, &proposed)?;

        let kind = proposed.kind();
        let confirmed = self
            .confirmed
            .get(role.as_str(), output, kind)
            .unwrap_or_else(|| Mapping::unbound(kind));

        if proposed.same_as(&confirmed) {
            self.clear_cell(role.as_str(), output, kind);
        } else {
            debug!(role = %role, output, %kind, "staged edit");
            self.staged.insert(role, output, proposed);
        }
        Ok(())
    }

    /// Drops the override of one cell. Returns whether there was one.
    pub fn clear_cell(&mut self, role: &str, output: &str, kind: MappingKind) -> bool {
        self.staged.remove(role, output, kind).is_some()
    }

    /// Clears overrides for `roles`, or for every known role when `None`.
    pub fn reset_all(&mut self, roles: Option<&[ControllerRole]>) {
        for role in self.scope(roles) {
            if let Some(cells) = self.staged.action_mappings.get_mut(role.as_str()) {
                cells.clear();
            }
            if let Some(cells) = self.staged.axis_mappings.get_mut(role.as_str()) {
                cells.clear();
            }
        }
    }

    /// Whether any override in scope differs from confirmed.
    pub fn has_pending_changes(&self, roles: Option<&[ControllerRole]>) -> bool {
        let resolver = self.resolver();
        self.scope(roles).iter().any(|role| {
            let role = role.as_str();
            let actions = self
                .staged
                .action_mappings
                .get(role)
                .into_iter()
                .flat_map(|cells| cells.keys())
                .any(|output| resolver.is_dirty(role, output, MappingKind::Button));
            actions
                || self
                    .staged
                    .axis_mappings
                    .get(role)
                    .into_iter()
                    .flat_map(|cells| cells.keys())
                    .any(|output| resolver.is_dirty(role, output, MappingKind::Axis))
        })
    }

    /// Confirmed tables of `roles` with their overrides applied.
    pub fn effective(&self, roles: &[ControllerRole]) -> MappingSet {
        let mut out = MappingSet::default();
        for role in roles {
            out.ensure_role(role);
            let key = role.as_str();
            for kind in [MappingKind::Button, MappingKind::Axis] {
                let outputs: BTreeSet<String> = self
                    .confirmed
                    .outputs(key, kind)
                    .into_iter()
                    .chain(self.staged.outputs(key, kind))
                    .collect();
                for output in outputs {
                    let mapping = self.resolver().resolve(key, &output, kind);
                    out.insert(role, &output, mapping);
                }
            }
        }
        out
    }

    fn scope(&self, roles: Option<&[ControllerRole]>) -> Vec<ControllerRole> {
        match roles {
            Some(roles) => roles.to_vec(),
            None => self.roles(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binding::{ActionMapping, AxisMapping, AxisMode, InputSpec};
    use crate::catalog::Catalog;

    fn catalog() -> Catalog {
        Catalog {
            buttons: vec!["Btn1".into(), "Btn2".into()],
            axes: vec!["LeftX".into()],
            actions: vec!["Gear".into(), "Flaps".into()],
            plane_axes: vec!["Rudder".into()],
            ..Default::default()
        }
    }

    fn store() -> StagingStore {
        let mut confirmed = MappingSet::default();
        let pilot = ControllerRole::from("Pilot");
        let gunner = ControllerRole::from("Gunner");
        confirmed.insert(&pilot, "Gear", ActionMapping::unbound().into());
        confirmed.insert(&pilot, "Rudder", AxisMapping::direct("LeftX").into());
        confirmed.ensure_role(&gunner);
        StagingStore::new(confirmed)
    }

    fn button(name: &str) -> Mapping {
        ActionMapping::new(InputSpec::single(name)).into()
    }

    #[test]
    fn test_new_seeds_every_role() {
        let store = store();
        assert!(store.staged().action_mappings.contains_key("Pilot"));
        assert!(store.staged().axis_mappings.contains_key("Gunner"));
        assert!(!store.has_pending_changes(None));
    }

    #[test]
    fn test_rejected_edit_does_not_mutate() {
        let catalog = catalog();
        let v = Validator::new(&catalog);
        let mut store = store();
        let pilot = ControllerRole::from("Pilot");

        let before = store.staged().clone();
        let err = store.stage_edit(&pilot, "Gear", button("Start"), &v);
        assert!(err.is_err());
        assert_eq!(store.staged(), &before);

        let err = store.stage_edit(&ControllerRole::from("Ghost"), "Gear", button("Btn1"), &v);
        assert_eq!(err, Err(Rejection::UnknownRole("Ghost".into())));
    }

    #[test]
    fn test_edit_back_to_confirmed_clears_cell() {
        let catalog = catalog();
        let v = Validator::new(&catalog);
        let mut store = store();
        let pilot = ControllerRole::from("Pilot");

        store.stage_edit(&pilot, "Gear", button("Btn1"), &v).unwrap();
        assert!(store.has_pending_changes(None));
        store.stage_edit(&pilot, "Gear", button("Btn2"), &v).unwrap();
        assert_eq!(
            store.resolver().resolve("Pilot", "Gear", MappingKind::Button),
            button("Btn2")
        );

        store
            .stage_edit(&pilot, "Gear", ActionMapping::unbound().into(), &v)
            .unwrap();
        assert!(store.staged().action_mappings["Pilot"].is_empty());
        assert!(!store.has_pending_changes(None));

        // Flaps has no confirmed cell: unbound counts as equal.
        store
            .stage_edit(&pilot, "Flaps", ActionMapping::unbound().into(), &v)
            .unwrap();
        assert!(!store.has_pending_changes(None));
    }

    #[test]
    fn test_direct_gain_does_not_dirty() {
        let catalog = catalog();
        let v = Validator::new(&catalog);
        let mut store = store();
        let pilot = ControllerRole::from("Pilot");

        let same_but_gain = AxisMapping {
            gain: Some(7.0),
            ..AxisMapping::direct("LeftX")
        };
        store
            .stage_edit(&pilot, "Rudder", same_but_gain.into(), &v)
            .unwrap();
        assert!(!store.has_pending_changes(None));

        let differential = AxisMapping {
            mode: AxisMode::Differential,
            gain: Some(1.0),
            ..AxisMapping::direct("LeftX")
        };
        store
            .stage_edit(&pilot, "Rudder", differential.into(), &v)
            .unwrap();
        assert!(store.has_pending_changes(Some(&[pilot.clone()])));
        assert!(!store.has_pending_changes(Some(&[ControllerRole::from("Gunner")])));
    }

    #[test]
    fn test_reset_all_is_scoped_and_idempotent() {
        let catalog = catalog();
        let v = Validator::new(&catalog);
        let mut store = store();
        let pilot = ControllerRole::from("Pilot");
        let gunner = ControllerRole::from("Gunner");
        store.stage_edit(&pilot, "Gear", button("Btn1"), &v).unwrap();
        store.stage_edit(&gunner, "Gear", button("Btn2"), &v).unwrap();

        store.reset_all(Some(&[gunner.clone()]));
        assert!(store.has_pending_changes(Some(&[pilot.clone()])));
        assert!(!store.has_pending_changes(Some(&[gunner])));

        store.reset_all(None);
        let after_first = store.staged().clone();
        store.reset_all(None);
        assert_eq!(store.staged(), &after_first);
        assert!(!store.has_pending_changes(None));
    }

    #[test]
    fn test_replace_confirmed_keeps_known_role_edits() {
        let catalog = catalog();
        let v = Validator::new(&catalog);
        let mut store = store();
        let pilot = ControllerRole::from("Pilot");
        store.stage_edit(&pilot, "Gear", button("Btn1"), &v).unwrap();

        let mut refreshed = store.confirmed().clone();
        refreshed.remove_role("Gunner");
        refreshed.ensure_role(&ControllerRole::from("Observer"));
        let new_roles = store.replace_confirmed(refreshed);

        assert_eq!(new_roles, vec![ControllerRole::from("Observer")]);
        assert!(store.resolver().is_dirty("Pilot", "Gear", MappingKind::Button));
        assert!(!store.staged().has_role("Gunner"));
        assert!(store.staged().has_role("Observer"));
    }

    #[test]
    fn test_effective_overlays_staged() {
        let catalog = catalog();
        let v = Validator::new(&catalog);
        let mut store = store();
        let pilot = ControllerRole::from("Pilot");
        store.stage_edit(&pilot, "Flaps", button("Btn2"), &v).unwrap();

        let effective = store.effective(&[pilot]);
        assert_eq!(effective.action_mappings["Pilot"].len(), 2);
        assert_eq!(
            effective.action_mappings["Pilot"]["Flaps"].button,
            InputSpec::single("Btn2")
        );
        assert!(!effective.has_role("Gunner"));
    }
}
