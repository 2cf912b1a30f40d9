//! What the panel shows for a cell, and whether that cell is dirty.

use crate::binding::{ActionMapping, AxisMapping, AxisMode, Mapping, MappingKind, MappingSet};
use crate::catalog::Catalog;

/// Read-only view over a confirmed/staged pair.
#[derive(Debug, Clone, Copy)]
pub struct Resolver<'a> {
    confirmed: &'a MappingSet,
    staged: &'a MappingSet,
}

/// One line of a mapping list.
#[derive(Debug, Clone, PartialEq)]
pub struct MappingRow {
    pub output: String,
    pub display: String,
    pub dirty: bool,
    /// Restricted outputs are edited by picking a whitelisted combination.
    pub is_enum: bool,
}

impl<'a> Resolver<'a> {
    pub fn new(confirmed: &'a MappingSet, staged: &'a MappingSet) -> Self {
        Self { confirmed, staged }
    }

    /// Staged value, else confirmed, else unbound. Always an owned copy.
    pub fn resolve(&self, role: &str, output: &str, kind: MappingKind) -> Mapping {
        self.staged
            .get(role, output, kind)
            .or_else(|| self.confirmed.get(role, output, kind))
            .unwrap_or_else(|| Mapping::unbound(kind))
    }

    pub fn resolve_action(&self, role: &str, action: &str) -> ActionMapping {
        match self.resolve(role, action, MappingKind::Button) {
            Mapping::Action(m) => m,
            Mapping::Axis(_) => ActionMapping::unbound(),
        }
    }

    pub fn resolve_axis(&self, role: &str, plane_axis: &str) -> AxisMapping {
        match self.resolve(role, plane_axis, MappingKind::Axis) {
            Mapping::Axis(m) => m,
            Mapping::Action(_) => AxisMapping::unbound(),
        }
    }

    /// A staged cell that differs from confirmed, or has no confirmed counterpart.
    pub fn is_dirty(&self, role: &str, output: &str, kind: MappingKind) -> bool {
        match (
            self.staged.get(role, output, kind),
            self.confirmed.get(role, output, kind),
        ) {
            (None, _) => false,
            (Some(_), None) => true,
            (Some(staged), Some(confirmed)) => !staged.same_as(&confirmed),
        }
    }

    /// Rows for every catalog output of `kind`, in catalog order.
    pub fn rows(&self, role: &str, kind: MappingKind, catalog: &Catalog) -> Vec<MappingRow> {
        catalog
            .outputs(kind)
            .iter()
            .map(|output| MappingRow {
                output: output.clone(),
                display: describe(&self.resolve(role, output, kind)),
                dirty: self.is_dirty(role, output, kind),
                is_enum: kind == MappingKind::Button && catalog.is_enum(output),
            })
            .collect()
    }
}

/// Short text for a mapping, e.g. `LeftX, inv=1, dz=0.05, gain=2`.
pub fn describe(mapping: &Mapping) -> String {
    match mapping {
        Mapping::Action(m) => m.button.to_string(),
        Mapping::Axis(m) if m.is_unbound() => m.in_axis.to_string(),
        Mapping::Axis(m) => {
            let processing = match (m.mode, m.gain) {
                (AxisMode::Direct, _) => "direct".to_string(),
                (AxisMode::Undefined, _) => "undefined".to_string(),
                (AxisMode::Differential, Some(gain)) => format!("gain={gain}"),
                (AxisMode::Differential, None) => "gain=none".to_string(),
            };
            format!(
                "{}, inv={}, dz={}, {processing}",
                m.in_axis,
                u8::from(m.invert),
                m.deadzone
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binding::{ControllerRole, InputSpec};

    fn sets() -> (MappingSet, MappingSet) {
        let role = ControllerRole::from("Pilot");
        let mut confirmed = MappingSet::default();
        confirmed.insert(&role, "Gear", ActionMapping::new(InputSpec::single("Btn1")).into());
        confirmed.insert(&role, "Rudder", AxisMapping::direct("LeftX").into());

        let mut staged = MappingSet::default();
        staged.ensure_role(&role);
        staged.insert(
            &role,
            "Flaps",
            ActionMapping::new(InputSpec::parse("Btn1, Btn2").unwrap()).into(),
        );
        (confirmed, staged)
    }

    #[test]
    fn test_resolve_falls_back_in_order() {
        let (confirmed, staged) = sets();
        let r = Resolver::new(&confirmed, &staged);

        assert_eq!(r.resolve_action("Pilot", "Flaps").button.to_string(), "Btn1, Btn2");
        assert_eq!(r.resolve_action("Pilot", "Gear").button.to_string(), "Btn1");
        assert!(r.resolve_action("Pilot", "Brake").button.is_unbound());
        assert!(r.resolve_axis("Nobody", "Rudder").is_unbound());
    }

    #[test]
    fn test_resolved_copy_is_isolated() {
        let (confirmed, staged) = sets();
        let r = Resolver::new(&confirmed, &staged);

        let mut rudder = r.resolve_axis("Pilot", "Rudder");
        rudder.invert = true;
        rudder.deadzone = 0.5;
        assert!(!confirmed.axis_mappings["Pilot"]["Rudder"].invert);
        assert_eq!(confirmed.axis_mappings["Pilot"]["Rudder"].deadzone, 0.0);
    }

    #[test]
    fn test_staged_without_confirmed_is_dirty() {
        let (confirmed, staged) = sets();
        let r = Resolver::new(&confirmed, &staged);
        assert!(r.is_dirty("Pilot", "Flaps", MappingKind::Button));
        assert!(!r.is_dirty("Pilot", "Gear", MappingKind::Button));
    }

    #[test]
    fn test_describe_axis() {
        let axis = AxisMapping {
            invert: true,
            deadzone: 0.05,
            ..AxisMapping::differential("LeftX", 2.0)
        };
        assert_eq!(describe(&axis.into()), "LeftX, inv=1, dz=0.05, gain=2");
        assert_eq!(
            describe(&AxisMapping::direct("RightY").into()),
            "RightY, inv=0, dz=0, direct"
        );
        assert_eq!(describe(&AxisMapping::unbound().into()), "unbound");
    }

    #[test]
    fn test_rows_follow_catalog_order() {
        let (confirmed, staged) = sets();
        let r = Resolver::new(&confirmed, &staged);
        let mut catalog = Catalog {
            actions: vec!["Gear".into(), "Flaps".into()],
            ..Default::default()
        };
        catalog.restrict("Flaps", [vec!["Btn1", "Btn2"]]);

        let rows = r.rows("Pilot", MappingKind::Button, &catalog);
        assert_eq!(
            rows,
            vec![
                MappingRow {
                    output: "Gear".into(),
                    display: "Btn1".into(),
                    dirty: false,
                    is_enum: false,
                },
                MappingRow {
                    output: "Flaps".into(),
                    display: "Btn1, Btn2".into(),
                    dirty: true,
                    is_enum: true,
                },
            ]
        );
    }
}
