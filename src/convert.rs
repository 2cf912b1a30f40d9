//! Wire format ⇄ [`MappingSet`] translation.
//!
//! Both directions are pure. Unbound outputs are never sent: the backend
//! treats a missing output as "no mapping".

use crate::binding::{
    ActionMapping, AxisMapping, AxisMode, ControllerRole, InputSpec, MappingSet,
};
use crate::error::ControlsError;
use crate::wire::{
    ControlsPayload, WireActionTable, WireAssigner, WireAxisMapping, WireAxisTable, WireButtons,
    DIFFERENCE_ASSIGNER, DIRECT_ASSIGNER, WIRE_NONE,
};
use std::collections::BTreeMap;

/// One role's actions as sent to the backend.
pub type WireActionRow = BTreeMap<String, Option<WireButtons>>;

/// One role's plane axes as sent to the backend.
pub type WireAxisRow = BTreeMap<String, Option<WireAxisMapping>>;

/// Builds a [`MappingSet`] from the two wire tables.
///
/// Fails if either table is missing; the caller keeps its previous state.
pub fn from_wire(
    actions: Option<&WireActionTable>,
    axes: Option<&WireAxisTable>,
) -> Result<MappingSet, ControlsError> {
    let actions = actions.ok_or_else(|| {
        ControlsError::MalformedResponse("missing ControlActionsSettings".to_string())
    })?;
    let axes = axes.ok_or_else(|| {
        ControlsError::MalformedResponse("missing PlaneAxesSettings".to_string())
    })?;

    let mut set = MappingSet::default();

    for (role, cells) in actions {
        let role = ControllerRole::from(role.as_str());
        let mut row = BTreeMap::new();
        for (action, buttons) in cells {
            let button = buttons_from_wire(buttons.as_ref()).map_err(|e| {
                ControlsError::MalformedResponse(format!("action '{action}' of role '{role}': {e}"))
            })?;
            row.insert(action.clone(), ActionMapping::new(button));
        }
        set.action_mappings.insert(role, row);
    }

    for (role, cells) in axes {
        let role = ControllerRole::from(role.as_str());
        let mut row = BTreeMap::new();
        for (plane_axis, wire) in cells {
            let mapping = match wire {
                Some(wire) => axis_from_wire(wire),
                None => AxisMapping::unbound(),
            };
            row.insert(plane_axis.clone(), mapping);
        }
        set.axis_mappings.insert(role, row);
    }

    // Every role gets both tables even if the server only listed it in one.
    for role in set.roles() {
        set.ensure_role(&role);
    }

    Ok(set)
}

fn buttons_from_wire(
    buttons: Option<&WireButtons>,
) -> Result<InputSpec, crate::binding::InputSpecError> {
    match buttons {
        None => Ok(InputSpec::unbound()),
        Some(WireButtons::List(list)) => {
            InputSpec::from_inputs(list.iter().filter(|b| b.as_str() != WIRE_NONE))
        }
        Some(WireButtons::Text(text)) => {
            InputSpec::from_inputs(text.split(',').map(str::trim).filter(|b| *b != WIRE_NONE))
        }
    }
}

fn axis_from_wire(wire: &WireAxisMapping) -> AxisMapping {
    let in_axis = match wire.controller_axis.as_deref() {
        None | Some(WIRE_NONE) => InputSpec::unbound(),
        Some(axis) => InputSpec::single(axis),
    };
    let (mode, gain) = match wire.final_value_assigner.kind.as_str() {
        DIRECT_ASSIGNER => (AxisMode::Direct, None),
        DIFFERENCE_ASSIGNER => (AxisMode::Differential, wire.final_value_assigner.gain),
        _ => (AxisMode::Undefined, wire.final_value_assigner.gain),
    };

    AxisMapping {
        in_axis,
        invert: wire.inverted,
        deadzone: wire.controller_axis_dead_band,
        mode,
        gain,
    }
}

/// Serializes one role of `set`, skipping unbound outputs.
pub fn to_wire(
    set: &MappingSet,
    role: &ControllerRole,
) -> Result<(WireActionRow, WireAxisRow), ControlsError> {
    let mut actions = WireActionRow::new();
    if let Some(cells) = set.action_mappings.get(role.as_str()) {
        for (action, mapping) in cells {
            if mapping.button.is_unbound() {
                continue;
            }
            actions.insert(
                action.clone(),
                Some(WireButtons::List(mapping.button.inputs().to_vec())),
            );
        }
    }

    let mut axes = WireAxisRow::new();
    if let Some(cells) = set.axis_mappings.get(role.as_str()) {
        for (plane_axis, mapping) in cells {
            if mapping.is_unbound() {
                continue;
            }
            let assigner = match mapping.mode {
                AxisMode::Direct => WireAssigner {
                    kind: DIRECT_ASSIGNER.to_string(),
                    gain: None,
                },
                AxisMode::Differential => WireAssigner {
                    kind: DIFFERENCE_ASSIGNER.to_string(),
                    gain: mapping.gain,
                },
                AxisMode::Undefined => {
                    return Err(ControlsError::UnsupportedAssigner {
                        role: role.to_string(),
                        output: plane_axis.clone(),
                    })
                }
            };
            axes.insert(
                plane_axis.clone(),
                Some(WireAxisMapping {
                    controller_axis: Some(mapping.in_axis.to_string()),
                    inverted: mapping.invert,
                    controller_axis_dead_band: mapping.deadzone,
                    final_value_assigner: assigner,
                }),
            );
        }
    }

    Ok((actions, axes))
}

/// Full `POST` body for `roles`. Every role appears, even with no bound outputs.
pub fn to_wire_payload<'a, I>(set: &MappingSet, roles: I) -> Result<ControlsPayload, ControlsError>
where
    I: IntoIterator<Item = &'a ControllerRole>,
{
    let mut actions = WireActionTable::new();
    let mut axes = WireAxisTable::new();

    for role in roles {
        let (role_actions, role_axes) = to_wire(set, role)?;
        actions.insert(role.to_string(), role_actions);
        axes.insert(role.to_string(), role_axes);
    }

    Ok(ControlsPayload {
        control_actions_settings: Some(actions),
        plane_axes_settings: Some(axes),
    })
}
