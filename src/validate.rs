//! Constraint validation for candidate mappings.
//!
//! A candidate passes when its output exists, its inputs are available on
//! the controller and, for restricted outputs, its sorted input set equals
//! one of the whitelisted combinations. Unbound always passes. Axis
//! parameters are range-checked against the catalog limits.

use crate::binding::{AxisMapping, AxisMode, InputSpec, InputSpecError, Mapping, MappingKind, UNBOUND};
use crate::catalog::Catalog;
use thiserror::Error;

/// Why a candidate mapping was refused. Nothing is staged when this is returned.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Rejection {
    #[error("Unknown controller role '{0}'")]
    UnknownRole(String),

    #[error("Unknown {kind} output '{output}'")]
    UnknownOutput { kind: MappingKind, output: String },

    #[error("'{input}' is not an available controller {kind} input")]
    UnknownInput { kind: MappingKind, input: String },

    #[error("'{output}' accepts at most {max} input(s)")]
    TooManyInputs { output: String, max: usize },

    #[error("This mapping is not allowed for '{output}'")]
    NotWhitelisted {
        output: String,
        allowed: Vec<Vec<String>>,
    },

    #[error("Invalid {field} '{value}' (must be a number {min}–{max})")]
    OutOfRange {
        field: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },

    #[error("Unknown setting '{0}'")]
    UnknownSetting(String),

    #[error("No value for {0}")]
    MissingValue(&'static str),

    #[error("Expected {expected} input, got {got} input")]
    KindMismatch {
        expected: MappingKind,
        got: MappingKind,
    },

    #[error("Differential mode needs a gain")]
    MissingGain,

    #[error("Axis mode '{0}' cannot be staged")]
    UnsupportedMode(AxisMode),

    #[error(transparent)]
    Input(#[from] InputSpecError),
}

impl Rejection {
    /// Whitelisted combinations, when the rejection came from a restriction.
    pub fn allowed(&self) -> Option<&[Vec<String>]> {
        match self {
            Rejection::NotWhitelisted { allowed, .. } => Some(allowed),
            _ => None,
        }
    }

    /// User-facing text; whitelist violations list every permitted combo as `A + B`.
    pub fn describe(&self) -> String {
        match self.allowed() {
            Some(allowed) => {
                let options: Vec<String> = allowed.iter().map(|combo| combo.join(" + ")).collect();
                format!(
                    "{self}. Whitelisted options for this action/axis:\n\n{}",
                    options.join("\n")
                )
            }
            None => self.to_string(),
        }
    }
}

/// Checks candidates against one catalog.
#[derive(Debug, Clone, Copy)]
pub struct Validator<'a> {
    catalog: &'a Catalog,
}

impl<'a> Validator<'a> {
    pub fn new(catalog: &'a Catalog) -> Self {
        Self { catalog }
    }

    /// Whitelist for `output` with the implicit unbound option appended.
    pub fn permitted(&self, output: &str) -> Option<Vec<Vec<String>>> {
        self.catalog.restriction(output).map(|combos| {
            let mut permitted: Vec<Vec<String>> = combos
                .iter()
                .map(|combo| {
                    let mut combo = combo.clone();
                    combo.sort();
                    combo
                })
                .collect();
            permitted.push(vec![UNBOUND.to_string()]);
            permitted
        })
    }

    /// Input-only check for one output.
    pub fn validate_input(
        &self,
        kind: MappingKind,
        output: &str,
        candidate: &InputSpec,
    ) -> Result<(), Rejection> {
        if !self.catalog.has_output(kind, output) {
            return Err(Rejection::UnknownOutput {
                kind,
                output: output.to_string(),
            });
        }

        if candidate.is_unbound() {
            return Ok(());
        }

        let max = match kind {
            MappingKind::Button => InputSpec::MAX_INPUTS,
            MappingKind::Axis => 1,
        };
        if candidate.inputs().len() > max {
            return Err(Rejection::TooManyInputs {
                output: output.to_string(),
                max,
            });
        }

        if let Some(permitted) = self.permitted(output) {
            let wanted = candidate.sorted();
            if permitted.iter().any(|combo| *combo == wanted) {
                return Ok(());
            }
            return Err(Rejection::NotWhitelisted {
                output: output.to_string(),
                allowed: permitted,
            });
        }

        for input in candidate.inputs() {
            if !self.catalog.has_input(kind, input) {
                return Err(Rejection::UnknownInput {
                    kind,
                    input: input.clone(),
                });
            }
        }

        Ok(())
    }

    /// Full check: inputs, then axis parameters for bound axes.
    pub fn validate(&self, output: &str, mapping: &Mapping) -> Result<(), Rejection> {
        self.validate_input(mapping.kind(), output, mapping.input())?;
        match mapping {
            Mapping::Axis(axis) if !axis.is_unbound() => self.validate_axis_parameters(axis),
            _ => Ok(()),
        }
    }

    fn validate_axis_parameters(&self, axis: &AxisMapping) -> Result<(), Rejection> {
        let limits = &self.catalog.limits;
        if !limits.deadzone.contains(axis.deadzone) {
            return Err(Rejection::OutOfRange {
                field: "deadzone",
                value: axis.deadzone,
                min: limits.deadzone.min,
                max: limits.deadzone.max,
            });
        }

        match axis.mode {
            AxisMode::Direct => Ok(()),
            AxisMode::Differential => {
                let gain = axis.gain.ok_or(Rejection::MissingGain)?;
                if limits.gain.contains(gain) {
                    Ok(())
                } else {
                    Err(Rejection::OutOfRange {
                        field: "gain",
                        value: gain,
                        min: limits.gain.min,
                        max: limits.gain.max,
                    })
                }
            }
            AxisMode::Undefined => Err(Rejection::UnsupportedMode(axis.mode)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binding::ActionMapping;

    fn catalog() -> Catalog {
        let mut catalog = Catalog {
            buttons: ["A", "B", "C", "TriggerL", "TriggerR"]
                .map(String::from)
                .to_vec(),
            axes: vec!["LeftX".into(), "LeftY".into()],
            actions: vec!["Flaps".into(), "Throttle".into(), "Gear".into()],
            plane_axes: vec!["Rudder".into()],
            ..Default::default()
        };
        catalog.restrict("Flaps", [vec!["A", "B"], vec!["C"]]);
        catalog
    }

    fn spec(inputs: &[&str]) -> InputSpec {
        InputSpec::from_inputs(inputs).unwrap()
    }

    #[test]
    fn test_whitelist_is_order_independent() {
        let catalog = catalog();
        let v = Validator::new(&catalog);
        assert!(v.validate_input(MappingKind::Button, "Flaps", &spec(&["B", "A"])).is_ok());
        assert!(v.validate_input(MappingKind::Button, "Flaps", &spec(&["C"])).is_ok());
        assert!(v.validate_input(MappingKind::Button, "Flaps", &spec(&["unbound"])).is_ok());

        let err = v
            .validate_input(MappingKind::Button, "Flaps", &spec(&["C", "A"]))
            .unwrap_err();
        assert_eq!(
            err.allowed(),
            Some(
                &[
                    vec!["A".to_string(), "B".to_string()],
                    vec!["C".to_string()],
                    vec!["unbound".to_string()],
                ][..]
            )
        );
    }

    #[test]
    fn test_unrestricted_output_checks_catalog_inputs() {
        let catalog = catalog();
        let v = Validator::new(&catalog);
        assert!(v.validate_input(MappingKind::Button, "Gear", &spec(&["A", "TriggerL"])).is_ok());
        assert_eq!(
            v.validate_input(MappingKind::Button, "Gear", &spec(&["Start"])),
            Err(Rejection::UnknownInput {
                kind: MappingKind::Button,
                input: "Start".into()
            })
        );
        assert!(matches!(
            v.validate_input(MappingKind::Button, "Eject", &spec(&["A"])),
            Err(Rejection::UnknownOutput { .. })
        ));
    }

    #[test]
    fn test_axis_parameter_bounds() {
        let catalog = catalog();
        let v = Validator::new(&catalog);

        let ok = AxisMapping::differential("LeftX", 2.0);
        assert!(v.validate("Rudder", &ok.into()).is_ok());

        let wide_deadzone = AxisMapping {
            deadzone: 1.5,
            ..AxisMapping::direct("LeftX")
        };
        assert!(matches!(
            v.validate("Rudder", &wide_deadzone.into()),
            Err(Rejection::OutOfRange { field: "deadzone", .. })
        ));

        let tiny_gain = AxisMapping::differential("LeftX", 0.001);
        assert!(matches!(
            v.validate("Rudder", &tiny_gain.into()),
            Err(Rejection::OutOfRange { field: "gain", .. })
        ));

        // gain is not checked while direct
        let direct = AxisMapping {
            gain: Some(1000.0),
            ..AxisMapping::direct("LeftX")
        };
        assert!(v.validate("Rudder", &direct.into()).is_ok());
    }

    #[test]
    fn test_axis_takes_one_input() {
        let catalog = catalog();
        let v = Validator::new(&catalog);
        let two = AxisMapping {
            in_axis: spec(&["LeftX", "LeftY"]),
            ..AxisMapping::default()
        };
        assert!(matches!(
            v.validate("Rudder", &two.into()),
            Err(Rejection::TooManyInputs { max: 1, .. })
        ));
    }

    #[test]
    fn test_describe_lists_whitelist() {
        let catalog = catalog();
        let v = Validator::new(&catalog);
        let err = v
            .validate("Flaps", &ActionMapping::new(spec(&["TriggerL"])).into())
            .unwrap_err();
        let text = err.describe();
        assert!(text.contains("A + B"));
        assert!(text.contains("\nC\n"));
        assert!(text.ends_with("unbound"));
    }
}
