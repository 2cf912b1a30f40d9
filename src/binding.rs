//! Controls mapping model.
//!
//! A controller role (a named gamepad profile) owns two independent tables:
//! control actions bound to one or two buttons, and plane axes bound to a
//! controller axis plus its processing parameters.
//!
//! ## Input conventions
//! - An [`InputSpec`] is either `"unbound"` or one/two input identifiers joined by `", "`.
//!   Two buttons form a simultaneous-press combo.
//! - Axis inputs carry a single controller axis.
//! - `gain` on an [`AxisMapping`] only means something in [`AxisMode::Differential`].
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::borrow::Borrow;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use thiserror::Error;

/// Sentinel used by the backend and the UI for "no input bound".
pub const UNBOUND: &str = "unbound";

/// Separator between the two buttons of a combo.
pub const INPUT_SEPARATOR: &str = ", ";

/// Opaque name of a controller profile / slot.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ControllerRole(String);

impl ControllerRole {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for ControllerRole {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ControllerRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ControllerRole {
    fn from(name: &str) -> Self {
        Self(name.to_string())
    }
}

impl From<String> for ControllerRole {
    fn from(name: String) -> Self {
        Self(name)
    }
}

/// Action (button) or plane axis cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MappingKind {
    Button,
    Axis,
}

impl fmt::Display for MappingKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MappingKind::Button => f.write_str("button"),
            MappingKind::Axis => f.write_str("axis"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InputSpecError {
    #[error("at most {max} distinct inputs can be combined, got {got}")]
    TooMany { max: usize, got: usize },
}

/// Zero, one or two input identifiers. Zero is rendered as `"unbound"`.
///
/// Operands equal to `"unbound"` are stripped and duplicates collapse, so
/// `"A, A"` and `"A, unbound"` both become `"A"`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct InputSpec {
    inputs: Vec<String>,
}

impl InputSpec {
    pub const MAX_INPUTS: usize = 2;

    pub fn unbound() -> Self {
        Self::default()
    }

    /// A single input; `"unbound"` or an empty name yields [`InputSpec::unbound`].
    pub fn single(input: impl Into<String>) -> Self {
        let input = input.into();
        let input = input.trim();
        if input.is_empty() || input == UNBOUND {
            Self::unbound()
        } else {
            Self {
                inputs: vec![input.to_string()],
            }
        }
    }

    pub fn from_inputs<I, S>(inputs: I) -> Result<Self, InputSpecError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut out: Vec<String> = Vec::new();
        for input in inputs {
            let input = input.as_ref().trim();
            if input.is_empty() || input == UNBOUND {
                continue;
            }
            if !out.iter().any(|x| x == input) {
                out.push(input.to_string());
            }
        }

        if out.len() > Self::MAX_INPUTS {
            return Err(InputSpecError::TooMany {
                max: Self::MAX_INPUTS,
                got: out.len(),
            });
        }
        Ok(Self { inputs: out })
    }

    /// Parses the `"A, B"` display form (any whitespace around commas).
    pub fn parse(text: &str) -> Result<Self, InputSpecError> {
        Self::from_inputs(text.split(','))
    }

    pub fn is_unbound(&self) -> bool {
        self.inputs.is_empty()
    }

    pub fn inputs(&self) -> &[String] {
        &self.inputs
    }

    /// Sorted operands, or `["unbound"]` when nothing is bound.
    ///
    /// This is the canonical form used for whitelist comparison.
    pub fn sorted(&self) -> Vec<String> {
        if self.inputs.is_empty() {
            return vec![UNBOUND.to_string()];
        }
        let mut sorted = self.inputs.clone();
        sorted.sort();
        sorted
    }
}

impl fmt::Display for InputSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.inputs.is_empty() {
            f.write_str(UNBOUND)
        } else {
            f.write_str(&self.inputs.join(INPUT_SEPARATOR))
        }
    }
}

impl Serialize for InputSpec {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for InputSpec {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        InputSpec::parse(&text).map_err(serde::de::Error::custom)
    }
}

/// Button binding for a discrete control action.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionMapping {
    pub button: InputSpec,
}

impl ActionMapping {
    pub fn new(button: InputSpec) -> Self {
        Self { button }
    }

    pub fn unbound() -> Self {
        Self::default()
    }
}

/// How a controller axis value becomes the plane axis value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AxisMode {
    /// 1:1 passthrough.
    #[default]
    Direct,
    /// Incremental, scaled by `gain`.
    Differential,
    /// Unknown assigner reported by the backend. Display only.
    Undefined,
}

impl fmt::Display for AxisMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AxisMode::Direct => f.write_str("direct"),
            AxisMode::Differential => f.write_str("differential"),
            AxisMode::Undefined => f.write_str("undefined"),
        }
    }
}

/// Controller axis bound to a plane axis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AxisMapping {
    pub in_axis: InputSpec,
    pub invert: bool,
    pub deadzone: f64,
    pub mode: AxisMode,
    pub gain: Option<f64>,
}

impl Default for AxisMapping {
    fn default() -> Self {
        Self {
            in_axis: InputSpec::unbound(),
            invert: false,
            deadzone: 0.0,
            mode: AxisMode::Direct,
            gain: None,
        }
    }
}

impl AxisMapping {
    pub fn unbound() -> Self {
        Self::default()
    }

    pub fn direct(in_axis: impl Into<String>) -> Self {
        Self {
            in_axis: InputSpec::single(in_axis),
            ..Self::default()
        }
    }

    pub fn differential(in_axis: impl Into<String>, gain: f64) -> Self {
        Self {
            in_axis: InputSpec::single(in_axis),
            mode: AxisMode::Differential,
            gain: Some(gain),
            ..Self::default()
        }
    }

    pub fn is_unbound(&self) -> bool {
        self.in_axis.is_unbound()
    }

    /// Field-wise comparison that ignores `gain` unless both sides are differential.
    pub fn same_settings(&self, other: &AxisMapping) -> bool {
        self.in_axis == other.in_axis
            && self.invert == other.invert
            && self.deadzone == other.deadzone
            && self.mode == other.mode
            && (self.mode != AxisMode::Differential || self.gain == other.gain)
    }
}

/// Either kind of mapping, as handled by the staging and resolver layers.
#[derive(Debug, Clone, PartialEq)]
pub enum Mapping {
    Action(ActionMapping),
    Axis(AxisMapping),
}

impl Mapping {
    pub fn unbound(kind: MappingKind) -> Self {
        match kind {
            MappingKind::Button => Mapping::Action(ActionMapping::unbound()),
            MappingKind::Axis => Mapping::Axis(AxisMapping::unbound()),
        }
    }

    pub fn kind(&self) -> MappingKind {
        match self {
            Mapping::Action(_) => MappingKind::Button,
            Mapping::Axis(_) => MappingKind::Axis,
        }
    }

    /// The bound button combo or controller axis.
    pub fn input(&self) -> &InputSpec {
        match self {
            Mapping::Action(m) => &m.button,
            Mapping::Axis(m) => &m.in_axis,
        }
    }

    pub fn is_unbound(&self) -> bool {
        self.input().is_unbound()
    }

    /// Equality used for dirty tracking. Mappings of different kinds never match.
    pub fn same_as(&self, other: &Mapping) -> bool {
        match (self, other) {
            (Mapping::Action(a), Mapping::Action(b)) => a == b,
            (Mapping::Axis(a), Mapping::Axis(b)) => a.same_settings(b),
            _ => false,
        }
    }
}

impl From<ActionMapping> for Mapping {
    fn from(m: ActionMapping) -> Self {
        Mapping::Action(m)
    }
}

impl From<AxisMapping> for Mapping {
    fn from(m: AxisMapping) -> Self {
        Mapping::Axis(m)
    }
}

/// `role → output → mapping`.
pub type MappingTable<M> = BTreeMap<ControllerRole, BTreeMap<String, M>>;

/// Action and axis tables for every known role.
///
/// Values are owned; a clone shares nothing with its source.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MappingSet {
    pub action_mappings: MappingTable<ActionMapping>,
    pub axis_mappings: MappingTable<AxisMapping>,
}

impl MappingSet {
    /// Roles present in either table, in order.
    pub fn roles(&self) -> BTreeSet<ControllerRole> {
        self.action_mappings
            .keys()
            .chain(self.axis_mappings.keys())
            .cloned()
            .collect()
    }

    pub fn has_role(&self, role: &str) -> bool {
        self.action_mappings.contains_key(role) || self.axis_mappings.contains_key(role)
    }

    /// Makes sure both tables hold an (possibly empty) entry map for `role`.
    pub fn ensure_role(&mut self, role: &ControllerRole) {
        self.action_mappings.entry(role.clone()).or_default();
        self.axis_mappings.entry(role.clone()).or_default();
    }

    pub fn remove_role(&mut self, role: &str) {
        self.action_mappings.remove(role);
        self.axis_mappings.remove(role);
    }

    pub fn get(&self, role: &str, output: &str, kind: MappingKind) -> Option<Mapping> {
        match kind {
            MappingKind::Button => self
                .action_mappings
                .get(role)
                .and_then(|cells| cells.get(output))
                .cloned()
                .map(Mapping::Action),
            MappingKind::Axis => self
                .axis_mappings
                .get(role)
                .and_then(|cells| cells.get(output))
                .cloned()
                .map(Mapping::Axis),
        }
    }

    pub fn insert(&mut self, role: &ControllerRole, output: &str, mapping: Mapping) {
        self.ensure_role(role);
        match mapping {
            Mapping::Action(m) => {
                if let Some(cells) = self.action_mappings.get_mut(role.as_str()) {
                    cells.insert(output.to_string(), m);
                }
            }
            Mapping::Axis(m) => {
                if let Some(cells) = self.axis_mappings.get_mut(role.as_str()) {
                    cells.insert(output.to_string(), m);
                }
            }
        }
    }

    pub fn remove(&mut self, role: &str, output: &str, kind: MappingKind) -> Option<Mapping> {
        match kind {
            MappingKind::Button => self
                .action_mappings
                .get_mut(role)
                .and_then(|cells| cells.remove(output))
                .map(Mapping::Action),
            MappingKind::Axis => self
                .axis_mappings
                .get_mut(role)
                .and_then(|cells| cells.remove(output))
                .map(Mapping::Axis),
        }
    }

    /// Output names with a cell of `kind` for `role`.
    pub fn outputs(&self, role: &str, kind: MappingKind) -> Vec<String> {
        match kind {
            MappingKind::Button => self
                .action_mappings
                .get(role)
                .map(|cells| cells.keys().cloned().collect())
                .unwrap_or_default(),
            MappingKind::Axis => self
                .axis_mappings
                .get(role)
                .map(|cells| cells.keys().cloned().collect())
                .unwrap_or_default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_input_spec_collapses_duplicates_and_unbound() {
        let spec = InputSpec::from_inputs(["TriggerR", "unbound", "TriggerR"]).unwrap();
        assert_eq!(spec.inputs(), ["TriggerR"]);
        assert_eq!(spec.to_string(), "TriggerR");

        let spec = InputSpec::from_inputs(["unbound", "unbound"]).unwrap();
        assert!(spec.is_unbound());
        assert_eq!(spec.to_string(), "unbound");
        assert_eq!(spec.sorted(), vec!["unbound".to_string()]);
    }

    #[test]
    fn test_input_spec_rejects_three_buttons() {
        let err = InputSpec::from_inputs(["A", "B", "C"]).unwrap_err();
        assert_eq!(err, InputSpecError::TooMany { max: 2, got: 3 });
    }

    #[test]
    fn test_input_spec_parse_display_form() {
        let spec = InputSpec::parse("ButtonB ,ButtonA").unwrap();
        assert_eq!(spec.inputs(), ["ButtonB", "ButtonA"]);
        assert_eq!(spec.to_string(), "ButtonB, ButtonA");
        assert_eq!(spec.sorted(), vec!["ButtonA".to_string(), "ButtonB".to_string()]);
    }

    #[test]
    fn test_axis_gain_ignored_in_direct_mode() {
        let confirmed = AxisMapping::direct("LeftX");
        let staged = AxisMapping {
            gain: Some(5.0),
            ..confirmed.clone()
        };
        assert!(confirmed.same_settings(&staged));

        let differential = AxisMapping::differential("LeftX", 1.0);
        let other_gain = AxisMapping::differential("LeftX", 2.0);
        assert!(!differential.same_settings(&other_gain));
        assert!(!confirmed.same_settings(&differential));
    }

    #[test]
    fn test_mapping_set_insert_keeps_role_tables_in_sync() {
        let mut set = MappingSet::default();
        let role = ControllerRole::from("Pilot");
        set.insert(
            &role,
            "Throttle",
            ActionMapping::new(InputSpec::single("TriggerR")).into(),
        );

        assert!(set.axis_mappings.contains_key("Pilot"));
        assert_eq!(set.outputs("Pilot", MappingKind::Button), vec!["Throttle"]);
        assert!(set.outputs("Pilot", MappingKind::Axis).is_empty());
        assert_eq!(
            set.get("Pilot", "Throttle", MappingKind::Button),
            Some(Mapping::Action(ActionMapping::new(InputSpec::single("TriggerR"))))
        );
    }
}
