//! Backend JSON shapes for the controls endpoint.
//!
//! These mirror the server's PascalCase contract and are only touched by
//! [`convert`](crate::convert) and the controller; the rest of the crate works
//! on [`MappingSet`](crate::binding::MappingSet).

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Assigner tag for 1:1 axes.
pub const DIRECT_ASSIGNER: &str = "DirectValueAssigner";

/// Assigner tag for gain-scaled incremental axes.
pub const DIFFERENCE_ASSIGNER: &str = "DifferenceValueAssigner";

/// Input name the backend uses for "nothing bound".
pub const WIRE_NONE: &str = "None";

/// `role → action → buttons`.
pub type WireActionTable = BTreeMap<String, BTreeMap<String, Option<WireButtons>>>;

/// `role → plane axis → axis settings`.
pub type WireAxisTable = BTreeMap<String, BTreeMap<String, Option<WireAxisMapping>>>;

/// Buttons bound to one action. Older backends send a single `"A, B"` string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum WireButtons {
    List(Vec<String>),
    Text(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WireAssigner {
    #[serde(rename = "$type")]
    pub kind: String,
    #[serde(rename = "Gain", default, skip_serializing_if = "Option::is_none")]
    pub gain: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct WireAxisMapping {
    #[serde(default)]
    pub controller_axis: Option<String>,
    #[serde(default)]
    pub inverted: bool,
    #[serde(default)]
    pub controller_axis_dead_band: f64,
    pub final_value_assigner: WireAssigner,
}

/// `GET` response of the controls endpoint.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ControlsResponse {
    pub available_controller_buttons: Vec<String>,
    pub available_controller_axes: Vec<String>,
    pub available_control_actions: Vec<String>,
    pub available_plane_axes: Vec<String>,
    pub control_actions_restrictions: BTreeMap<String, Vec<Vec<String>>>,
    #[serde(default)]
    pub control_actions_settings: Option<WireActionTable>,
    #[serde(default)]
    pub plane_axes_settings: Option<WireAxisTable>,
}

/// Mapping tables only: the `POST` body, and the server's echo of it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ControlsPayload {
    #[serde(default)]
    pub control_actions_settings: Option<WireActionTable>,
    #[serde(default)]
    pub plane_axes_settings: Option<WireAxisTable>,
}
